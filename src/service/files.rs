//! File operations inside the caller's own root

use crate::error::{PathError, PathRejection, ShareServerError};
use crate::identity::PrincipalId;
use crate::path::{self, ConfinedPath, confine};
use crate::storage::{FileDownload, FileEntry, ObjectStore};
use std::sync::Arc;

pub struct FileService<S> {
    store: Arc<S>,
    max_upload: u64,
}

impl<S: ObjectStore> FileService<S> {
    pub fn new(store: Arc<S>, max_upload: u64) -> Self {
        Self { store, max_upload }
    }

    /// Upload size limit in bytes.
    pub fn max_upload(&self) -> u64 {
        self.max_upload
    }

    pub async fn list(
        &self,
        principal: PrincipalId,
        relative: &str,
    ) -> Result<Vec<FileEntry>, ShareServerError> {
        let confined = resolve(principal, relative)?;
        Ok(self.store.list(&confined).await?)
    }

    /// Stores `bytes` as `name` in directory `dir` (blank means the root).
    pub async fn upload(
        &self,
        principal: PrincipalId,
        dir: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<FileEntry, ShareServerError> {
        let confined = resolve(principal, dir)?;
        Ok(self.store.write(&confined, name, bytes).await?)
    }

    pub async fn download(
        &self,
        principal: PrincipalId,
        relative: &str,
    ) -> Result<FileDownload, ShareServerError> {
        if relative.trim().is_empty() {
            return Err(PathError::invalid(relative, PathRejection::Empty).into());
        }
        let confined = resolve(principal, relative)?;
        Ok(self.store.read(&confined).await?)
    }
}

fn resolve(principal: PrincipalId, relative: &str) -> Result<ConfinedPath, PathError> {
    path::validate(relative)?;
    confine(&principal.storage_root(), relative)
}
