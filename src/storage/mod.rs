//! Object storage
//!
//! Every operation takes a [`ConfinedPath`] and re-checks containment against
//! the store's own base directory before touching the filesystem.

pub mod filesystem;
pub mod results;
pub mod validation;

pub use filesystem::LocalStorage;
pub use results::{FileDownload, FileEntry};

use crate::error::StorageError;
use crate::path::ConfinedPath;
use std::future::Future;

pub trait ObjectStore: Send + Sync {
    /// Children of a directory, the file itself for a file, nothing if absent.
    fn list(
        &self,
        confined: &ConfinedPath,
    ) -> impl Future<Output = Result<Vec<FileEntry>, StorageError>> + Send;

    fn read(
        &self,
        confined: &ConfinedPath,
    ) -> impl Future<Output = Result<FileDownload, StorageError>> + Send;

    /// Stores `bytes` as `name` inside `dir`, replacing an existing file.
    fn write(
        &self,
        dir: &ConfinedPath,
        name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<FileEntry, StorageError>> + Send;
}
