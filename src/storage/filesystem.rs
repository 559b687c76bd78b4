//! Local filesystem object store
//!
//! Uploads are atomic: bytes go to a uniquely named `.upload-<hex>.tmp`
//! sibling which is renamed into place once fully written. Scratch files are
//! never listed, so one left behind by a crash is invisible to clients and
//! does not block later uploads of the same name.

use crate::error::StorageError;
use crate::path::ConfinedPath;
use crate::path::normalize::normalize;
use crate::storage::ObjectStore;
use crate::storage::results::{FileDownload, FileEntry};
use crate::storage::validation::{
    is_temp_file_name, resolve_under_base, temp_file_name, validate_file_name,
};
use dashmap::DashSet;
use log::{error, info, warn};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base: PathBuf,
    max_file_size: u64,
    /// Targets with an upload currently being written.
    in_flight: Arc<DashSet<PathBuf>>,
}

/// Exclusive right to write one target path; released on drop.
struct UploadClaim {
    in_flight: Arc<DashSet<PathBuf>>,
    target: PathBuf,
}

impl Drop for UploadClaim {
    fn drop(&mut self) {
        self.in_flight.remove(&self.target);
    }
}

impl LocalStorage {
    pub fn new(base: impl AsRef<Path>, max_file_size: u64) -> Result<Self, StorageError> {
        let base = normalize(base.as_ref())
            .map_err(|_| StorageError::OutsideRoot(base.as_ref().to_string_lossy().into_owned()))?;
        Ok(Self {
            base,
            max_file_size,
            in_flight: Arc::default(),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Create the base directory if it does not exist yet.
    pub async fn ensure_base(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base).await?;
        Ok(())
    }

    fn resolve(&self, confined: &ConfinedPath) -> Result<PathBuf, StorageError> {
        resolve_under_base(&self.base, confined)
    }

    fn claim(&self, target: &Path) -> Option<UploadClaim> {
        self.in_flight.insert(target.to_path_buf()).then(|| UploadClaim {
            in_flight: Arc::clone(&self.in_flight),
            target: target.to_path_buf(),
        })
    }
}

impl ObjectStore for LocalStorage {
    async fn list(&self, confined: &ConfinedPath) -> Result<Vec<FileEntry>, StorageError> {
        let real_path = self.resolve(confined)?;

        let metadata = match fs::metadata(&real_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            let name = file_name_of(&real_path);
            return Ok(vec![entry_from(name, confined.as_str().to_string(), &metadata)]);
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&real_path).await?;
        while let Some(child) = dir.next_entry().await? {
            let name = child.file_name().to_string_lossy().into_owned();
            if is_temp_file_name(&name) {
                continue;
            }
            let metadata = match child.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping {} while listing {}: {}", name, confined, e);
                    continue;
                }
            };
            let path = child_path(confined.as_str(), &name);
            entries.push(entry_from(name, path, &metadata));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Listed {} ({} entries)", confined, entries.len());
        Ok(entries)
    }

    async fn read(&self, confined: &ConfinedPath) -> Result<FileDownload, StorageError> {
        let real_path = self.resolve(confined)?;

        let metadata = match fs::metadata(&real_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound(confined.as_str().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(StorageError::NotAFile(confined.as_str().to_string()));
        }

        let bytes = fs::read(&real_path).await?;
        info!("Read {} ({} bytes)", confined, bytes.len());

        Ok(FileDownload {
            name: file_name_of(&real_path),
            bytes,
        })
    }

    async fn write(
        &self,
        dir: &ConfinedPath,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<FileEntry, StorageError> {
        validate_file_name(name)?;

        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        let dir_path = self.resolve(dir)?;
        fs::create_dir_all(&dir_path).await?;

        let final_path = dir_path.join(name);
        let virtual_path = child_path(dir.as_str(), name);
        if fs::metadata(&final_path)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
        {
            return Err(StorageError::NotAFile(virtual_path));
        }

        let Some(_claim) = self.claim(&final_path) else {
            return Err(StorageError::UploadInProgress(virtual_path));
        };

        let temp_path = dir_path.join(temp_file_name(rand::random()));
        let mut temp_file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to create temporary file {}: {}", temp_path.display(), e);
                return Err(e.into());
            }
        };

        let written = async {
            temp_file.write_all(&bytes).await?;
            temp_file.sync_all().await?;
            drop(temp_file);
            fs::rename(&temp_path, &final_path).await
        }
        .await;

        if let Err(e) = written {
            error!(
                "Failed to store {} via {}: {}",
                final_path.display(),
                temp_path.display(),
                e
            );
            discard_temp(&temp_path).await;
            return Err(e.into());
        }

        info!("Stored {} ({} bytes)", virtual_path, size);
        let metadata = fs::metadata(&final_path).await?;
        Ok(entry_from(name.to_string(), virtual_path, &metadata))
    }
}

/// Removes a scratch file after a failed upload. It may already be gone.
async fn discard_temp(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temporary file {}: {}", path.display(), e),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn child_path(parent: &str, name: &str) -> String {
    Path::new(parent).join(name).to_string_lossy().into_owned()
}

fn entry_from(name: String, path: String, metadata: &Metadata) -> FileEntry {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    FileEntry {
        name,
        path,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        is_dir: metadata.is_dir(),
        modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::confine;
    use tempfile::TempDir;

    fn store(limit: u64) -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path(), limit).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let (_dir, store) = store(1024);
        let docs = confine("42", "docs").unwrap();

        let entry = store.write(&docs, "report.pdf", b"%PDF".to_vec()).await.unwrap();
        assert_eq!(entry.path, "42/docs/report.pdf");
        assert_eq!(entry.size, 4);
        assert!(!entry.is_dir);

        let file = confine("42", "docs/report.pdf").unwrap();
        let download = store.read(&file).await.unwrap();
        assert_eq!(download.name, "report.pdf");
        assert_eq!(download.bytes, b"%PDF");
    }

    #[tokio::test]
    async fn write_replaces_existing_file_and_leaves_no_temp() {
        let (dir, store) = store(1024);
        let root = confine("42", "").unwrap();

        store.write(&root, "a.txt", b"one".to_vec()).await.unwrap();
        store.write(&root, "a.txt", b"second".to_vec()).await.unwrap();

        let listing = store.list(&root).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].size, 6);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("42"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "a.txt")
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }

    #[tokio::test]
    async fn missing_path_lists_empty() {
        let (_dir, store) = store(1024);
        let nowhere = confine("42", "nothing/here").unwrap();
        assert!(store.list(&nowhere).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_a_file_yields_that_file() {
        let (_dir, store) = store(1024);
        let root = confine("7", "").unwrap();
        store.write(&root, "solo.bin", vec![0; 10]).await.unwrap();

        let listing = store.list(&confine("7", "solo.bin").unwrap()).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "solo.bin");
        assert_eq!(listing[0].path, "7/solo.bin");
    }

    #[tokio::test]
    async fn directory_listing_marks_subdirectories() {
        let (_dir, store) = store(1024);
        store
            .write(&confine("7", "sub").unwrap(), "x.txt", b"x".to_vec())
            .await
            .unwrap();
        store
            .write(&confine("7", "").unwrap(), "b.txt", b"b".to_vec())
            .await
            .unwrap();

        let listing = store.list(&confine("7", "").unwrap()).await.unwrap();
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b.txt", "sub"]);
        assert!(listing[1].is_dir);
        assert_eq!(listing[1].to_listing_line().rsplit('|').next(), Some("dir"));
    }

    #[tokio::test]
    async fn not_found_and_not_a_file_are_distinct() {
        let (_dir, store) = store(1024);
        store
            .write(&confine("42", "docs").unwrap(), "a.txt", b"a".to_vec())
            .await
            .unwrap();

        assert!(matches!(
            store.read(&confine("42", "docs/missing.txt").unwrap()).await,
            Err(StorageError::FileNotFound(_))
        ));
        assert!(matches!(
            store.read(&confine("42", "docs").unwrap()).await,
            Err(StorageError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let (dir, store) = store(8);
        let root = confine("42", "").unwrap();
        assert!(matches!(
            store.write(&root, "big.bin", vec![0; 9]).await,
            Err(StorageError::FileTooLarge { size: 9, max: 8 })
        ));
        assert!(!dir.path().join("42/big.bin").exists());
    }

    #[tokio::test]
    async fn bad_file_names_are_rejected() {
        let (_dir, store) = store(1024);
        let root = confine("42", "").unwrap();
        for name in ["", "../x", "a/b", "a\\b"] {
            assert!(matches!(
                store.write(&root, name, b"x".to_vec()).await,
                Err(StorageError::InvalidFileName(_))
            ));
        }
    }

    #[tokio::test]
    async fn concurrent_upload_of_same_name_is_refused() {
        let (_dir, store) = store(1024);
        let root = confine("42", "").unwrap();

        let held = store.claim(&store.base().join("42/busy.txt")).unwrap();
        assert!(matches!(
            store.write(&root, "busy.txt", b"x".to_vec()).await,
            Err(StorageError::UploadInProgress(_))
        ));

        drop(held);
        store.write(&root, "busy.txt", b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn stale_scratch_files_are_hidden_and_do_not_block() {
        let (dir, store) = store(1024);
        let root = confine("42", "").unwrap();
        std::fs::create_dir_all(dir.path().join("42")).unwrap();
        std::fs::write(dir.path().join("42/.upload-00000000000000aa.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("42/busy.txt.tmp"), b"user file").unwrap();

        store.write(&root, "busy.txt", b"fresh".to_vec()).await.unwrap();

        let listing = store.list(&root).await.unwrap();
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["busy.txt", "busy.txt.tmp"]);
    }

    #[tokio::test]
    async fn discarding_a_missing_scratch_file_is_quiet() {
        let (dir, _store) = store(1024);
        let scratch = dir.path().join(temp_file_name(7));
        std::fs::write(&scratch, b"partial").unwrap();

        discard_temp(&scratch).await;
        assert!(!scratch.exists());
        discard_temp(&scratch).await;
    }

    #[tokio::test]
    async fn root_outside_base_is_refused() {
        let (_dir, store) = store(1024);
        let outside = confine("/etc", "passwd").unwrap();
        assert!(matches!(
            store.read(&outside).await,
            Err(StorageError::OutsideRoot(_))
        ));
    }
}
