//! Namespace backed by a directory on the local filesystem.

use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::audit::{AuditReport, audit_directory};
use crate::{FileStatus, Storage, StorageError, WriteStream, validate_namespace_path};

/// Write-once storage rooted at a local directory.
///
/// Namespace path `/a/b.txt` maps to `<root>/a/b.txt`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Opens (creating if needed) the namespace rooted at `root`.
    ///
    /// Returns the canonicalized root on success.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root)?;
        let root = std::fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "storage root is not a directory: {}",
                root.display()
            )));
        }
        debug!(root = %root.display(), "storage opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a namespace path to its location on disk.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_namespace_path(path)?;
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

impl Storage for LocalStorage {
    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        Ok(full.try_exists()?)
    }

    fn create(&self, path: &str) -> Result<WriteStream, StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
                _ => StorageError::Io(e),
            })?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn stat(&self, path: &str) -> Result<FileStatus, StorageError> {
        let full = self.resolve(path)?;
        let meta = std::fs::metadata(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(FileStatus {
            is_regular_file: meta.is_file(),
            len: meta.len(),
        })
    }

    fn audit(&self, path: &str) -> Result<Option<AuditReport>, StorageError> {
        let full = self.resolve(path)?;
        let dir = full.parent().unwrap_or(&self.root);
        Ok(Some(audit_directory(dir)?))
    }
}
