//! Storage capability for the managed, write-once namespace.
//!
//! The Responder consumes storage only through the [`Storage`] trait:
//! `exists`, `create` and `stat` on namespace paths, plus `open_source`
//! for the Initiator-supplied local file. [`LocalStorage`] maps the
//! namespace onto a directory on the local filesystem.

mod audit;
mod checksum;
mod copy;
mod local;
mod validation;

use std::io::{Read, Write};
use std::path::Path;

pub use audit::{AuditEntry, AuditReport, audit_directory};
pub use checksum::{calculate_file_checksum, checksum_bytes};
pub use copy::copy_stream;
pub use local::LocalStorage;
pub use validation::{normalize_namespace_path, validate_namespace_path};

/// Default copy buffer: 64 KiB.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Errors produced by the storage crate.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Result of a `stat` on a namespace path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub is_regular_file: bool,
    pub len: u64,
}

/// Writable stream returned by [`Storage::create`].
pub type WriteStream = Box<dyn Write + Send>;

/// Readable stream returned by [`Storage::open_source`].
pub type ReadStream = Box<dyn Read + Send>;

/// Opaque storage capability.
///
/// Calls are synchronous and may block; async callers run them on a
/// blocking thread.
pub trait Storage: Send + Sync + 'static {
    /// Returns `true` if an object exists at `path`.
    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Creates a new object at `path` and returns a stream to fill it.
    ///
    /// Fails if `path` already exists or cannot be written.
    fn create(&self, path: &str) -> Result<WriteStream, StorageError>;

    /// Returns the status of the object at `path`. Fails if absent.
    fn stat(&self, path: &str) -> Result<FileStatus, StorageError>;

    /// Opens a local source file for reading.
    fn open_source(&self, path: &Path) -> Result<ReadStream, StorageError> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(Box::new(file))
    }

    /// Audits the directory containing `path`. `None` when unsupported.
    fn audit(&self, path: &str) -> Result<Option<AuditReport>, StorageError> {
        let _ = path;
        Ok(None)
    }
}
