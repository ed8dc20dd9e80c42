//! Read-only consistency audit of a namespace directory.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::StorageError;
use crate::checksum::calculate_file_checksum;

/// One regular file seen by the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Path relative to the audited directory, `/`-separated.
    pub path: String,
    pub size: u64,
    /// SHA-256 hex digest.
    pub checksum: String,
}

/// Summary of an audited directory.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub directory: PathBuf,
    pub files: Vec<AuditEntry>,
    pub total_bytes: u64,
    /// Entries that are neither regular files nor directories.
    pub other_entries: usize,
}

impl AuditReport {
    /// Returns `true` if every entry was a regular file or directory.
    pub fn is_healthy(&self) -> bool {
        self.other_entries == 0
    }
}

/// Walks `dir` recursively, recording size and checksum of every file.
pub fn audit_directory(dir: &Path) -> Result<AuditReport, StorageError> {
    let mut report = AuditReport {
        directory: dir.to_path_buf(),
        ..AuditReport::default()
    };
    walk(dir, dir, &mut report)?;
    report.files.sort_by(|a, b| a.path.cmp(&b.path));

    if report.is_healthy() {
        info!(
            dir = %dir.display(),
            files = report.files.len(),
            bytes = report.total_bytes,
            "audit complete"
        );
    } else {
        warn!(
            dir = %dir.display(),
            files = report.files.len(),
            other = report.other_entries,
            "audit found non-regular entries"
        );
    }
    Ok(report)
}

fn walk(root: &Path, current: &Path, report: &mut AuditReport) -> Result<(), StorageError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(root, &path, report)?;
        } else if file_type.is_file() {
            let rel = path.strip_prefix(root).map_err(std::io::Error::other)?;
            let size = entry.metadata()?.len();
            report.files.push(AuditEntry {
                path: rel.to_string_lossy().replace('\\', "/"),
                size,
                checksum: calculate_file_checksum(&path)?,
            });
            report.total_bytes += size;
        } else {
            report.other_entries += 1;
        }
    }
    Ok(())
}
