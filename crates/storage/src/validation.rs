use std::path::{Component, Path};

use crate::StorageError;

/// Validates a namespace path such as `/data/out.txt`.
///
/// A leading `/` anchors the path at the namespace root and is allowed.
/// Rejects:
/// - Empty paths and the bare root
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
/// - A trailing `/` (objects are files, not directories)
pub fn validate_namespace_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("empty path".into()));
    }
    if path.ends_with('/') {
        return Err(StorageError::InvalidPath(format!(
            "path names a directory: {path}"
        )));
    }

    let mut normal = 0usize;
    for component in Path::new(path).components() {
        match component {
            Component::ParentDir => {
                return Err(StorageError::InvalidPath(format!(
                    "parent directory traversal not allowed: {path}"
                )));
            }
            Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(format!(
                    "path prefix not allowed: {path}"
                )));
            }
            Component::Normal(_) => normal += 1,
            Component::RootDir | Component::CurDir => {}
        }
    }

    if normal == 0 {
        return Err(StorageError::InvalidPath(format!("no object name: {path}")));
    }
    Ok(())
}

/// Validates `path` and returns its canonical namespace key.
///
/// Spellings that resolve to the same object map to the same key:
/// `/a/b.txt`, `a/b.txt`, `//a/./b.txt` all yield `a/b.txt`.
pub fn normalize_namespace_path(path: &str) -> Result<String, StorageError> {
    validate_namespace_path(path)?;
    let parts: Vec<&str> = Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
