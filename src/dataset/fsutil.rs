//! Whole-file writes and moves used by the dataset operations.
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so readers never observe a half-written label file or manifest.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::BerryscanError;

fn staged(path: &Path, contents: &[u8]) -> Result<NamedTempFile, BerryscanError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(BerryscanError::Io)?;
    tmp.write_all(contents).map_err(BerryscanError::Io)?;
    tmp.as_file().sync_all().map_err(BerryscanError::Io)?;
    Ok(tmp)
}

/// Atomically replaces (or creates) `path` with `contents`.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<(), BerryscanError> {
    staged(path, contents)?
        .persist(path)
        .map_err(|err| BerryscanError::Io(err.error))?;
    Ok(())
}

/// Atomically creates `path` with `contents`, failing if it already exists.
pub(crate) fn create_new_file(path: &Path, contents: &[u8]) -> Result<(), BerryscanError> {
    if path.exists() {
        return Err(BerryscanError::FileAlreadyExists {
            path: path.to_path_buf(),
        });
    }
    staged(path, contents)?
        .persist_noclobber(path)
        .map_err(|err| match err.error.kind() {
            ErrorKind::AlreadyExists => BerryscanError::FileAlreadyExists {
                path: path.to_path_buf(),
            },
            _ => BerryscanError::Io(err.error),
        })?;
    Ok(())
}

/// Moves `from` to `to` without overwriting an existing file.
///
/// Falls back to copy-then-remove when a rename is not possible (for example
/// across filesystems).
pub(crate) fn relocate_file(from: &Path, to: &Path) -> Result<(), BerryscanError> {
    if to.exists() {
        return Err(BerryscanError::FileAlreadyExists {
            path: to.to_path_buf(),
        });
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(BerryscanError::Io)?;
    if let Err(err) = fs::remove_file(from) {
        // Leave exactly one copy behind.
        let _ = fs::remove_file(to);
        return Err(BerryscanError::Io(err));
    }
    Ok(())
}
