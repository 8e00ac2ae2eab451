//! Atomic publishing of output files.
//!
//! Outputs are written to a hidden temporary file in the target's directory
//! and renamed into place, so an interrupted run never leaves a truncated
//! target behind. Without `overwrite` the rename refuses to replace an
//! existing file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;

const STAGING_PREFIX: &str = ".normalforge-";
const STAGING_SUFFIX: &str = ".tmp";

/// Errors from publishing an output file.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The target appeared before the rename; nothing was replaced.
    #[error("Target already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn target_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Reserve an empty staging file next to `target`.
///
/// The file is deleted when the returned path is dropped without being
/// published.
pub fn staging_path(target: &Path) -> Result<TempPath, PublishError> {
    let file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(target_dir(target))?;
    Ok(file.into_temp_path())
}

/// Move a staged file to `target`.
pub fn publish_staged(staged: TempPath, target: &Path, overwrite: bool) -> Result<(), PublishError> {
    let result = if overwrite {
        staged.persist(target)
    } else {
        staged.persist_noclobber(target)
    };

    result.map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            PublishError::AlreadyExists {
                path: target.to_path_buf(),
            }
        } else {
            PublishError::Io(e.error)
        }
    })
}

/// Write `data` to `target` atomically.
pub fn publish_bytes(target: &Path, data: &[u8], overwrite: bool) -> Result<(), PublishError> {
    let mut file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(target_dir(target))?;
    file.write_all(data)?;
    file.as_file().sync_all()?;

    publish_staged(file.into_temp_path(), target, overwrite)
}
