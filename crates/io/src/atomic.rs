//! Write-to-temp then rename, so a failed write never clobbers the previous file.

use std::path::{Path, PathBuf};

use crate::error::PersistenceError;

/// Temporary sibling used while `path` is being produced.
pub fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Run `write` against a temporary sibling of `path`, then move it into place.
///
/// On any failure the temp file is removed and `path` is untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), PersistenceError>
where
    F: FnOnce(&Path) -> Result<(), PersistenceError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_path(path);
    let result = write(&tmp).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|source| PersistenceError::Io { path: path.to_path_buf(), source })
    });

    if result.is_err() && tmp.exists() {
        if let Err(e) = std::fs::remove_file(&tmp) {
            log::warn!("could not remove temporary file {}: {e}", tmp.display());
        }
    }
    result
}
