//! Common filesystem utilities
//!
//! Output files are always written to a temp file in the destination
//! directory first and renamed into place, so a failed step never leaves a
//! partial file under the final name.

use crate::core::error::{FetchError, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Create a directory (and its ancestors) if it doesn't exist.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| FetchError::io(format!("cannot create directory {}", dir.display()), e))
}

/// A temp file in `dir`, removed on drop unless persisted.
pub fn temp_file_in(dir: &Path) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".source-fetch-")
        .tempfile_in(dir)
        .map_err(|e| FetchError::io(format!("cannot create temp file in {}", dir.display()), e))
}

/// Atomically move a finished temp file to `dest`.
pub fn persist(mut temp: NamedTempFile, dest: &Path) -> Result<PathBuf> {
    temp.flush()
        .map_err(|e| FetchError::io(format!("cannot flush {}", temp.path().display()), e))?;
    temp.persist(dest)
        .map_err(|e| FetchError::io(format!("cannot move file into {}", dest.display()), e.error))?;
    Ok(dest.to_path_buf())
}

/// Copy `src` to `dest` through a temp file in `dest`'s directory.
pub fn copy_atomic(src: &Path, dest: &Path) -> Result<PathBuf> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = temp_file_in(dir)?;
    let mut reader = std::fs::File::open(src)
        .map_err(|e| FetchError::io(format!("cannot open {}", src.display()), e))?;
    std::io::copy(&mut reader, temp.as_file_mut()).map_err(|e| {
        FetchError::io(
            format!("copy failed: {} -> {}", src.display(), dest.display()),
            e,
        )
    })?;
    persist(temp, dest)
}

/// A name that is safe to use as a single file name in the output directory.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

/// Check if path is safe (no path traversal).
///
/// Rejects absolute paths and paths containing "..".
pub fn is_safe_relative_path(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && !path.is_absolute()
        && !path.components().any(|c| c == Component::ParentDir)
}
