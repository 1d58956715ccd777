//! RPM spec file extraction from a checked-out tree

use super::StagedFile;
use crate::core::error::{FetchError, Result};
use crate::helpers::internal::archive::is_vcs_metadata;
use crate::helpers::internal::fs_utils;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All `*.spec` files under `tree`, sorted, ignoring VCS metadata.
pub fn spec_files(tree: &Path) -> Vec<PathBuf> {
    WalkDir::new(tree)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_metadata(e.file_name()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "spec"))
        .map(|e| e.into_path())
        .collect()
}

/// The single spec file in `tree`. Zero or several is a [`FetchError::SpecFile`].
pub fn find_spec(tree: &Path, name: &str) -> Result<PathBuf> {
    let mut found = spec_files(tree);
    if found.len() != 1 {
        return Err(FetchError::SpecFile {
            name: name.to_string(),
            found: found.len(),
        });
    }
    Ok(found.remove(0))
}

/// Copy the tree's spec file into a temp file in `destdir`.
pub fn stage_spec(tree: &Path, name: &str, destdir: &Path) -> Result<StagedFile> {
    let spec = find_spec(tree, name)?;
    let file_name = spec
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| FetchError::SpecFile {
            name: name.to_string(),
            found: 0,
        })?;

    let mut temp = fs_utils::temp_file_in(destdir)?;
    let mut reader = std::fs::File::open(&spec)
        .map_err(|e| FetchError::io(format!("cannot open {}", spec.display()), e))?;
    std::io::copy(&mut reader, temp.as_file_mut())
        .map_err(|e| FetchError::io(format!("cannot copy {}", spec.display()), e))?;

    Ok(StagedFile { temp, file_name })
}
