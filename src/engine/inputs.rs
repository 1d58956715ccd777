//! Command-line inputs to `.source` files
//!
//! A directory argument is a package directory:
//! - `upstream/*.source` files are processed in sorted file-name order
//! - the other plain files in `upstream/` are copied next to the fetched
//!   outputs
//! - files in `osg/` are copied last and replace anything of the same name
//!
//! Editor backups (`*~`), dotfiles and subdirectories are never copied.

use crate::core::error::{FetchError, Result};
use std::path::{Path, PathBuf};

/// What one command-line argument contributes to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSet {
    /// `.source` files, in processing order
    pub sources: Vec<PathBuf>,
    /// Files copied alongside the fetched outputs
    pub extras: Vec<PathBuf>,
    /// Files copied after everything else, replacing same-named outputs
    pub overrides: Vec<PathBuf>,
}

/// Expand package directories; a plain file is a set of one source.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<InputSet>> {
    inputs
        .iter()
        .map(|input| {
            if input.is_dir() {
                package_inputs(input)
            } else {
                Ok(InputSet {
                    sources: vec![input.clone()],
                    ..InputSet::default()
                })
            }
        })
        .collect()
}

fn package_inputs(dir: &Path) -> Result<InputSet> {
    let upstream = dir.join("upstream");
    let sources = files_matching(&upstream, "*.source")?;
    if sources.is_empty() {
        return Err(FetchError::NoDirectives { file: upstream });
    }

    let extras = files_matching(&upstream, "*")?
        .into_iter()
        .filter(|path| path.extension().is_none_or(|ext| ext != "source"))
        .filter(|path| !is_backup(path))
        .collect();
    let overrides = files_matching(&dir.join("osg"), "*")?
        .into_iter()
        .filter(|path| !is_backup(path))
        .collect();

    Ok(InputSet {
        sources,
        extras,
        overrides,
    })
}

/// Regular files in `dir` matching `pattern`, sorted. A missing `dir`
/// matches nothing.
fn files_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let base = dir.to_str().ok_or_else(|| {
        FetchError::io(
            format!("invalid path {}", dir.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        )
    })?;
    let full = format!("{}/{}", glob::Pattern::escape(base), pattern);
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };

    let mut found: Vec<PathBuf> = glob::glob_with(&full, options)
        .map_err(|e| {
            FetchError::io(
                format!("bad pattern {}", full),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    found.sort();
    Ok(found)
}

fn is_backup(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with('~'))
}
