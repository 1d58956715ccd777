//! Deterministic source tarballs
//!
//! Identical trees must produce byte-identical `.tar.gz` files so that a
//! tarball digest declared in a `.source` file stays valid across runs and
//! machines. Entries are added in sorted order with normalized metadata, and
//! the gzip header carries no timestamp or file name.

use crate::core::error::{FetchError, Result};
use flate2::{Compression, GzBuilder};
use std::io::{Read, Write};
use std::path::Path;
use walkdir::WalkDir;

/// Directories that belong to the VCS, never to the packaged source.
pub const VCS_METADATA_DIRS: &[&str] = &[".git", ".svn"];

/// Gzip `reader` into `writer` with a zeroed mtime and no embedded name.
pub fn gzip_deterministic(reader: &mut impl Read, writer: impl Write) -> Result<()> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(writer, Compression::best());
    std::io::copy(reader, &mut encoder).map_err(|e| FetchError::io("gzip failed", e))?;
    encoder
        .finish()
        .map_err(|e| FetchError::io("gzip failed", e))?;
    Ok(())
}

/// Pack `tree` into a gzipped tarball whose entries live under `prefix/`.
///
/// VCS metadata directories are skipped. Symlinks are stored as links.
pub fn pack_tree(tree: &Path, prefix: &str, writer: impl Write) -> Result<()> {
    let encoder = GzBuilder::new()
        .mtime(0)
        .write(writer, Compression::best());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    let walker = WalkDir::new(tree)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_metadata(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            FetchError::io(
                format!("cannot walk {}", tree.display()),
                std::io::Error::other(e.to_string()),
            )
        })?;
        let rel = entry
            .path()
            .strip_prefix(tree)
            .map_err(|e| FetchError::io("cannot compute archive path", std::io::Error::other(e)))?;
        let name = if rel.as_os_str().is_empty() {
            Path::new(prefix).to_path_buf()
        } else {
            Path::new(prefix).join(rel)
        };

        let result = if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())
        } else {
            builder.append_path_with_name(entry.path(), &name)
        };
        result.map_err(|e| FetchError::io(format!("cannot archive {}", entry.path().display()), e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| FetchError::io("cannot finish tar stream", e))?;
    encoder
        .finish()
        .map_err(|e| FetchError::io("cannot finish gzip stream", e))?;
    Ok(())
}

pub fn is_vcs_metadata(name: &std::ffi::OsStr) -> bool {
    VCS_METADATA_DIRS.iter().any(|d| name == *d)
}
