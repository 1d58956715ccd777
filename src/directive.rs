//! `.source` directive model
//!
//! One [`SourceDirective`] per non-comment line of a `.source` file. The
//! directive type is a closed enum; each variant carries only the fields
//! that type accepts.

use crate::helpers::internal::hash::HashAlgorithm;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Directive type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    File,
    Git,
    Svn,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Git => "git",
            Self::Svn => "svn",
        })
    }
}

/// Where a `file` directive's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    /// Path relative to each cache prefix
    Cache(String),
    /// Absolute local path, bypassing the cache
    Absolute(String),
    /// Full URL, bypassing the cache
    Url(String),
}

impl FileLocation {
    pub fn classify(location: &str) -> Self {
        if location.starts_with('/') {
            Self::Absolute(location.to_string())
        } else if location.contains("://") {
            Self::Url(location.to_string())
        } else {
            Self::Cache(location.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Cache(s) | Self::Absolute(s) | Self::Url(s) => s,
        }
    }

    /// Last path component, used as the default output name.
    pub fn basename(&self) -> &str {
        let s = self.as_str();
        let s = s.split(['?', '#']).next().unwrap_or(s);
        s.rsplit('/').next().unwrap_or(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub location: FileLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub url: String,
    pub tag: String,
    /// Expected commit id the tag must resolve to
    pub commit: Option<String>,
    /// Explicit tarball file name
    pub tarball: Option<String>,
    /// Package only this subdirectory of the tree
    pub subdir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvnSource {
    pub url: String,
    pub revision: u64,
    pub tarball: Option<String>,
    pub subdir: Option<String>,
}

/// Per-type payload of a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    File(FileSource),
    Git(GitSource),
    Svn(SvnSource),
}

/// One parsed line of a `.source` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDirective {
    /// 1-based line number in the originating file
    pub line: usize,
    /// Output file name (file) or package name (git/svn)
    pub name: String,
    pub kind: DirectiveKind,
    pub declared_hashes: BTreeMap<HashAlgorithm, String>,
    pub want_spec: bool,
}

impl SourceDirective {
    pub fn source_type(&self) -> SourceType {
        match self.kind {
            DirectiveKind::File(_) => SourceType::File,
            DirectiveKind::Git(_) => SourceType::Git,
            DirectiveKind::Svn(_) => SourceType::Svn,
        }
    }

    /// Origin of the content: the file location or the repository URL.
    pub fn url(&self) -> &str {
        match &self.kind {
            DirectiveKind::File(f) => f.location.as_str(),
            DirectiveKind::Git(g) => &g.url,
            DirectiveKind::Svn(s) => &s.url,
        }
    }

    /// The git tag or svn revision, rendered as text.
    pub fn tag_or_revision(&self) -> Option<String> {
        match &self.kind {
            DirectiveKind::File(_) => None,
            DirectiveKind::Git(g) => Some(g.tag.clone()),
            DirectiveKind::Svn(s) => Some(s.revision.to_string()),
        }
    }

    /// Name of the primary file this directive writes into the destination.
    pub fn output_name(&self) -> String {
        match &self.kind {
            DirectiveKind::File(_) => self.name.clone(),
            DirectiveKind::Git(g) => g
                .tarball
                .clone()
                .unwrap_or_else(|| format!("{}-{}.tar.gz", self.name, tag_version(&g.tag))),
            DirectiveKind::Svn(s) => s
                .tarball
                .clone()
                .unwrap_or_else(|| format!("{}-{}.tar.gz", self.name, s.revision)),
        }
    }

    /// Top-level directory inside a generated tarball.
    pub fn archive_prefix(&self) -> String {
        tarball_stem(&self.output_name()).to_string()
    }
}

/// Version string derived from a git tag.
///
/// A leading `v` before a digit is dropped, as is a trailing numeric
/// release (`v2.1-2` becomes `2.1`).
pub fn tag_version(tag: &str) -> &str {
    let mut version = tag;
    if let Some(rest) = version.strip_prefix('v')
        && rest.starts_with(|c: char| c.is_ascii_digit())
    {
        version = rest;
    }
    if let Some((base, release)) = version.rsplit_once('-')
        && !base.is_empty()
        && !release.is_empty()
        && release.chars().all(|c| c.is_ascii_digit())
    {
        version = base;
    }
    version
}

/// File name with any archive extension removed.
pub fn tarball_stem(file_name: &str) -> &str {
    const SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".tar"];
    SUFFIXES
        .iter()
        .find_map(|s| file_name.strip_suffix(s))
        .unwrap_or_else(|| {
            Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file_name)
        })
}
