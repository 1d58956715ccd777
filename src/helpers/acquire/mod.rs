//! Acquiring sources
//!
//! One handler per directive type, selected by `match` on
//! [`DirectiveKind`]:
//!
//! - **file**: resolve through the cache chain, verify digests
//! - **git**: clone at a tag, check the commit, archive the tree
//! - **svn**: export a revision, pack the tree
//!
//! Handlers only *stage* their outputs as temp files inside the destination
//! directory. The orchestrator checks the final names against outputs
//! already claimed in this run and then [commits](StagedArtifact::commit)
//! them by renaming into place.

pub mod cache;
pub mod file;
pub mod git;
pub mod specfile;
pub mod svn;
pub mod verify;

pub use cache::{CacheResolver, FetchedFile};
pub use verify::{VerifyOutcome, verify_file};

use crate::core::error::Result;
use crate::core::output::Reporter;
use crate::directive::{DirectiveKind, SourceDirective};
use crate::helpers::internal::fs_utils;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Shared per-run settings handed to every handler.
pub struct FetchContext<'a> {
    pub destdir: &'a Path,
    /// Verify digests (false under `--nocheck`)
    pub strict: bool,
    /// Extract spec files from VCS trees regardless of the directive's flag
    pub want_spec: bool,
    pub resolver: &'a CacheResolver,
    pub reporter: &'a Reporter,
}

impl FetchContext<'_> {
    pub fn wants_spec(&self, directive: &SourceDirective) -> bool {
        self.want_spec || directive.want_spec
    }
}

/// A finished output waiting to be renamed to `destdir/file_name`.
#[derive(Debug)]
pub struct StagedFile {
    pub temp: NamedTempFile,
    pub file_name: String,
}

/// Everything one directive produced, not yet visible in the destination.
#[derive(Debug)]
pub struct StagedArtifact {
    /// Primary output first, then the extracted spec file if any
    pub files: Vec<StagedFile>,
    pub outcome: VerifyOutcome,
    /// Where the content came from
    pub origin: String,
}

impl StagedArtifact {
    /// Final paths these files will be renamed to.
    pub fn destinations(&self, destdir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| destdir.join(&f.file_name))
            .collect()
    }

    /// Rename every staged file into `destdir`.
    pub fn commit(self, destdir: &Path) -> Result<ResolvedArtifact> {
        let mut paths = Vec::with_capacity(self.files.len());
        for staged in self.files {
            paths.push(fs_utils::persist(staged.temp, &destdir.join(&staged.file_name))?);
        }
        Ok(ResolvedArtifact {
            paths,
            outcome: self.outcome,
            origin: self.origin,
        })
    }
}

/// Outcome of processing one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub paths: Vec<PathBuf>,
    pub outcome: VerifyOutcome,
    pub origin: String,
}

/// Fetch, verify and package one directive into staged outputs.
pub fn stage(directive: &SourceDirective, ctx: &FetchContext<'_>) -> Result<StagedArtifact> {
    match &directive.kind {
        DirectiveKind::File(source) => file::stage_file(directive, source, ctx),
        DirectiveKind::Git(source) => git::stage_git(directive, source, ctx),
        DirectiveKind::Svn(source) => svn::stage_svn(directive, source, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_commit_renames_in_order() {
        let dest = tempfile::tempdir().unwrap();
        let mut tarball = fs_utils::temp_file_in(dest.path()).unwrap();
        tarball.write_all(b"tar").unwrap();
        let mut spec = fs_utils::temp_file_in(dest.path()).unwrap();
        spec.write_all(b"spec").unwrap();

        let staged = StagedArtifact {
            files: vec![
                StagedFile {
                    temp: tarball,
                    file_name: "foo-1.0.tar.gz".to_string(),
                },
                StagedFile {
                    temp: spec,
                    file_name: "foo.spec".to_string(),
                },
            ],
            outcome: VerifyOutcome::Skipped,
            origin: "test".to_string(),
        };

        let expected = staged.destinations(dest.path());
        let resolved = staged.commit(dest.path()).unwrap();
        assert_eq!(resolved.paths, expected);
        assert_eq!(std::fs::read(&resolved.paths[0]).unwrap(), b"tar");
        assert_eq!(std::fs::read(&resolved.paths[1]).unwrap(), b"spec");
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dest = tempfile::tempdir().unwrap();
        {
            let mut temp = fs_utils::temp_file_in(dest.path()).unwrap();
            temp.write_all(b"unverified").unwrap();
            let _staged = StagedArtifact {
                files: vec![StagedFile {
                    temp,
                    file_name: "foo.tar.gz".to_string(),
                }],
                outcome: VerifyOutcome::Skipped,
                origin: "test".to_string(),
            };
        }
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
