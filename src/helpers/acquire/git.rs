//! `type=git` handler
//!
//! The repository is cloned at the requested tag into a scratch directory
//! under the destination, the tag's commit is checked against the declared
//! `hash=` if any, and `git archive` output is gzipped deterministically
//! into the tarball. The scratch directory is removed on every exit path.

use super::{FetchContext, StagedArtifact, StagedFile, VerifyOutcome, specfile, verify_file};
use crate::core::error::{FetchError, Result};
use crate::core::interrupt;
use crate::core::output::{ProgressGuard, Reporter};
use crate::directive::{GitSource, SourceDirective};
use crate::helpers::internal::archive;
use crate::helpers::internal::cmd::VcsCmd;
use crate::helpers::internal::fs_utils;

/// Validate that a URL uses a scheme git can fetch from non-interactively.
fn validate_git_url(url: &str, name: &str) -> Result<()> {
    const ALLOWED: &[&str] = &["https://", "http://", "ssh://", "git://", "git@", "file://"];
    if ALLOWED.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        Err(FetchError::Vcs {
            name: name.to_string(),
            reason: format!(
                "unsupported git URL '{}' (expected https://, http://, ssh://, git://, git@ or file://)",
                url
            ),
        })
    }
}

/// Compare the resolved commit with the pinned one.
///
/// A mismatch fails in strict mode and is only a warning under `--nocheck`.
fn check_commit(
    source: &GitSource,
    name: &str,
    actual: &str,
    strict: bool,
    reporter: &Reporter,
) -> Result<()> {
    let Some(expected) = &source.commit else {
        return Ok(());
    };
    if actual.eq_ignore_ascii_case(expected) {
        reporter.debug(&format!("tag {} is commit {}", source.tag, actual));
        return Ok(());
    }

    let reason = format!(
        "tag '{}' resolves to commit {}, expected {}",
        source.tag, actual, expected
    );
    if strict {
        Err(FetchError::Vcs {
            name: name.to_string(),
            reason,
        })
    } else {
        reporter.warning(&format!("{}: {} (ignored, --nocheck)", name, reason));
        Ok(())
    }
}

/// Clone, pin, archive and optionally extract the spec file.
pub fn stage_git(
    directive: &SourceDirective,
    source: &GitSource,
    ctx: &FetchContext<'_>,
) -> Result<StagedArtifact> {
    let name = directive.name.as_str();
    validate_git_url(&source.url, name)?;
    interrupt::check()?;

    let scratch = tempfile::Builder::new()
        .prefix(".source-fetch-git-")
        .tempdir_in(ctx.destdir)
        .map_err(|e| {
            FetchError::io(
                format!("cannot create scratch directory in {}", ctx.destdir.display()),
                e,
            )
        })?;
    let checkout = scratch.path().join(name);

    ctx.reporter
        .detail(&format!("git clone {} (tag {})", source.url, source.tag));
    {
        let _pb = ProgressGuard(ctx.reporter.spinner(&format!("cloning {}", name)));
        VcsCmd::new("git")
            .args(["clone", "--quiet", "--depth", "1", "--branch"])
            .arg(&source.tag)
            .arg("--")
            .arg(&source.url)
            .arg(&checkout)
            .run(name)?;
    }
    interrupt::check()?;

    let commit = VcsCmd::new("git")
        .dir(&checkout)
        .args(["rev-parse", "--verify", "HEAD^{commit}"])
        .output(name)?;
    check_commit(source, name, &commit, ctx.strict, ctx.reporter)?;

    let output_name = directive.output_name();
    let treeish = match &source.subdir {
        Some(subdir) => format!("{}:{}", commit, subdir),
        None => commit.clone(),
    };

    ctx.reporter.detail(&format!("archiving {} as {}", commit, output_name));
    let mut tarball = fs_utils::temp_file_in(ctx.destdir)?;
    VcsCmd::new("git")
        .dir(&checkout)
        .args(["archive", "--format=tar"])
        .arg(format!("--prefix={}/", directive.archive_prefix()))
        .arg(&treeish)
        .stream_stdout(name, |stdout| {
            archive::gzip_deterministic(stdout, tarball.as_file_mut())
        })?;
    interrupt::check()?;

    let outcome = if ctx.strict && directive.declared_hashes.is_empty() {
        VerifyOutcome::Revision(commit.clone())
    } else {
        verify_file(
            tarball.path(),
            &output_name,
            &directive.declared_hashes,
            ctx.strict,
            ctx.reporter,
        )?
    };

    let mut files = vec![StagedFile {
        temp: tarball,
        file_name: output_name,
    }];
    if ctx.wants_spec(directive) {
        let tree = match &source.subdir {
            Some(subdir) => checkout.join(subdir),
            None => checkout.clone(),
        };
        files.push(specfile::stage_spec(&tree, name, ctx.destdir)?);
    }

    Ok(StagedArtifact {
        files,
        outcome,
        origin: format!("{}@{}", source.url, commit),
    })
}
