//! `type=svn` handler
//!
//! `svn export` writes a clean tree without `.svn` metadata, which is then
//! packed with [`archive::pack_tree`] so the same revision always yields the
//! same tarball bytes.

use super::{FetchContext, StagedArtifact, StagedFile, VerifyOutcome, specfile, verify_file};
use crate::core::error::{FetchError, Result};
use crate::core::interrupt;
use crate::core::output::ProgressGuard;
use crate::directive::{SourceDirective, SvnSource};
use crate::helpers::internal::archive;
use crate::helpers::internal::cmd::VcsCmd;
use crate::helpers::internal::fs_utils;

/// URL that `svn export` is pointed at.
fn export_url(source: &SvnSource) -> String {
    match &source.subdir {
        Some(subdir) => format!("{}/{}", source.url.trim_end_matches('/'), subdir),
        None => source.url.clone(),
    }
}

/// Export, pack and optionally extract the spec file.
pub fn stage_svn(
    directive: &SourceDirective,
    source: &SvnSource,
    ctx: &FetchContext<'_>,
) -> Result<StagedArtifact> {
    let name = directive.name.as_str();
    interrupt::check()?;

    let scratch = tempfile::Builder::new()
        .prefix(".source-fetch-svn-")
        .tempdir_in(ctx.destdir)
        .map_err(|e| {
            FetchError::io(
                format!("cannot create scratch directory in {}", ctx.destdir.display()),
                e,
            )
        })?;
    let tree = scratch.path().join(name);
    let url = export_url(source);

    ctx.reporter
        .detail(&format!("svn export {} (r{})", url, source.revision));
    {
        let _pb = ProgressGuard(ctx.reporter.spinner(&format!("exporting {}", name)));
        VcsCmd::new("svn")
            .args(["export", "--quiet", "--non-interactive", "-r"])
            .arg(source.revision.to_string())
            .arg(&url)
            .arg(&tree)
            .run(name)?;
    }
    interrupt::check()?;

    let output_name = directive.output_name();
    ctx.reporter.detail(&format!("packing r{} as {}", source.revision, output_name));
    let mut tarball = fs_utils::temp_file_in(ctx.destdir)?;
    archive::pack_tree(&tree, &directive.archive_prefix(), tarball.as_file_mut())?;

    let outcome = if ctx.strict && directive.declared_hashes.is_empty() {
        VerifyOutcome::Revision(format!("r{}", source.revision))
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
        files.push(specfile::stage_spec(&tree, name, ctx.destdir)?);
    }

    Ok(StagedArtifact {
        files,
        outcome,
        origin: format!("{}@{}", url, source.revision),
    })
}
