//! `type=file` handler

use super::{FetchContext, StagedArtifact, StagedFile, verify_file};
use crate::core::error::Result;
use crate::directive::{FileSource, SourceDirective};

/// Resolve a file through the cache chain and verify it.
///
/// A digest mismatch drops the temp file, so nothing reaches the destination.
pub fn stage_file(
    directive: &SourceDirective,
    source: &FileSource,
    ctx: &FetchContext<'_>,
) -> Result<StagedArtifact> {
    ctx.reporter
        .detail(&format!("resolving {}", source.location.as_str()));
    let fetched = ctx
        .resolver
        .resolve(&source.location, ctx.destdir, ctx.reporter)?;

    let outcome = verify_file(
        fetched.file.path(),
        &directive.name,
        &directive.declared_hashes,
        ctx.strict,
        ctx.reporter,
    )?;

    Ok(StagedArtifact {
        files: vec![StagedFile {
            temp: fetched.file,
            file_name: directive.name.clone(),
        }],
        outcome,
        origin: fetched.origin,
    })
}
