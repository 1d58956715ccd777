//! Fetch orchestration
//!
//! Runs every directive of one or more `.source` files strictly in file
//! order:
//! 1. parse each input (package directories expand to `upstream/*.source`)
//! 2. preflight: reject unverifiable file directives and clashing outputs
//!    before anything is fetched
//! 3. stage each directive through its handler
//! 4. rename the staged outputs into the destination directory
//! 5. for package directories, copy the remaining `upstream/` files and
//!    then the `osg/` overrides
//!
//! The first failure aborts the run, wrapped in
//! [`FetchError::DirectiveFailed`] so the message names the file and line.

mod inputs;

pub use inputs::{InputSet, expand_inputs};

use crate::core::config::{CachePrefix, Config};
use crate::core::error::{FetchError, Result};
use crate::core::interrupt;
use crate::core::output::Reporter;
use crate::directive::{DirectiveKind, SourceDirective};
use crate::helpers::acquire::{self, CacheResolver, FetchContext, ResolvedArtifact};
use crate::helpers::internal::fs_utils;
use crate::parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shared by every directive in a run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Verify digests; `false` under `--nocheck`
    pub strict: bool,
    /// Extract spec files from every git/svn tree
    pub want_spec: bool,
    /// Cache prefixes, tried in order
    pub cache_chain: Vec<CachePrefix>,
    pub http_timeout: Duration,
    pub reporter: Reporter,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            strict: true,
            want_spec: false,
            cache_chain: Vec::new(),
            http_timeout: Duration::from_secs(30),
            reporter: Reporter::default(),
        }
    }
}

impl FetchOptions {
    /// Options from a loaded config; `overrides` are the `-c` prefixes.
    pub fn from_config(config: &Config, overrides: &[String]) -> Self {
        Self {
            cache_chain: config.cache_chain(overrides),
            http_timeout: config.http_timeout(),
            ..Self::default()
        }
    }
}

/// A parsed input file and its directives.
struct SourceFile {
    path: PathBuf,
    directives: Vec<SourceDirective>,
}

/// One command-line argument, parsed.
struct Package {
    files: Vec<SourceFile>,
    extras: Vec<PathBuf>,
    overrides: Vec<PathBuf>,
}

/// Executes directives against one destination directory.
pub struct FetchEngine {
    options: FetchOptions,
    resolver: CacheResolver,
}

impl FetchEngine {
    pub fn new(options: FetchOptions) -> Self {
        let resolver = CacheResolver::new(options.cache_chain.clone(), options.http_timeout);
        Self { options, resolver }
    }

    /// Process the given `.source` files or package directories in order.
    ///
    /// Returns every output path: each input's directive outputs in order,
    /// then the package files it copied.
    pub fn run(&self, inputs: &[PathBuf], destdir: &Path) -> Result<Vec<PathBuf>> {
        let reporter = &self.options.reporter;
        let mut packages = Vec::new();
        for set in expand_inputs(inputs)? {
            let mut files = Vec::with_capacity(set.sources.len());
            for path in set.sources {
                let directives = parser::parse_source_file(&path)?;
                reporter.debug(&format!(
                    "{}: {} directive(s)",
                    path.display(),
                    directives.len()
                ));
                files.push(SourceFile { path, directives });
            }
            packages.push(Package {
                files,
                extras: set.extras,
                overrides: set.overrides,
            });
        }

        let mut claimed = BTreeSet::new();
        for package in &packages {
            for file in &package.files {
                self.preflight(file, destdir, &mut claimed)?;
            }
            for extra in &package.extras {
                let dest = copy_destination(extra, destdir);
                if !claimed.insert(dest.clone()) {
                    return Err(FetchError::DuplicateOutput { path: dest });
                }
            }
        }

        fs_utils::ensure_dir(destdir)?;

        let mut outputs = Vec::new();
        let mut committed = BTreeSet::new();
        for package in &packages {
            for file in &package.files {
                reporter.action(&format!("Processing {}", file.path.display()));
                for artifact in self.process_file(file, destdir, &mut committed)? {
                    outputs.extend(artifact.paths);
                }
            }
            for extra in &package.extras {
                self.copy_in(extra, destdir, false, &mut committed, &mut outputs)?;
            }
            for file in &package.overrides {
                self.copy_in(file, destdir, true, &mut committed, &mut outputs)?;
            }
        }
        Ok(outputs)
    }

    /// Copy a package file into `destdir`. Only overrides may replace an
    /// output produced earlier in the run; a replaced output keeps its
    /// place in the list.
    fn copy_in(
        &self,
        src: &Path,
        destdir: &Path,
        replace: bool,
        committed: &mut BTreeSet<PathBuf>,
        outputs: &mut Vec<PathBuf>,
    ) -> Result<()> {
        interrupt::check()?;
        let dest = copy_destination(src, destdir);
        let reporter = &self.options.reporter;
        if committed.contains(&dest) {
            if !replace {
                return Err(FetchError::DuplicateOutput { path: dest });
            }
            reporter.detail(&format!("{} overrides the fetched file", src.display()));
        } else {
            reporter.detail(&format!("copying {}", src.display()));
        }

        fs_utils::copy_atomic(src, &dest)?;
        if committed.insert(dest.clone()) {
            outputs.push(dest);
        }
        Ok(())
    }

    /// Checks that need no network: strict file directives must declare a
    /// digest, and no two directives may name the same primary output.
    fn preflight(
        &self,
        file: &SourceFile,
        destdir: &Path,
        claimed: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        for directive in &file.directives {
            if self.options.strict
                && matches!(directive.kind, DirectiveKind::File(_))
                && directive.declared_hashes.is_empty()
            {
                return Err(wrap(
                    file,
                    directive,
                    FetchError::UnverifiedSource {
                        name: directive.name.clone(),
                    },
                ));
            }

            let dest = destdir.join(directive.output_name());
            if !claimed.insert(dest.clone()) {
                return Err(wrap(file, directive, FetchError::DuplicateOutput { path: dest }));
            }
        }
        Ok(())
    }

    fn process_file(
        &self,
        file: &SourceFile,
        destdir: &Path,
        committed: &mut BTreeSet<PathBuf>,
    ) -> Result<Vec<ResolvedArtifact>> {
        let reporter = &self.options.reporter;
        let ctx = FetchContext {
            destdir,
            strict: self.options.strict,
            want_spec: self.options.want_spec,
            resolver: &self.resolver,
            reporter,
        };

        let total = file.directives.len();
        let mut artifacts = Vec::with_capacity(total);
        for (i, directive) in file.directives.iter().enumerate() {
            interrupt::check().map_err(|e| wrap(file, directive, e))?;
            reporter.action_numbered(i + 1, total, &directive.output_name());

            let artifact = self
                .process_directive(directive, &ctx, committed)
                .map_err(|e| wrap(file, directive, e))?;
            reporter.detail(&format!("{} from {}", artifact.outcome, artifact.origin));
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    fn process_directive(
        &self,
        directive: &SourceDirective,
        ctx: &FetchContext<'_>,
        committed: &mut BTreeSet<PathBuf>,
    ) -> Result<ResolvedArtifact> {
        let staged = acquire::stage(directive, ctx)?;
        interrupt::check()?;

        let destinations = staged.destinations(ctx.destdir);
        for dest in &destinations {
            if committed.contains(dest) {
                return Err(FetchError::DuplicateOutput { path: dest.clone() });
            }
        }
        let artifact = staged.commit(ctx.destdir)?;
        committed.extend(destinations);
        Ok(artifact)
    }
}

fn copy_destination(src: &Path, destdir: &Path) -> PathBuf {
    match src.file_name() {
        Some(name) => destdir.join(name),
        None => destdir.join(src),
    }
}

fn wrap(file: &SourceFile, directive: &SourceDirective, err: FetchError) -> FetchError {
    FetchError::DirectiveFailed {
        file: file.path.clone(),
        line: directive.line,
        name: directive.name.clone(),
        source: Box::new(err),
    }
}

/// Process one `.source` file (or package directory) into `destdir`.
pub fn process(file_path: &Path, destdir: &Path, options: &FetchOptions) -> Result<Vec<PathBuf>> {
    process_all(&[file_path.to_path_buf()], destdir, options)
}

/// Process several inputs in order, sharing one set of claimed outputs.
pub fn process_all(
    paths: &[PathBuf],
    destdir: &Path,
    options: &FetchOptions,
) -> Result<Vec<PathBuf>> {
    FetchEngine::new(options.clone()).run(paths, destdir)
}
