//! Fetch upstream sources for RPM packaging from `.source` files
//!
//! A `.source` file lists one directive per line. Each directive names where
//! a source artifact comes from and how to check it:
//!
//! ```text
//! # legacy cache-relative path with digest
//! foo/1.0/foo-1.0.tar.gz sha1sum=0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33
//! type=file url=https://example.org/bar-2.0.tar.gz sha256sum=...
//! type=git url=https://github.com/opensciencegrid/cvmfs-config-osg.git tag=v2.1 spec=yes
//! type=github repo=opensciencegrid/cvmfs-config-osg tag=v2.1-2 tarball=tarfile.tar.gz
//! type=svn url=https://vdt.cs.wisc.edu/svn/native/redhat/trunk/foo revision=12345
//! ```
//!
//! Processing a file yields the output paths in directive order:
//!
//! - **file** directives are looked up under each cache prefix in turn
//!   (local directories and HTTP mirrors) and verified against every
//!   declared digest
//! - **git** directives are cloned at a tag and archived into a tarball
//! - **svn** directives are exported at a revision and packed into a tarball
//!
//! Git and svn trees can also yield their RPM spec file. Nothing is written
//! under its final name until it has been fetched, verified and packaged.
//!
//! # Example
//!
//! ```no_run
//! use source_fetch::{Config, FetchOptions, process};
//! use std::path::Path;
//!
//! let config = Config::load(None)?;
//! let options = FetchOptions::from_config(&config, &[]);
//! for path in process(Path::new("upstream/foo.source"), Path::new("."), &options)? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), source_fetch::FetchError>(())
//! ```

pub mod core;
pub mod directive;
pub mod engine;
pub mod helpers;
pub mod parser;

pub use crate::core::config::{CachePrefix, Config};
pub use crate::core::error::{FetchError, Result};
pub use crate::core::output::{self, LogLevel, Reporter};
pub use crate::directive::{DirectiveKind, SourceDirective, SourceType};
pub use crate::engine::{FetchEngine, FetchOptions, process, process_all};
pub use crate::helpers::acquire::{ResolvedArtifact, VerifyOutcome};
pub use crate::helpers::internal::hash::HashAlgorithm;
pub use crate::parser::{parse_source, parse_source_file};
