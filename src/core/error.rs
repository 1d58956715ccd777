//! Fetch error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while parsing or resolving `.source` directives.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{}:{line}: malformed directive: {reason}", file.display())]
    MalformedDirective {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("no directives found in {}", file.display())]
    NoDirectives { file: PathBuf },

    #[error("unable to find '{name}' in any cache location:\n  {}", attempts.join("\n  "))]
    NotFound { name: String, attempts: Vec<String> },

    #[error("{algorithm} checksum mismatch for '{name}'\n  expected: {expected}\n  got:      {actual}")]
    HashMismatch {
        name: String,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    #[error("VCS error for '{name}': {reason}")]
    Vcs { name: String, reason: String },

    #[error("'{name}' declares no checksum; add a <algorithm>sum= entry or run with --nocheck")]
    UnverifiedSource { name: String },

    #[error("expected exactly one spec file in the tree of '{name}', found {found}")]
    SpecFile { name: String, found: usize },

    #[error("output '{}' is produced by more than one directive", path.display())]
    DuplicateOutput { path: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("interrupted")]
    Interrupted,

    #[error("{}:{line} ({name}): {source}", file.display())]
    DirectiveFailed {
        file: PathBuf,
        line: usize,
        name: String,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True if this error (or the cause it wraps) is a user interruption.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Interrupted => true,
            Self::DirectiveFailed { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }

    /// The innermost error, looking through `DirectiveFailed`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            Self::DirectiveFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Short category name, used as the title of diagnostic blocks.
    pub fn kind(&self) -> &'static str {
        match self.root_cause() {
            Self::MalformedDirective { .. } => "MalformedDirective",
            Self::NoDirectives { .. } => "NoDirectivesError",
            Self::NotFound { .. } => "NotFound",
            Self::HashMismatch { .. } => "HashMismatch",
            Self::Vcs { .. } => "VcsError",
            Self::UnverifiedSource { .. } => "UnverifiedSourceError",
            Self::SpecFile { .. } => "SpecFileError",
            Self::DuplicateOutput { .. } => "DuplicateOutput",
            Self::Io { .. } => "IOError",
            Self::Config(_) => "ConfigError",
            Self::Interrupted => "Interrupted",
            Self::DirectiveFailed { .. } => "DirectiveFailed",
        }
    }
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;
