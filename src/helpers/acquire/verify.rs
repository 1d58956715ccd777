//! Hash verification
//!
//! Every declared digest is checked. Under `--nocheck` verification is
//! skipped outright, and the skip is reported as a warning because it turns
//! off the only integrity check on upstream content.

use crate::core::error::{FetchError, Result};
use crate::core::output::Reporter;
use crate::helpers::internal::hash::{self, HashAlgorithm};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// All of these digests matched
    Verified(Vec<HashAlgorithm>),
    /// Verification was disabled
    Skipped,
    /// No digests declared; content is identified by this VCS revision
    Revision(String),
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified(algorithms) => {
                let names: Vec<&str> = algorithms.iter().map(|a| a.name()).collect();
                write!(f, "verified ({})", names.join(", "))
            }
            Self::Skipped => f.write_str("not verified"),
            Self::Revision(rev) => write!(f, "pinned to {}", rev),
        }
    }
}

/// Verify `path` against `declared`.
///
/// `name` is only used in messages. With `strict` off this always succeeds.
pub fn verify_file(
    path: &Path,
    name: &str,
    declared: &BTreeMap<HashAlgorithm, String>,
    strict: bool,
    reporter: &Reporter,
) -> Result<VerifyOutcome> {
    if !strict {
        reporter.warning(&format!(
            "checksum verification disabled (--nocheck); '{}' is NOT verified",
            name
        ));
        return Ok(VerifyOutcome::Skipped);
    }

    if declared.is_empty() {
        return Err(FetchError::UnverifiedSource {
            name: name.to_string(),
        });
    }

    let algorithms: Vec<HashAlgorithm> = declared.keys().copied().collect();
    let actual = hash::hash_file(path, &algorithms)
        .map_err(|e| FetchError::io(format!("cannot hash {}", path.display()), e))?;

    for (algorithm, expected) in declared {
        let got = actual.get(algorithm).map(String::as_str).unwrap_or_default();
        if !got.eq_ignore_ascii_case(expected) {
            return Err(FetchError::HashMismatch {
                name: name.to_string(),
                algorithm: algorithm.name(),
                expected: expected.to_ascii_lowercase(),
                actual: got.to_string(),
            });
        }
        reporter.debug(&format!("{} ok: {}", algorithm, got));
    }

    reporter.detail(&format!(
        "verified {} ({})",
        name,
        algorithms
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    Ok(VerifyOutcome::Verified(algorithms))
}
