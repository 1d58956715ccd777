//! Cache resolution with ordered fallback
//!
//! A cache-relative location is tried against every configured prefix in
//! order. A miss on one prefix (404, refused connection, timeout, missing
//! local file) is recorded and the next prefix is tried; only when the chain
//! is exhausted does resolution fail, listing every attempt.
//!
//! Absolute paths and full URLs bypass the chain and get exactly one attempt.
//! Bytes always land in a temp file inside the destination directory so the
//! caller can rename them into place atomically.

use crate::core::config::CachePrefix;
use crate::core::error::{FetchError, Result};
use crate::core::interrupt;
use crate::core::output::{ProgressGuard, Reporter, upgrade_to_bytes};
use crate::directive::FileLocation;
use crate::helpers::internal::fs_utils;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const USER_AGENT: &str = concat!("source-fetch/", env!("CARGO_PKG_VERSION"));

/// Bytes fetched from some location, not yet verified or moved into place.
#[derive(Debug)]
pub struct FetchedFile {
    pub file: NamedTempFile,
    /// The location that actually served the bytes
    pub origin: String,
    pub size: u64,
}

/// One concrete place to read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Local(PathBuf),
    Http(String),
    Unsupported(String),
}

impl Candidate {
    fn from_prefix(prefix: &CachePrefix, relpath: &str) -> Self {
        match prefix {
            CachePrefix::Local(dir) => Self::Local(dir.join(relpath)),
            CachePrefix::Http(_) => Self::Http(prefix.locate(relpath)),
        }
    }

    fn from_url(url: &str) -> Self {
        if let Some(path) = url.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Self::Http(url.to_string())
        } else {
            Self::Unsupported(url.to_string())
        }
    }

    fn display(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Http(url) | Self::Unsupported(url) => url.clone(),
        }
    }
}

/// Why a single attempt did not produce the file.
enum Attempt {
    /// Try the next location
    Miss(String),
    /// Stop resolving altogether
    Fatal(FetchError),
}

impl From<FetchError> for Attempt {
    fn from(err: FetchError) -> Self {
        Self::Fatal(err)
    }
}

/// Resolves file locations against an ordered list of cache prefixes.
pub struct CacheResolver {
    prefixes: Vec<CachePrefix>,
    agent: ureq::Agent,
}

impl CacheResolver {
    /// `timeout` bounds connecting and each read of the body, not the whole
    /// transfer, so a large artifact that keeps arriving is never cut off.
    pub fn new(prefixes: Vec<CachePrefix>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { prefixes, agent }
    }

    /// Fetch `location` into a temp file inside `dest_dir`.
    pub fn resolve(
        &self,
        location: &FileLocation,
        dest_dir: &Path,
        reporter: &Reporter,
    ) -> Result<FetchedFile> {
        let candidates = match location {
            FileLocation::Cache(relpath) => self
                .prefixes
                .iter()
                .map(|p| Candidate::from_prefix(p, relpath))
                .collect(),
            FileLocation::Absolute(path) => {
                reporter.warning(&format!(
                    "'{}' is an absolute path; it bypasses the upstream cache",
                    path
                ));
                vec![Candidate::Local(PathBuf::from(path))]
            }
            FileLocation::Url(url) => vec![Candidate::from_url(url)],
        };

        if candidates.is_empty() {
            return Err(FetchError::NotFound {
                name: location.as_str().to_string(),
                attempts: vec!["no cache prefixes configured".to_string()],
            });
        }

        let mut attempts = Vec::new();
        for candidate in &candidates {
            interrupt::check()?;
            reporter.debug(&format!("trying {}", candidate.display()));

            match self.fetch_one(candidate, dest_dir, reporter) {
                Ok(fetched) => {
                    reporter.detail(&format!(
                        "retrieved {} ({} bytes)",
                        fetched.origin, fetched.size
                    ));
                    return Ok(fetched);
                }
                Err(Attempt::Miss(reason)) => {
                    reporter.debug(&format!("{}: {}", candidate.display(), reason));
                    attempts.push(format!("{}: {}", candidate.display(), reason));
                }
                Err(Attempt::Fatal(err)) => return Err(err),
            }
        }

        Err(FetchError::NotFound {
            name: location.as_str().to_string(),
            attempts,
        })
    }

    fn fetch_one(
        &self,
        candidate: &Candidate,
        dest_dir: &Path,
        reporter: &Reporter,
    ) -> std::result::Result<FetchedFile, Attempt> {
        match candidate {
            Candidate::Local(path) => fetch_local(path, dest_dir),
            Candidate::Http(url) => self.fetch_http(url, dest_dir, reporter),
            Candidate::Unsupported(url) => Err(Attempt::Miss(format!(
                "unsupported URL scheme in '{}'",
                url
            ))),
        }
    }

    fn fetch_http(
        &self,
        url: &str,
        dest_dir: &Path,
        reporter: &Reporter,
    ) -> std::result::Result<FetchedFile, Attempt> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Attempt::Miss(format!("HTTP {}", code)));
            }
            Err(ureq::Error::Transport(t)) => {
                if interrupt::is_interrupted() {
                    return Err(Attempt::Fatal(FetchError::Interrupted));
                }
                return Err(Attempt::Miss(t.to_string()));
            }
        };

        let name = url.rsplit('/').next().unwrap_or(url);
        let pb = ProgressGuard(reporter.spinner(&format!("downloading {}", name)));
        if let Some(len) = response
            .header("content-length")
            .and_then(|s| s.parse().ok())
        {
            upgrade_to_bytes(&pb.0, len);
        }

        let mut temp = fs_utils::temp_file_in(dest_dir)?;
        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];
        let mut total = 0u64;

        loop {
            if interrupt::is_interrupted() {
                return Err(Attempt::Fatal(FetchError::Interrupted));
            }
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    if interrupt::is_interrupted() {
                        return Err(Attempt::Fatal(FetchError::Interrupted));
                    }
                    return Err(Attempt::Miss(format!("read error: {}", e)));
                }
            };
            temp.write_all(&buffer[..read]).map_err(|e| {
                FetchError::io(format!("cannot write {}", temp.path().display()), e)
            })?;
            total += read as u64;
            pb.0.set_position(total);
        }

        Ok(FetchedFile {
            file: temp,
            origin: url.to_string(),
            size: total,
        })
    }
}

fn fetch_local(path: &Path, dest_dir: &Path) -> std::result::Result<FetchedFile, Attempt> {
    if path.is_dir() {
        return Err(Attempt::Miss("is a directory".to_string()));
    }
    let mut reader = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Attempt::Miss("no such file".to_string()));
        }
        Err(e) => return Err(Attempt::Miss(e.to_string())),
    };

    let mut temp = fs_utils::temp_file_in(dest_dir)?;
    let size = std::io::copy(&mut reader, temp.as_file_mut())
        .map_err(|e| Attempt::Miss(format!("read error: {}", e)))?;

    Ok(FetchedFile {
        file: temp,
        origin: path.display().to_string(),
        size,
    })
}
