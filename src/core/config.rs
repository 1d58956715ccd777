//! Cache and transport configuration
//!
//! Loaded from TOML. Every field is optional; missing fields fall back to the
//! built-in defaults.
//!
//! ```toml
//! cache_prefixes = ["AUTO"]
//! web_cache_prefix = "https://vdt.cs.wisc.edu/upstream"
//! afs_cache_path = "/p/vdt/public/html/upstream"
//! http_timeout_secs = 30
//! ```

use super::error::{FetchError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public web cache of upstream sources
pub const WEB_CACHE_PREFIX: &str = "https://vdt.cs.wisc.edu/upstream";

/// Institutional AFS mirror of the web cache
pub const AFS_CACHE_PATH: &str = "/p/vdt/public/html/upstream";

/// Default HTTP timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming an alternate config file
pub const CONFIG_ENV: &str = "SOURCE_FETCH_CONFIG";

/// Environment variable overriding the HTTP timeout
pub const HTTP_TIMEOUT_ENV: &str = "SOURCE_FETCH_HTTP_TIMEOUT";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default prefix chain, used when no `-c` override is given.
    pub cache_prefixes: Vec<String>,
    pub web_cache_prefix: String,
    pub afs_cache_path: PathBuf,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_prefixes: vec!["AUTO".to_string()],
            web_cache_prefix: WEB_CACHE_PREFIX.to_string(),
            afs_cache_path: PathBuf::from(AFS_CACHE_PATH),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// One location that may hold pre-fetched upstream files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePrefix {
    /// A directory on a local or network filesystem
    Local(PathBuf),
    /// An HTTP(S) base URL
    Http(String),
}

impl CachePrefix {
    /// Classify a prefix string: `file://` and bare paths are local.
    pub fn parse(prefix: &str) -> Self {
        if let Some(path) = prefix.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else if prefix.starts_with("http://") || prefix.starts_with("https://") {
            Self::Http(prefix.trim_end_matches('/').to_string())
        } else {
            Self::Local(PathBuf::from(prefix))
        }
    }

    /// Where `relpath` would live under this prefix.
    pub fn locate(&self, relpath: &str) -> String {
        match self {
            Self::Local(dir) => dir.join(relpath).display().to_string(),
            Self::Http(base) => format!("{}/{}", base, relpath.trim_start_matches('/')),
        }
    }
}

impl std::fmt::Display for CachePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(dir) => write!(f, "file://{}", dir.display()),
            Self::Http(base) => f.write_str(base),
        }
    }
}

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FetchError::Config(e.to_string()))
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FetchError::io(format!("cannot read config {}", path.display()), e))?;
        toml::from_str(&text).map_err(|e| FetchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration: the explicit path if given, else `$SOURCE_FETCH_CONFIG`,
    /// else the per-user config file if it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        if let Some(path) = default_config_path()
            && path.is_file()
        {
            return Self::from_file(&path);
        }
        Ok(Self::default())
    }

    /// HTTP timeout, honouring the environment override and clamped to 5-300s.
    pub fn http_timeout(&self) -> Duration {
        let secs = std::env::var(HTTP_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(self.http_timeout_secs);
        Duration::from_secs(secs.clamp(5, 300))
    }

    /// Expand prefix names into the ordered chain the resolver will try.
    ///
    /// `overrides` (from `-c`) replace the configured default chain entirely.
    /// Special names: `AFS`, `VDT`, and `AUTO` (AFS when mounted, then VDT).
    pub fn cache_chain(&self, overrides: &[String]) -> Vec<CachePrefix> {
        let names = if overrides.is_empty() {
            &self.cache_prefixes
        } else {
            overrides
        };

        let mut chain: Vec<CachePrefix> = Vec::new();
        for name in names {
            for prefix in self.expand_prefix(name) {
                if !chain.contains(&prefix) {
                    chain.push(prefix);
                }
            }
        }
        chain
    }

    fn expand_prefix(&self, name: &str) -> Vec<CachePrefix> {
        match name.to_ascii_uppercase().as_str() {
            "AFS" => vec![CachePrefix::Local(self.afs_cache_path.clone())],
            "VDT" => vec![CachePrefix::parse(&self.web_cache_prefix)],
            "AUTO" => {
                let mut chain = Vec::new();
                if self.afs_cache_path.is_dir() {
                    chain.push(CachePrefix::Local(self.afs_cache_path.clone()));
                }
                chain.push(CachePrefix::parse(&self.web_cache_prefix));
                chain
            }
            _ => vec![CachePrefix::parse(name)],
        }
    }
}

/// `$XDG_CONFIG_HOME/source-fetch/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("source-fetch").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_classification() {
        assert_eq!(
            CachePrefix::parse("file:///p/vdt/public/html/upstream"),
            CachePrefix::Local(PathBuf::from("/p/vdt/public/html/upstream"))
        );
        assert_eq!(
            CachePrefix::parse("https://example.org/upstream/"),
            CachePrefix::Http("https://example.org/upstream".to_string())
        );
        assert_eq!(
            CachePrefix::parse("/srv/cache"),
            CachePrefix::Local(PathBuf::from("/srv/cache"))
        );
    }

    #[test]
    fn test_locate_joins_relative_path() {
        let http = CachePrefix::parse("https://example.org/upstream");
        assert_eq!(
            http.locate("foo/1.0/foo-1.0.tar.gz"),
            "https://example.org/upstream/foo/1.0/foo-1.0.tar.gz"
        );
        let local = CachePrefix::parse("/srv/cache");
        assert_eq!(local.locate("foo.tar.gz"), "/srv/cache/foo.tar.gz");
    }

    #[test]
    fn test_auto_without_afs_is_web_only() {
        let config = Config {
            afs_cache_path: PathBuf::from("/nonexistent/afs/path"),
            ..Config::default()
        };
        assert_eq!(
            config.cache_chain(&[]),
            vec![CachePrefix::Http(WEB_CACHE_PREFIX.to_string())]
        );
    }

    #[test]
    fn test_auto_with_afs_tries_afs_first() {
        let afs = tempfile::tempdir().unwrap();
        let config = Config {
            afs_cache_path: afs.path().to_path_buf(),
            ..Config::default()
        };
        assert_eq!(
            config.cache_chain(&[]),
            vec![
                CachePrefix::Local(afs.path().to_path_buf()),
                CachePrefix::Http(WEB_CACHE_PREFIX.to_string()),
            ]
        );
    }

    #[test]
    fn test_overrides_replace_default_chain_in_order() {
        let config = Config::default();
        let chain = config.cache_chain(&[
            "/srv/mirror".to_string(),
            "VDT".to_string(),
            "AFS".to_string(),
        ]);
        assert_eq!(
            chain,
            vec![
                CachePrefix::Local(PathBuf::from("/srv/mirror")),
                CachePrefix::Http(WEB_CACHE_PREFIX.to_string()),
                CachePrefix::Local(PathBuf::from(AFS_CACHE_PATH)),
            ]
        );
    }

    #[test]
    fn test_duplicate_prefixes_collapsed() {
        let config = Config::default();
        let chain = config.cache_chain(&["VDT".to_string(), WEB_CACHE_PREFIX.to_string()]);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
cache_prefixes = ["https://mirror.example.org/upstream", "VDT"]
http_timeout_secs = 60
"#,
        )
        .unwrap();
        assert_eq!(config.cache_prefixes.len(), 2);
        assert_eq!(config.http_timeout_secs, 60);
        assert_eq!(config.web_cache_prefix, WEB_CACHE_PREFIX);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = Config::from_toml("cache_prefix = \"x\"").unwrap_err();
        assert!(matches!(err, FetchError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "afs_cache_path = \"/afs/x\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.afs_cache_path, PathBuf::from("/afs/x"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
