//! `.source` file parser
//!
//! One directive per line. Lines are split shell-style; tokens of the form
//! `key=value` are attributes and a token without `=` is the location of a
//! plain file:
//!
//! ```text
//! # comment
//! foo/1.0/foo-1.0.tar.gz sha1sum=0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33
//! type=git url=https://github.com/org/foo.git tag=v1.0 hash=5ea1914b... spec=yes
//! type=github repo=org/foo tag=v1.0 tarball=foo.tar.gz
//! type=svn url=https://svn.example.org/native/redhat/trunk/foo revision=12345
//! ```
//!
//! Unknown keys are errors, not warnings: a misspelled `sha1sum` must not
//! silently turn a verified source into an unverified one.

use crate::core::error::{FetchError, Result};
use crate::directive::{
    DirectiveKind, FileLocation, FileSource, GitSource, SourceDirective, SvnSource,
};
use crate::helpers::internal::fs_utils::{is_plain_file_name, is_safe_relative_path};
use crate::helpers::internal::hash::HashAlgorithm;
use std::collections::BTreeMap;
use std::path::Path;

const KNOWN_KEYS: &[&str] = &[
    "type", "url", "repo", "name", "tag", "revision", "hash", "tarball", "spec", "subdir",
];

/// Parse a `.source` file from disk.
pub fn parse_source_file(path: &Path) -> Result<Vec<SourceDirective>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FetchError::io(format!("cannot read {}", path.display()), e))?;
    parse_source(&text, path)
}

/// Parse the text of a `.source` file. `origin` is only used in diagnostics.
///
/// Directives come back in file order. A file with no directives is an error.
pub fn parse_source(text: &str, origin: &Path) -> Result<Vec<SourceDirective>> {
    let mut directives = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some(directive) = parse_line(line, idx + 1, origin)? {
            directives.push(directive);
        }
    }

    if directives.is_empty() {
        return Err(FetchError::NoDirectives {
            file: origin.to_path_buf(),
        });
    }
    Ok(directives)
}

/// Parse a single line. Blank lines and comments yield `None`.
pub fn parse_line(line: &str, lineno: usize, origin: &Path) -> Result<Option<SourceDirective>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| FetchError::MalformedDirective {
        file: origin.to_path_buf(),
        line: lineno,
        reason,
    };

    let tokens = shlex::split(trimmed)
        .ok_or_else(|| malformed("unbalanced quotes or trailing escape".to_string()))?;

    let mut fields = Fields::default();
    let mut positional: Option<String> = None;
    let lone_location = tokens.len() == 1 && looks_like_location(&tokens[0]);
    for token in tokens {
        if lone_location {
            positional = Some(token);
            continue;
        }
        match token.split_once('=') {
            Some((key, value)) => fields.insert(key, value).map_err(&malformed)?,
            None if positional.is_none() => positional = Some(token),
            None => {
                return Err(malformed(format!(
                    "unexpected extra field '{}' (only one file location may be given)",
                    token
                )));
            }
        }
    }

    let directive = build_directive(lineno, positional, fields).map_err(malformed)?;
    Ok(Some(directive))
}

/// A URL or absolute path, which may carry `=` in its query string.
fn looks_like_location(token: &str) -> bool {
    token.contains("://") || token.starts_with('/')
}

/// Attribute bag that remembers which keys were consumed.
#[derive(Default)]
struct Fields(BTreeMap<String, String>);

impl Fields {
    fn insert(&mut self, key: &str, value: &str) -> Result<(), String> {
        if key.is_empty() {
            return Err(format!("missing key in '={}'", value));
        }
        let is_digest = HashAlgorithm::from_directive_key(key).is_some();
        if !is_digest && !KNOWN_KEYS.contains(&key) {
            return Err(format!("unknown key '{}'", key));
        }
        if value.is_empty() {
            return Err(format!("empty value for '{}'", key));
        }
        if self.0.insert(key.to_string(), value.to_string()).is_some() {
            return Err(format!("duplicate key '{}'", key));
        }
        Ok(())
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    fn require(&mut self, key: &str, kind: &str) -> Result<String, String> {
        self.take(key)
            .ok_or_else(|| format!("type={} requires '{}'", kind, key))
    }

    /// Pull out every `<algorithm>sum` entry.
    fn take_hashes(&mut self) -> Result<BTreeMap<HashAlgorithm, String>, String> {
        let mut hashes = BTreeMap::new();
        for algorithm in HashAlgorithm::ALL {
            if let Some(digest) = self.take(&algorithm.directive_key()) {
                if !algorithm.is_valid_digest(&digest) {
                    return Err(format!(
                        "'{}' is not a valid {} digest (expected {} hex characters)",
                        digest,
                        algorithm,
                        algorithm.hex_len()
                    ));
                }
                hashes.insert(algorithm, digest.to_ascii_lowercase());
            }
        }
        Ok(hashes)
    }

    /// Anything left over is valid syntax but not meaningful for this type.
    fn finish(self, kind: &str) -> Result<(), String> {
        match self.0.keys().next() {
            Some(key) => Err(format!("key '{}' is not valid for type={}", key, kind)),
            None => Ok(()),
        }
    }
}

fn build_directive(
    line: usize,
    positional: Option<String>,
    mut fields: Fields,
) -> Result<SourceDirective, String> {
    let kind = match fields.take("type") {
        Some(t) => t,
        None if positional.is_some() || fields.0.contains_key("url") => "file".to_string(),
        None => return Err("missing 'type' and no file location given".to_string()),
    };

    let declared_hashes = fields.take_hashes()?;

    match kind.as_str() {
        "file" => build_file(line, positional, fields, declared_hashes),
        "git" | "github" => {
            reject_positional(&positional, &kind)?;
            build_git(line, &kind, fields, declared_hashes)
        }
        "svn" => {
            reject_positional(&positional, &kind)?;
            build_svn(line, fields, declared_hashes)
        }
        other => Err(format!(
            "unknown type '{}' (expected file, git, github or svn)",
            other
        )),
    }
}

fn reject_positional(positional: &Option<String>, kind: &str) -> Result<(), String> {
    match positional {
        Some(p) => Err(format!(
            "unexpected field '{}' for type={} (use key=value)",
            p, kind
        )),
        None => Ok(()),
    }
}

fn build_file(
    line: usize,
    positional: Option<String>,
    mut fields: Fields,
    declared_hashes: BTreeMap<HashAlgorithm, String>,
) -> Result<SourceDirective, String> {
    let location = match (positional, fields.take("url")) {
        (Some(_), Some(_)) => {
            return Err("file location given both positionally and as url=".to_string());
        }
        (Some(loc), None) | (None, Some(loc)) => FileLocation::classify(&loc),
        (None, None) => return Err("type=file requires a location".to_string()),
    };

    if let FileLocation::Cache(rel) = &location
        && !is_safe_relative_path(Path::new(rel))
    {
        return Err(format!("cache path '{}' escapes the cache", rel));
    }

    let name = fields
        .take("name")
        .unwrap_or_else(|| location.basename().to_string());
    check_file_name(&name, "name")?;
    fields.finish("file")?;

    Ok(SourceDirective {
        line,
        name,
        kind: DirectiveKind::File(FileSource { location }),
        declared_hashes,
        want_spec: false,
    })
}

fn build_git(
    line: usize,
    kind: &str,
    mut fields: Fields,
    declared_hashes: BTreeMap<HashAlgorithm, String>,
) -> Result<SourceDirective, String> {
    let url = if kind == "github" {
        let repo = fields.require("repo", kind)?;
        let mut parts = repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                format!("https://github.com/{}/{}.git", owner, name.trim_end_matches(".git"))
            }
            _ => return Err(format!("repo '{}' must be of the form OWNER/NAME", repo)),
        }
    } else {
        fields.require("url", kind)?
    };

    let name = match fields.take("name") {
        Some(name) => name,
        None => repo_name_from_url(&url)
            .ok_or_else(|| format!("cannot derive a name from '{}'; add name=", url))?,
    };
    check_file_name(&name, "name")?;

    let tag = fields.require("tag", kind)?;
    let commit = fields.take("hash");
    if let Some(commit) = &commit
        && !is_commit_id(commit)
    {
        return Err(format!("hash '{}' is not a full git commit id", commit));
    }

    let tarball = fields.take("tarball");
    if let Some(t) = &tarball {
        check_file_name(t, "tarball")?;
    }
    let subdir = take_subdir(&mut fields)?;
    let want_spec = take_flag(&mut fields, "spec")?;
    fields.finish(kind)?;

    Ok(SourceDirective {
        line,
        name,
        kind: DirectiveKind::Git(GitSource {
            url,
            tag,
            commit: commit.map(|c| c.to_ascii_lowercase()),
            tarball,
            subdir,
        }),
        declared_hashes,
        want_spec,
    })
}

fn build_svn(
    line: usize,
    mut fields: Fields,
    declared_hashes: BTreeMap<HashAlgorithm, String>,
) -> Result<SourceDirective, String> {
    let url = fields.require("url", "svn")?;
    let revision = fields.require("revision", "svn")?;
    let revision: u64 = revision
        .strip_prefix('r')
        .unwrap_or(&revision)
        .parse()
        .map_err(|_| format!("revision '{}' is not a revision number", revision))?;

    let name = match fields.take("name") {
        Some(name) => name,
        None => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .map(String::from)
            .ok_or_else(|| format!("cannot derive a name from '{}'; add name=", url))?,
    };
    check_file_name(&name, "name")?;

    let tarball = fields.take("tarball");
    if let Some(t) = &tarball {
        check_file_name(t, "tarball")?;
    }
    let subdir = take_subdir(&mut fields)?;
    let want_spec = take_flag(&mut fields, "spec")?;
    fields.finish("svn")?;

    Ok(SourceDirective {
        line,
        name,
        kind: DirectiveKind::Svn(SvnSource {
            url,
            revision,
            tarball,
            subdir,
        }),
        declared_hashes,
        want_spec,
    })
}

fn take_subdir(fields: &mut Fields) -> Result<Option<String>, String> {
    let subdir = fields.take("subdir");
    if let Some(s) = &subdir
        && !is_safe_relative_path(Path::new(s))
    {
        return Err(format!("subdir '{}' must be a relative path inside the tree", s));
    }
    Ok(subdir.map(|s| s.trim_end_matches('/').to_string()))
}

fn take_flag(fields: &mut Fields, key: &str) -> Result<bool, String> {
    match fields.take(key) {
        None => Ok(false),
        Some(value) => parse_bool(&value)
            .ok_or_else(|| format!("'{}' is not a boolean value for '{}'", value, key)),
    }
}

/// Accepts the usual spellings: 1/0, yes/no, true/false, on/off.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "y" | "true" | "on" => Some(true),
        "0" | "no" | "n" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn check_file_name(name: &str, key: &str) -> Result<(), String> {
    if is_plain_file_name(name) {
        Ok(())
    } else {
        Err(format!("{} '{}' must be a plain file name", key, name))
    }
}

/// SHA-1 (40) or SHA-256 (64) object id.
fn is_commit_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// `https://host/org/foo.git` -> `foo`. Only URLs ending in `.git` qualify.
fn repo_name_from_url(url: &str) -> Option<String> {
    let url = url.trim_end_matches('/');
    let base = url.rsplit(['/', ':']).next()?;
    base.strip_suffix(".git")
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::SourceType;

    const SHA1: &str = "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";
    const COMMIT: &str = "5ea1914b621cef204879ec1cc55e0216e3812785";

    fn origin() -> &'static Path {
        Path::new("upstream/test.source")
    }

    fn one(line: &str) -> SourceDirective {
        parse_line(line, 1, origin()).unwrap().unwrap()
    }

    fn reason(line: &str) -> String {
        match parse_line(line, 7, origin()) {
            Err(FetchError::MalformedDirective { line, reason, .. }) => {
                assert_eq!(line, 7);
                reason
            }
            other => panic!("expected MalformedDirective, got {:?}", other),
        }
    }

    // ==================== File directives ====================

    #[test]
    fn test_legacy_cache_path() {
        let d = one("foo/1.0/foo-1.0.tar.gz");
        assert_eq!(d.source_type(), SourceType::File);
        assert_eq!(d.name, "foo-1.0.tar.gz");
        assert_eq!(d.url(), "foo/1.0/foo-1.0.tar.gz");
        assert!(d.declared_hashes.is_empty());
    }

    #[test]
    fn test_cache_path_with_digest() {
        let d = one(&format!("foo/1.0/foo-1.0.tar.gz sha1sum={}", SHA1.to_uppercase()));
        assert_eq!(d.declared_hashes[&HashAlgorithm::Sha1], SHA1);
    }

    #[test]
    fn test_explicit_file_type_with_url() {
        let d = one(&format!(
            "type=file url=https://example.org/dl/bar-2.0.tar.gz name=bar.tar.gz sha1sum={}",
            SHA1
        ));
        assert_eq!(d.name, "bar.tar.gz");
        match d.kind {
            DirectiveKind::File(f) => assert!(matches!(f.location, FileLocation::Url(_))),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_lone_url_with_query_string() {
        let d = one("https://example.org/dl/bar-2.0.tar.gz?raw=1&token=abc");
        assert_eq!(d.name, "bar-2.0.tar.gz");
        assert_eq!(d.url(), "https://example.org/dl/bar-2.0.tar.gz?raw=1&token=abc");
        assert!(matches!(
            d.kind,
            DirectiveKind::File(FileSource {
                location: FileLocation::Url(_)
            })
        ));
        // With digests alongside, key=value splitting applies as usual.
        assert!(reason("https://example.org/dl?file=x.tar.gz sha1sum=00").contains("unknown key"));
    }

    #[test]
    fn test_quoted_values() {
        let d = one(&format!("\"dir with space/foo.tar.gz\" sha1sum={}", SHA1));
        assert_eq!(d.url(), "dir with space/foo.tar.gz");
    }

    #[test]
    fn test_file_rejects_vcs_keys() {
        assert!(reason("foo.tar.gz tag=v1").contains("not valid for type=file"));
    }

    #[test]
    fn test_file_rejects_two_locations() {
        assert!(reason("foo.tar.gz bar.tar.gz").contains("unexpected extra field"));
        assert!(reason("foo.tar.gz url=bar.tar.gz").contains("both"));
    }

    #[test]
    fn test_cache_path_traversal_rejected() {
        assert!(reason("../../etc/passwd").contains("escapes"));
    }

    // ==================== Git directives ====================

    #[test]
    fn test_git_directive() {
        let d = one(&format!(
            "type=git url=https://github.com/opensciencegrid/cvmfs-config-osg.git tag=v2.1 hash={} spec=yes",
            COMMIT
        ));
        assert_eq!(d.source_type(), SourceType::Git);
        assert_eq!(d.name, "cvmfs-config-osg");
        assert!(d.want_spec);
        match &d.kind {
            DirectiveKind::Git(g) => {
                assert_eq!(g.tag, "v2.1");
                assert_eq!(g.commit.as_deref(), Some(COMMIT));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(d.output_name(), "cvmfs-config-osg-2.1.tar.gz");
    }

    #[test]
    fn test_github_shorthand() {
        let d = one("type=github repo=opensciencegrid/cvmfs-config-osg tag=v2.1-2 tarball=tarfile.tar.gz");
        assert_eq!(d.url(), "https://github.com/opensciencegrid/cvmfs-config-osg.git");
        assert_eq!(d.name, "cvmfs-config-osg");
        assert_eq!(d.output_name(), "tarfile.tar.gz");
    }

    #[test]
    fn test_git_name_required_when_not_derivable() {
        assert!(reason("type=git url=https://example.org/foo tag=v1").contains("add name="));
        let d = one("type=git url=https://example.org/foo tag=v1 name=foo");
        assert_eq!(d.name, "foo");
    }

    #[test]
    fn test_git_requires_tag() {
        assert!(reason("type=git url=https://example.org/foo.git").contains("requires 'tag'"));
    }

    #[test]
    fn test_git_bad_commit_id() {
        assert!(reason("type=git url=https://example.org/foo.git tag=v1 hash=abc").contains("commit id"));
    }

    #[test]
    fn test_git_rejects_positional() {
        assert!(reason("type=git foo.tar.gz url=https://example.org/foo.git tag=v1").contains("use key=value"));
    }

    #[test]
    fn test_github_repo_shape() {
        assert!(reason("type=github repo=justaname tag=v1").contains("OWNER/NAME"));
        assert!(reason("type=github repo=a/b/c tag=v1").contains("OWNER/NAME"));
    }

    // ==================== Svn directives ====================

    #[test]
    fn test_svn_directive() {
        let d = one("type=svn url=https://svn.example.org/native/redhat/trunk/foo/ revision=r1234 subdir=osg spec=1");
        assert_eq!(d.source_type(), SourceType::Svn);
        assert_eq!(d.name, "foo");
        assert!(d.want_spec);
        match &d.kind {
            DirectiveKind::Svn(s) => {
                assert_eq!(s.revision, 1234);
                assert_eq!(s.subdir.as_deref(), Some("osg"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_svn_revision_must_be_numeric() {
        assert!(reason("type=svn url=https://svn.example.org/foo revision=HEAD").contains("revision number"));
        assert!(reason("type=svn url=https://svn.example.org/foo").contains("requires 'revision'"));
    }

    #[test]
    fn test_svn_rejects_tag() {
        assert!(reason("type=svn url=https://svn.example.org/foo revision=3 tag=v1").contains("not valid for type=svn"));
    }

    // ==================== Syntax errors ====================

    #[test]
    fn test_unknown_key_rejected() {
        assert!(reason(&format!("foo.tar.gz sha1sun={}", SHA1)).contains("unknown key 'sha1sun'"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(reason("type=cvs url=x").contains("unknown type"));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        assert!(reason(&format!("foo.tar.gz sha1sum={} sha1sum={}", SHA1, SHA1)).contains("duplicate"));
    }

    #[test]
    fn test_empty_value_rejected() {
        assert!(reason("foo.tar.gz sha1sum=").contains("empty value"));
    }

    #[test]
    fn test_bad_digest_rejected() {
        assert!(reason("foo.tar.gz sha1sum=1234").contains("not a valid sha1 digest"));
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        assert!(reason("\"foo.tar.gz").contains("unbalanced"));
    }

    #[test]
    fn test_bad_flag_rejected() {
        assert!(reason("type=git url=https://e.org/foo.git tag=v1 spec=maybe").contains("boolean"));
    }

    #[test]
    fn test_missing_type_rejected() {
        assert!(reason("tag=v1").contains("missing 'type'"));
    }

    // ==================== Whole files ====================

    #[test]
    fn test_parse_preserves_order_and_lines() {
        let text = format!(
            "# upstream sources\n\nb/b.tar.gz sha1sum={sha}\n   # indented comment\na/a.tar.gz sha1sum={sha}\ntype=git url=https://e.org/c.git tag=v1\n",
            sha = SHA1
        );
        let directives = parse_source(&text, origin()).unwrap();
        let names: Vec<&str> = directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b.tar.gz", "a.tar.gz", "c"]);
        let lines: Vec<usize> = directives.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![3, 5, 6]);
    }

    #[test]
    fn test_empty_file_is_no_directives() {
        for text in ["", "\n\n", "# only a comment\n"] {
            let result = parse_source(text, origin());
            assert!(matches!(result, Err(FetchError::NoDirectives { .. })));
        }
    }

    #[test]
    fn test_error_reports_line_number() {
        let text = format!("a.tar.gz sha1sum={}\nb.tar.gz bogus=1\n", SHA1);
        match parse_source(&text, origin()) {
            Err(FetchError::MalformedDirective { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedDirective, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
