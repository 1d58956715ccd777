//! Digest computation
//!
//! Supports the algorithms `.source` files can declare: MD5, SHA1, SHA256,
//! SHA512 and BLAKE3. All requested digests are computed in one read pass.

use sha2::Digest;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::Blake3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Length of the hex digest
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }

    /// The `.source` key that declares this digest, e.g. `sha1sum`.
    pub fn directive_key(&self) -> String {
        format!("{}sum", self.name())
    }

    /// Inverse of [`directive_key`](Self::directive_key).
    pub fn from_directive_key(key: &str) -> Option<Self> {
        let name = key.strip_suffix("sum")?;
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// True if `digest` looks like a digest of this algorithm.
    pub fn is_valid_digest(&self, digest: &str) -> bool {
        digest.len() == self.hex_len() && digest.chars().all(|c| c.is_ascii_hexdigit())
    }

    fn hasher(&self) -> Hasher {
        match self {
            Self::Md5 => Hasher::Md5(md5::Md5::new()),
            Self::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            Self::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            Self::Sha512 => Hasher::Sha512(sha2::Sha512::new()),
            Self::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    /// Accepts `sha1` as well as the directive form `sha1sum`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_suffix("sum").unwrap_or(&lower);
        Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| {
                format!(
                    "unknown hash algorithm '{}': expected one of md5, sha1, sha256, sha512, blake3",
                    s
                )
            })
    }
}

enum Hasher {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Compute the requested digests over everything `reader` yields.
pub fn hash_reader(
    reader: &mut impl Read,
    algorithms: &[HashAlgorithm],
) -> std::io::Result<BTreeMap<HashAlgorithm, String>> {
    let mut hashers: Vec<(HashAlgorithm, Hasher)> =
        algorithms.iter().map(|a| (*a, a.hasher())).collect();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        for (_, hasher) in hashers.iter_mut() {
            hasher.update(&buffer[..n]);
        }
    }

    Ok(hashers
        .into_iter()
        .map(|(a, h)| (a, h.finalize_hex()))
        .collect())
}

/// Compute the requested digests of a file.
pub fn hash_file(
    file: &Path,
    algorithms: &[HashAlgorithm],
) -> std::io::Result<BTreeMap<HashAlgorithm, String>> {
    let mut f = std::fs::File::open(file)?;
    hash_reader(&mut f, algorithms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const HELLO_BLAKE3: &str = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24";

    #[test]
    fn test_hash_file_selected_algorithms() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        let hashes = hash_file(&file_path, &[HashAlgorithm::Sha1, HashAlgorithm::Md5]).unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[&HashAlgorithm::Md5], HELLO_MD5);
        assert_eq!(hashes[&HashAlgorithm::Sha1], HELLO_SHA1);
    }

    #[test]
    fn test_all_algorithms_in_one_pass() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        let hashes = hash_file(&file_path, &HashAlgorithm::ALL).unwrap();
        assert_eq!(hashes.len(), HashAlgorithm::ALL.len());
        assert_eq!(hashes[&HashAlgorithm::Sha256], HELLO_SHA256);
        assert_eq!(hashes[&HashAlgorithm::Blake3], HELLO_BLAKE3);
        assert_eq!(hashes[&HashAlgorithm::Sha512].len(), 128);
    }

    #[test]
    fn test_directive_keys() {
        assert_eq!(HashAlgorithm::Sha1.directive_key(), "sha1sum");
        assert_eq!(
            HashAlgorithm::from_directive_key("sha256sum"),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(HashAlgorithm::from_directive_key("md5sum"), Some(HashAlgorithm::Md5));
        assert_eq!(HashAlgorithm::from_directive_key("sha3sum"), None);
        assert_eq!(HashAlgorithm::from_directive_key("sha1"), None);
    }

    #[test]
    fn test_digest_shape_validation() {
        assert!(HashAlgorithm::Sha1.is_valid_digest(HELLO_SHA1));
        assert!(HashAlgorithm::Sha1.is_valid_digest(&HELLO_SHA1.to_uppercase()));
        assert!(!HashAlgorithm::Sha1.is_valid_digest(HELLO_MD5));
        assert!(!HashAlgorithm::Md5.is_valid_digest("zz63bbbe01eeed093cb22bb8f5acdc3z"));
    }

    #[test]
    fn test_empty_input() {
        let hashes = hash_reader(&mut std::io::empty(), &[HashAlgorithm::Sha1]).unwrap();
        assert_eq!(
            hashes[&HashAlgorithm::Sha1],
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("MD5SUM".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}
