//! Test fixtures - sample payloads, digests and `.source` files.

#![allow(dead_code)]

/// Payload of the "hello" cache artifact.
pub const HELLO: &[u8] = b"hello world";
pub const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
pub const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
pub const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

/// Payload of the "foo" cache artifact.
pub const FOO: &[u8] = b"foo";
pub const FOO_SHA1: &str = "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";

/// Cache-relative paths used by the fixtures.
pub const HELLO_PATH: &str = "hello/1.0/hello-1.0.tar.gz";
pub const FOO_PATH: &str = "foo/0.1/foo-0.1.tar.gz";

/// Two verified legacy entries, hello first.
pub fn two_file_source() -> String {
    format!(
        "# upstream sources\n{} sha1sum={}\n\n{} sha1sum={}\n",
        HELLO_PATH, HELLO_SHA1, FOO_PATH, FOO_SHA1
    )
}

/// A spec file body for VCS fixtures.
pub const SPEC: &str = "Name: cvmfs-config-osg\nVersion: 2.1\nRelease: 1\n";
