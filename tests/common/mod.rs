//! Common test utilities: cache fixtures, `.source` files, local VCS repos.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// A scratch workspace with a local cache prefix and an output directory.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("cache")).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn cache(&self) -> PathBuf {
        self.path().join("cache")
    }

    pub fn destdir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Put `content` into the cache at `relpath`.
    pub fn cache_file(&self, relpath: &str, content: &[u8]) -> PathBuf {
        let path = self.cache().join(relpath);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a `.source` file and return its path.
    pub fn source_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Sorted file names in the output directory, ignoring nothing.
    pub fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.destdir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

/// True if `program` can be executed.
pub fn have(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.org"])
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A local git repository `<name>.git` with `files` committed and tagged
/// `tag`, so directives can derive `name` from the URL.
///
/// Returns the `file://` URL and the tagged commit id.
pub fn git_repo(parent: &Path, name: &str, files: &[(&str, &str)], tag: &str) -> (String, String) {
    let repo = parent.join(format!("{}.git", name));
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "--quiet"]);
    for (path, content) in files {
        let file = repo.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
    }
    git(&repo, &["add", "--all"]);
    git(&repo, &["commit", "--quiet", "-m", "initial import"]);
    git(&repo, &["tag", tag]);
    let commit = git(&repo, &["rev-parse", "HEAD"]);
    (format!("file://{}", repo.display()), commit)
}

/// A local svn repository with `files` committed as revision 1.
///
/// Returns the `file://` URL of the repository root.
pub fn svn_repo(parent: &Path, name: &str, files: &[(&str, &str)]) -> String {
    let repo = parent.join(format!("{}-repo", name));
    let status = Command::new("svnadmin")
        .arg("create")
        .arg(&repo)
        .status()
        .expect("failed to run svnadmin");
    assert!(status.success());

    let import = parent.join(format!("{}-import", name));
    for (path, content) in files {
        let file = import.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
    }

    let url = format!("file://{}", repo.display());
    let status = Command::new("svn")
        .args(["import", "--quiet", "--non-interactive", "-m", "initial import"])
        .arg(&import)
        .arg(&url)
        .status()
        .expect("failed to run svn");
    assert!(status.success());
    url
}

/// An HTTP server that answers one request with `len` bytes, sent one at a
/// time `delay` apart. Returns its base URL.
pub fn trickle_server(len: usize, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            len
        );
        if stream.write_all(head.as_bytes()).is_err() {
            return;
        }
        for _ in 0..len {
            std::thread::sleep(delay);
            if stream.write_all(b"x").and_then(|_| stream.flush()).is_err() {
                return;
            }
        }
    });
    format!("http://{}", addr)
}
