//! External VCS command execution
//!
//! git and svn run as child processes with no stdin, a C locale and
//! prompting disabled. A non-zero exit becomes [`FetchError::Vcs`] carrying
//! the tool's stderr, unless SIGINT arrived meanwhile, in which case the
//! failure is reported as [`FetchError::Interrupted`].

use crate::core::error::{FetchError, Result};
use crate::core::interrupt;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ChildStdout, Command, Stdio};

/// Builder for one VCS invocation.
///
/// # Example
/// ```ignore
/// let commit = VcsCmd::new("git")
///     .dir(&checkout)
///     .args(["rev-parse", "--verify", "HEAD^{commit}"])
///     .output("foo")?;
/// ```
#[derive(Debug, Clone)]
pub struct VcsCmd {
    program: &'static str,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl VcsCmd {
    pub fn new(program: &'static str) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the working directory for the command.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0");
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run to completion and return trimmed stdout.
    ///
    /// `name` is the directive name used in error messages.
    pub fn output(&self, name: &str) -> Result<String> {
        let output = self
            .build_command()
            .output()
            .map_err(|e| self.spawn_error(name, e))?;

        if !output.status.success() {
            return Err(self.failure(name, &String::from_utf8_lossy(&output.stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run and discard stdout.
    pub fn run(&self, name: &str) -> Result<()> {
        self.output(name).map(|_| ())
    }

    /// Run while `consume` reads the child's stdout as a stream.
    ///
    /// The child is killed if `consume` fails.
    pub fn stream_stdout<F>(&self, name: &str, consume: F) -> Result<()>
    where
        F: FnOnce(&mut ChildStdout) -> Result<()>,
    {
        let mut child = self
            .build_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(name, e))?;

        let consumed = match child.stdout.as_mut() {
            Some(stdout) => consume(stdout),
            None => Err(FetchError::Vcs {
                name: name.to_string(),
                reason: format!("{} produced no output stream", self.program),
            }),
        };

        if let Err(e) = consumed {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = child
            .wait()
            .map_err(|e| FetchError::io(format!("cannot wait for {}", self.program), e))?;
        if !status.success() {
            return Err(self.failure(name, &stderr));
        }
        Ok(())
    }

    /// Command line for messages, e.g. `git clone --branch v1.0 ...`.
    pub fn display_cmd(&self) -> String {
        let mut line = self.program.to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn spawn_error(&self, name: &str, err: std::io::Error) -> FetchError {
        FetchError::Vcs {
            name: name.to_string(),
            reason: format!("failed to run {}: {}", self.program, err),
        }
    }

    fn failure(&self, name: &str, stderr: &str) -> FetchError {
        if interrupt::is_interrupted() {
            return FetchError::Interrupted;
        }
        let stderr = stderr.trim();
        FetchError::Vcs {
            name: name.to_string(),
            reason: if stderr.is_empty() {
                format!("'{}' failed", self.display_cmd())
            } else {
                format!("'{}' failed\n{}", self.display_cmd(), stderr)
            },
        }
    }
}
