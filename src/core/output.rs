//! Colored diagnostics and progress reporting
//!
//! Uses owo-colors for terminal colors and indicatif for spinners. Everything
//! here writes to stderr: stdout is reserved for the list of output paths.
//!
//! There is no global logger. A [`Reporter`] carries the verbosity and is
//! passed to whatever needs to talk to the user.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;
use std::time::Duration;

/// Standard spinner characters
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Width of the border around fatal diagnostics
const BLOCK_WIDTH: usize = 78;

/// Message severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(format!(
                "invalid log level '{}': expected one of debug, info, warning, error, critical",
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Verbosity-aware message sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    level: LogLevel,
}

impl Reporter {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// A reporter that only lets critical messages through. Handy in tests.
    pub fn quiet() -> Self {
        Self::new(LogLevel::Critical)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Print an action header
    /// Example: "==> Processing upstream/foo.source"
    pub fn action(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            eprintln!("{} {}", "==>".blue().bold(), message.bold());
        }
    }

    /// Print a directive counter
    /// Example: "(1/3) foo-1.0.tar.gz"
    pub fn action_numbered(&self, current: usize, total: usize, message: &str) {
        if self.enabled(LogLevel::Info) {
            eprintln!(
                "{} {}",
                format!("({}/{})", current, total).cyan(),
                message.bold()
            );
        }
    }

    /// Print a detail line
    /// Example: "     retrieving https://..."
    pub fn detail(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            eprintln!("     {}", message.dimmed());
        }
    }

    /// Print a debug line, only shown with --verbose
    pub fn debug(&self, message: &str) {
        if self.enabled(LogLevel::Debug) {
            eprintln!("     {} {}", "debug:".dimmed(), message.dimmed());
        }
    }

    pub fn success(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            eprintln!("{} {}", "==>".green().bold(), message.green());
        }
    }

    pub fn warning(&self, message: &str) {
        if self.enabled(LogLevel::Warning) {
            eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
        }
    }

    /// Spinner for a long-running step. Hidden when stderr is not a terminal
    /// or the reporter is quieter than info.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled(LogLevel::Info) || !std::io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("     {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(SPINNER_CHARS),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

/// Switch a spinner to a byte counter once the download size is known.
pub fn upgrade_to_bytes(pb: &ProgressBar, total_bytes: u64) {
    if pb.is_hidden() {
        return;
    }
    pb.set_length(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("     {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸━"),
    );
}

/// Clears a progress bar when dropped, so early returns leave no stale line.
pub struct ProgressGuard(pub ProgressBar);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Render a fatal diagnostic as a bordered block.
pub fn error_block(title: &str, message: &str) -> String {
    let rule = "*".repeat(BLOCK_WIDTH);
    let mut block = String::new();
    block.push_str(&rule);
    block.push('\n');
    block.push_str(&format!("* {}\n", title));
    block.push_str(&rule);
    block.push('\n');
    for line in message.lines() {
        block.push_str(&format!("* {}\n", line));
    }
    block.push_str(&rule);
    block
}

/// Print a fatal diagnostic block to stderr (never filtered by verbosity).
pub fn print_error_block(title: &str, message: &str) {
    eprintln!("{}", error_block(title, message).red());
}
