//! fetch-sources - fetch upstream sources described by `.source` files
//!
//! Usage:
//!   fetch-sources [OPTIONS] <SOURCE>...
//!
//! Each SOURCE is a `.source` file or a package directory containing
//! `upstream/*.source`. Output paths are printed to stdout, one per line,
//! in directive order. Everything else goes to stderr.
//!
//! Exit codes: 0 success, 1 fetch failure, 2 usage error, 3 interrupted,
//! 4 internal error.

use anyhow::{Context, Result};
use clap::Parser;
use source_fetch::core::interrupt;
use source_fetch::output::print_error_block;
use source_fetch::{Config, FetchError, FetchOptions, LogLevel, Reporter, process_all};
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 3;
const EXIT_INTERNAL: u8 = 4;

#[derive(Parser)]
#[command(name = "fetch-sources")]
#[command(about = "Fetch and verify upstream sources listed in .source files")]
#[command(version)]
struct Cli {
    /// `.source` files or package directories
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<PathBuf>,

    /// Directory to write outputs into
    #[arg(short = 'o', long, default_value = ".")]
    destdir: PathBuf,

    /// Skip checksum verification (unsafe)
    #[arg(long)]
    nocheck: bool,

    /// Also extract the RPM spec file from git and svn trees
    #[arg(long)]
    want_spec: bool,

    /// Cache prefix to search, in order (repeatable; AFS, VDT, AUTO, a path or a URL)
    #[arg(short = 'c', long = "cache-prefix", value_name = "PREFIX")]
    cache_prefixes: Vec<String>,

    /// Configuration file
    #[arg(short = 'C', long = "config-file", value_name = "FILE", env = "SOURCE_FETCH_CONFIG")]
    config_file: Option<PathBuf>,

    /// Log level: debug, info, warning, error or critical
    #[arg(long, value_name = "LEVEL")]
    loglevel: Option<LogLevel>,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// `--loglevel` wins over `-v`, which wins over `-q`.
    fn log_level(&self) -> LogLevel {
        match (self.loglevel, self.verbose, self.quiet) {
            (Some(level), _, _) => level,
            (None, true, _) => LogLevel::Debug,
            (None, false, true) => LogLevel::Warning,
            (None, false, false) => LogLevel::Info,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let reporter = Reporter::new(cli.log_level());

    if let Err(e) = interrupt::install() {
        reporter.warning(&format!("cannot install SIGINT handler: {}", e));
    }

    match std::panic::catch_unwind(AssertUnwindSafe(|| run(&cli, reporter))) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => report(&err),
        Err(_) => {
            print_error_block(
                "InternalError",
                "fetch-sources panicked; this is a bug, please report it",
            );
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}

fn run(cli: &Cli, reporter: Reporter) -> Result<()> {
    let config = Config::load(cli.config_file.as_deref())?;
    let options = FetchOptions {
        strict: !cli.nocheck,
        want_spec: cli.want_spec,
        reporter,
        ..FetchOptions::from_config(&config, &cli.cache_prefixes)
    };

    if !options.strict {
        reporter.warning("--nocheck given: downloaded sources will NOT be verified");
    }
    for prefix in &options.cache_chain {
        reporter.debug(&format!("cache prefix: {}", prefix));
    }

    let paths = process_all(&cli.sources, &cli.destdir, &options)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for path in &paths {
        writeln!(out, "{}", path.display()).context("cannot write to stdout")?;
    }
    out.flush().context("cannot write to stdout")?;

    reporter.success(&format!("fetched {} file(s)", paths.len()));
    Ok(())
}

/// Print the diagnostic block for `err` and pick the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<FetchError>() {
        Some(fetch) if fetch.is_interrupted() => {
            print_error_block("Interrupted", "interrupted by user; no partial outputs were kept");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Some(fetch) => {
            print_error_block(fetch.kind(), &format!("{:#}", err));
            ExitCode::from(EXIT_FAILURE)
        }
        None => {
            print_error_block("InternalError", &format!("{:#}", err));
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}
