//! source-hash - print digest tokens for `.source` files
//!
//! Usage:
//!   source-hash [-a ALG,...] <FILE>...
//!
//! For each file prints a line such as
//! `foo-1.0.tar.gz md5sum=... sha1sum=... sha256sum=...`, ready to paste
//! into a `.source` file (replace the path with the cache-relative one).

use anyhow::{Context, Result};
use clap::Parser;
use source_fetch::HashAlgorithm;
use source_fetch::helpers::internal::hash;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "source-hash")]
#[command(about = "Print md5sum=/sha1sum=/sha256sum= tokens for files")]
#[command(version)]
struct Cli {
    /// Files to hash
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Algorithms to print, comma separated
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "md5,sha1,sha256",
        value_name = "ALG"
    )]
    algorithms: Vec<HashAlgorithm>,

    /// Print every supported algorithm
    #[arg(long, conflicts_with = "algorithms")]
    all: bool,
}

/// One output line: the path followed by `<alg>sum=<hex>` tokens.
fn digest_line(path: &Path, algorithms: &[HashAlgorithm]) -> Result<String> {
    let digests = hash::hash_file(path, algorithms)
        .with_context(|| format!("cannot hash {}", path.display()))?;

    let mut line = path.display().to_string();
    for algorithm in algorithms {
        if let Some(digest) = digests.get(algorithm) {
            line.push_str(&format!(" {}={}", algorithm.directive_key(), digest));
        }
    }
    Ok(line)
}

impl Cli {
    /// Requested algorithms, first mention wins.
    fn selected(&self) -> Vec<HashAlgorithm> {
        if self.all {
            return HashAlgorithm::ALL.to_vec();
        }
        let mut seen = BTreeSet::new();
        self.algorithms
            .iter()
            .copied()
            .filter(|algorithm| seen.insert(*algorithm))
            .collect()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let algorithms = cli.selected();

    for file in &cli.files {
        println!("{}", digest_line(file, &algorithms)?);
    }
    Ok(())
}
