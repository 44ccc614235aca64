use clap::{Args as ClapArgs, Parser, Subcommand};
use loader::Severity;
use regex::Regex;
use std::path::PathBuf;

use crate::output::Format;
use crate::DEFAULT_MAX_FILE_SIZE;

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse()
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let v: usize = s
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    if v == 0 {
        Err("threads must be greater than 0".into())
    } else {
        Ok(v)
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "🌿 Thistle - rule-based static analysis for JavaScript, Kotlin and Swift",
    long_about = "Thistle scans JavaScript, Kotlin and Swift sources for security
vulnerabilities: hard-coded secrets, injection sinks reached by untrusted
input, weak cryptography, unsafe null handling, swallowed errors, global
mutable state and concurrency hazards.

Rules are declarative YAML/JSON data; taint rules support sources,
sanitizers (full or partial) and sinks.

Examples:
  thistle scan src/                      # scan with the default rule pack
  thistle scan src/ --format sarif       # SARIF for CI upload
  thistle scan src/ --fail-on warning    # stricter exit status
  thistle rules verify ./rules           # validate a rule directory",
    subcommand_required = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan sources for rule violations
    Scan(ScanArgs),
    /// Inspect and validate rule sets
    #[command(subcommand, alias = "rule")]
    Rules(RulesCmd),
}

#[derive(ClapArgs)]
pub struct ScanArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,
    /// Path to a rule file or directory
    #[arg(long, default_value = "rules")]
    pub rules: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Exit non-zero when findings at or above this severity exist
    #[arg(long = "fail-on", value_parser = parse_severity, default_value = "critical")]
    pub fail_on: Severity,
    /// Number of parallel workers
    #[arg(long, default_value_t = default_threads(), value_parser = parse_threads)]
    pub threads: usize,
    /// Exclude files matching these glob patterns
    #[arg(long, value_parser = crate::parse_exclude, value_delimiter = ',')]
    pub exclude: Vec<Regex>,
    /// Don't apply the default exclusion patterns
    #[arg(long)]
    pub no_default_exclude: bool,
    /// Maximum file size to scan (bytes)
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,
    /// Maximum tree traversal depth before a file is failed
    #[arg(long, default_value_t = engine::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
    /// Re-run loop bodies until the taint state stabilizes
    #[arg(long = "loop-fixpoint")]
    pub loop_fixpoint: bool,
    /// Comment marker suppressing findings on its line
    #[arg(long = "suppress-comment", default_value = "thistle-ignore")]
    pub suppress_comment: String,
    /// Suppress the banner and summary
    #[arg(long)]
    pub quiet: bool,
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum RulesCmd {
    /// Check that every rule in a file or directory loads cleanly
    Verify {
        /// Path to the rules directory or file
        path: PathBuf,
    },
    /// List the rules in a file or directory
    List {
        /// Path to the rules directory or file
        path: PathBuf,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    #[test]
    fn parse_severity_rejects_invalid_input() {
        assert!(super::parse_severity("bogus").is_err());
        assert_eq!(
            super::parse_severity("warning").unwrap(),
            loader::Severity::Warning
        );
    }

    #[test]
    fn zero_threads_are_rejected() {
        assert!(super::parse_threads("0").is_err());
        assert_eq!(super::parse_threads("4").unwrap(), 4);
    }
}
