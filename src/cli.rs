//! Command-line interface definitions for dupelink.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates of at least 1 MiB
//! dupelink --dump --min-size 1MiB /srv/media
//!
//! # Replace duplicates by hard links, skipping VCS metadata
//! dupelink -H -i .git -i .svn /srv/media
//!
//! # Machine-readable dump
//! dupelink -d -o json /srv/media
//! ```

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

/// Find duplicate files and replace them by hard links.
///
/// Files are grouped by size, fingerprinted with a fast checksum and then
/// compared byte for byte. Nothing is modified unless --hard-link is given.
#[derive(Debug, Parser)]
#[command(name = "dupelink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Minimum file size to consider (e.g., 100KB, 1MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Replace duplicates by hard links to one representative
    #[arg(short = 'H', long)]
    pub hard_link: bool,

    /// Print every duplicate group
    #[arg(short, long)]
    pub dump: bool,

    /// Format of the duplicate dump
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Directory name patterns to skip (can be specified multiple times)
    #[arg(short, long = "ignore-dirs", value_name = "PATTERN")]
    pub ignore_dirs: Vec<String>,

    /// Send two-file size classes through checksum and partition like
    /// larger ones, instead of comparing them directly
    #[arg(short, long)]
    pub approximate: bool,

    /// Permission bits to clear on linked files, in octal (0 disables)
    #[arg(short, long, value_name = "OCTAL", value_parser = parse_octal)]
    pub chmod_clear: Option<u32>,

    /// Checksum rounds before full comparison (0 skips checksums)
    #[arg(long, value_name = "N")]
    pub checksum_rounds: Option<u32>,

    /// Number of threads used for checksumming
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Hide warnings
    #[arg(short = 'W', long)]
    pub no_warnings: bool,

    /// Hide informational messages
    #[arg(short = 'I', long = "no-information")]
    pub no_info: bool,

    /// Disable progress bars
    #[arg(short = 'P', long)]
    pub no_progress: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format of the duplicate dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One shell-quoted line per group
    Text,
    /// JSON document for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// The configuration layer contributed by command-line flags.
///
/// Only flags that were actually given are serialized, so lower layers keep
/// their values otherwise.
#[derive(Debug, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chmod_clear: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignore_dirs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    io_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<bool>,
}

impl Cli {
    /// Collect the flags that override configuration values.
    #[must_use]
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_size: self.min_size,
            checksum_rounds: self.checksum_rounds,
            exact: self.approximate.then_some(false),
            chmod_clear: self.chmod_clear,
            ignore_dirs: (!self.ignore_dirs.is_empty()).then(|| self.ignore_dirs.clone()),
            io_threads: self.io_threads,
            progress: (self.no_progress || self.quiet).then_some(false),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupelink::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("100KB").unwrap(), 100_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// Parse an octal permission mask such as `222`, `0222` or `0o222`.
///
/// ```
/// use dupelink::cli::parse_octal;
///
/// assert_eq!(parse_octal("0o222").unwrap(), 0o222);
/// assert_eq!(parse_octal("022").unwrap(), 0o022);
/// assert_eq!(parse_octal("0").unwrap(), 0);
/// ```
/// # Errors
///
/// Returns an error for non-octal input or bits beyond `0o7777`.
pub fn parse_octal(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let bits = u32::from_str_radix(digits, 8).map_err(|_| format!("Invalid octal mode: '{s}'"))?;
    if bits > 0o7777 {
        return Err(format!("Mode {s} has bits outside 0o7777"));
    }
    Ok(bits)
}
