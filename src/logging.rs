//! Logging infrastructure for dupelink.
//!
//! This module provides structured logging using the `log` facade and `env_logger` backend.
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only), `--verbose` (debug/trace) or
//!    `--no-information` (warnings and errors)
//! 3. Default: info level
//!
//! `--no-warnings` hides warn-level records regardless of the level.
//!
//! # Build-specific Formatting
//!
//! - **Debug builds**: Include timestamp, level, and module path for detailed debugging
//! - **Release builds**: Compact format with level and message only for cleaner output
//!
//! # Example
//!
//! ```rust,no_run
//! use dupelink::logging::{init_logging, LogSettings};
//!
//! // Default (info) level
//! init_logging(LogSettings::default());
//!
//! // Trace mode (-vv) without warnings
//! init_logging(LogSettings {
//!     verbose: 2,
//!     no_warnings: true,
//!     ..LogSettings::default()
//! });
//! ```

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::env;
use std::io::Write;

/// Flags that shape logging output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Verbosity count (0=info, 1=debug, 2+=trace)
    pub verbose: u8,
    /// Errors only
    pub quiet: bool,
    /// Hide informational messages
    pub no_info: bool,
    /// Hide warnings
    pub no_warnings: bool,
}

/// Initialize the logging subsystem based on CLI flags.
///
/// Call once at the start of the application. Later calls are ignored, so
/// tests may call it freely.
///
/// # Example
///
/// ```rust,no_run
/// use dupelink::logging::{init_logging, LogSettings};
///
/// init_logging(LogSettings { verbose: 1, ..LogSettings::default() });
///
/// log::info!("collecting /data");
/// log::debug!("Checksum 0x0000000000000000");
/// ```
pub fn init_logging(settings: LogSettings) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(settings));
    }

    configure_format(&mut builder, settings);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!("Logging initialized at level: {:?}", determine_level(settings));
    }
}

/// Determine the log level from CLI flags.
///
/// `quiet` wins over everything, then verbosity, then `no_info`.
fn determine_level(settings: LogSettings) -> LevelFilter {
    if settings.quiet {
        return LevelFilter::Error;
    }
    match settings.verbose {
        0 if settings.no_info => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Whether a record at `level` should be written.
fn passes(level: Level, settings: LogSettings) -> bool {
    !(settings.no_warnings && level == Level::Warn)
}

/// Configure the log format based on build type and verbosity.
fn configure_format(builder: &mut Builder, settings: LogSettings) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let level = record.level();
            if !passes(level, settings) {
                return Ok(());
            }
            let timestamp = buf.timestamp_seconds();
            let level_style = buf.default_level_style(level);

            if settings.verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        builder.format(move |buf, record| {
            let level = record.level();
            if !passes(level, settings) {
                return Ok(());
            }
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Get the current log level as a string.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
