//! dupelink - find duplicate files and replace them by hard links
//!
//! The pipeline has three stages:
//!
//! 1. [`scanner`] walks a tree once, recording every name and grouping
//!    regular files by (size, device)
//! 2. [`duplicates`] splits each size class into classes of byte-identical
//!    files, using a fast checksum before full comparison
//! 3. [`actions`] replaces every duplicate by a hard link to one
//!    representative, through a quarantine that can be rolled back
//!
//! Identity is based on `(st_dev, st_ino)`, so only Unix is supported.

#[cfg(not(unix))]
compile_error!("dupelink relies on Unix inode identity and hard links");

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use bytesize::ByteSize;

use crate::actions::{RelinkReport, Relinker};
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{ResolveConfig, Resolver};
use crate::error::ExitCode;
use crate::logging::{init_logging, LogSettings};
use crate::output::{escape_posix, JsonOutput, TextOutput};
use crate::progress::{NoProgress, Progress, ProgressSink};
use crate::scanner::{AcceptAll, DirectoryFilter, GlobFilter, Traverser};

/// Run the application with parsed arguments.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the root cannot be
/// enumerated, or the dump cannot be written. Recoverable per-file errors
/// only affect the returned exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(LogSettings {
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_info: cli.no_info,
        no_warnings: cli.no_warnings,
    });

    let config = Config::load(cli.config.as_deref(), cli.config_overrides())
        .context("Failed to load configuration")?;
    if log::log_enabled!(log::Level::Debug) {
        match config.to_toml() {
            Ok(text) => log::debug!("Effective configuration:\n{}", text.trim_end()),
            Err(_) => log::debug!("Effective configuration: {:?}", config),
        }
    }

    let progress: Arc<dyn ProgressSink> = if config.progress {
        Arc::new(Progress::new(false))
    } else {
        Arc::new(NoProgress)
    };

    let glob;
    let filter: &dyn DirectoryFilter = if config.ignore_dirs.is_empty() {
        &AcceptAll
    } else {
        glob = GlobFilter::new(&config.ignore_dirs).context("Invalid --ignore-dirs pattern")?;
        &glob
    };

    log::info!(
        "Collecting '{}' (minimum size {})",
        cli.path.display(),
        config.min_size
    );
    let index = Traverser::new(&cli.path, config.min_size)
        .with_filter(filter)
        .with_progress(Arc::clone(&progress))
        .run()
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;
    let stats = index.stats;
    log::info!(
        "Files: {}, eligibles: {}, hard links: {}",
        stats.regular_files,
        stats.eligible_files,
        stats.known_links
    );

    log::info!("Checking");
    let resolve_config = ResolveConfig::default()
        .with_checksum_rounds(config.checksum_rounds)
        .with_exact(config.exact)
        .with_io_threads(config.io_threads)
        .with_progress(Arc::clone(&progress));
    let resolution = Resolver::new(&index, resolve_config).run();
    let registry = &resolution.registry;
    log::info!("Duplicate file count: {}", registry.duplicate_count());
    for notice in registry.collisions() {
        let paths: Vec<String> = notice
            .members
            .iter()
            .map(|&m| escape_posix(&index.path(m)))
            .collect();
        log::warn!(
            "Unresolved collision: {} files of {} bytes left unverified: {}",
            notice.members.len(),
            notice.class.size,
            paths.join(" ")
        );
    }
    log::info!("Ignored dirs: {}", stats.ignored_dirs);

    let mut had_errors = stats.errors > 0 || resolution.stats.failed_files > 0;
    let duplicates_found = !registry.is_empty();

    log::info!(
        "Bytes saveable: {} ({})",
        registry.reclaimable_bytes(),
        ByteSize(registry.reclaimable_bytes())
    );

    let report: Option<RelinkReport> = if cli.hard_link {
        let report = Relinker::new(&index)
            .with_clear_bits(config.chmod_clear)
            .with_progress(Arc::clone(&progress))
            .run(registry);
        log::info!(
            "Linked {} files, reclaimed {}",
            report.linked_files(),
            ByteSize(report.bytes_reclaimed())
        );
        had_errors |= !report.is_complete();
        Some(report)
    } else {
        None
    };

    let exit_code = ExitCode::for_outcome(duplicates_found, had_errors);

    if cli.dump {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        match cli.output {
            OutputFormat::Text => TextOutput::new(&index, registry)
                .write_to(&mut out)
                .context("Failed to write duplicate dump")?,
            OutputFormat::Json => JsonOutput::new(
                &cli.path,
                &index,
                registry,
                resolution.stats,
                report.as_ref(),
                exit_code,
            )
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        }
        out.flush().context("Failed to flush output")?;
    }

    Ok(exit_code)
}
