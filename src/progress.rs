//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports byte throughput to a [`ProgressSink`]: file sizes
//! while walking, bytes read while checksumming and comparing, and bytes
//! reclaimed while relinking. Sinks are purely observational and never
//! influence control flow.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Phase name of the directory traversal.
pub const PHASE_WALKING: &str = "walking";
/// Phase name of duplicate resolution (checksum and compare reads).
pub const PHASE_RESOLVING: &str = "resolving";
/// Phase name of hard-link replacement.
pub const PHASE_RELINKING: &str = "relinking";

/// Receiver of progress updates from the pipeline phases.
pub trait ProgressSink: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (one of the `PHASE_*` constants)
    /// * `total` - Expected total bytes, `0` if unknown
    fn on_phase_start(&self, phase: &str, total: u64);

    /// Called as bytes are processed in the current phase.
    fn tick(&self, bytes: u64);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Sink discarding every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_phase_start(&self, _phase: &str, _total: u64) {}
    fn tick(&self, _bytes: u64) {}
    fn on_phase_end(&self, _phase: &str) {}
}

/// Progress reporter drawing one indicatif bar per phase on stderr.
pub struct Progress {
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupelink::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            active: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {bytes} seen")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bytes_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg} {bytes_per_sec} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressSink for Progress {
    fn on_phase_start(&self, phase: &str, total: u64) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            PHASE_WALKING => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::walking_style());
                pb.set_message("Walking directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            PHASE_RESOLVING => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::bytes_style());
                pb.set_message("Comparing");
                pb
            }
            PHASE_RELINKING => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::bytes_style());
                pb.set_message("Linking");
                pb
            }
            other => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::bytes_style());
                pb.set_message(other.to_string());
                pb
            }
        };

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn tick(&self, bytes: u64) {
        if self.quiet {
            return;
        }
        if let Ok(active) = self.active.lock() {
            if let Some(ref pb) = *active {
                pb.inc(bytes);
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Ok(mut active) = self.active.lock() {
            if let Some(pb) = active.take() {
                pb.finish_with_message(format!("{phase} complete"));
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Ok(active) = self.active.lock() {
            if let Some(ref pb) = *active {
                pb.set_message(message.to_string());
            }
        }
    }
}
