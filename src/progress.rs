//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait the scan orchestrator
//! reports through, the terminal implementation [`Progress`], and
//! [`EtaEstimate`], the linear time-remaining extrapolation shown while
//! hashing.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};

/// Phase name for the counting pre-pass.
pub const PHASE_COUNTING: &str = "counting";
/// Phase name for the hash-and-upsert pass.
pub const PHASE_HASHING: &str = "hashing";

/// Progress callback for scan phases.
///
/// Implement this trait to receive progress updates during a scan.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_COUNTING`], [`PHASE_HASHING`])
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message (directory changes, ETA).
    fn on_message(&self, _message: &str) {}
}

/// Linear extrapolation of scan duration.
///
/// Assumes every file costs the same, so the estimate is rough on trees
/// mixing very large and very small files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaEstimate {
    /// Fraction of files processed, in `(0, 1]`
    pub fraction: f64,
    /// Time spent so far
    pub elapsed: Duration,
    /// Projected total duration (`elapsed / fraction`)
    pub estimated_total: Duration,
    /// Projected time left (`estimated_total - elapsed`)
    pub remaining: Duration,
}

impl EtaEstimate {
    /// Estimate from elapsed time and `count` of `total` files done.
    ///
    /// Returns `None` when nothing can be extrapolated (`total == 0` or
    /// `count == 0`). `count` above `total` (tree grew between passes) is
    /// clamped to a fraction of 1.
    ///
    /// ```
    /// use fixity::progress::EtaEstimate;
    /// use std::time::Duration;
    ///
    /// let eta = EtaEstimate::compute(Duration::from_secs(10), 25, 100).unwrap();
    /// assert_eq!(eta.estimated_total, Duration::from_secs(40));
    /// assert_eq!(eta.remaining, Duration::from_secs(30));
    ///
    /// assert!(EtaEstimate::compute(Duration::from_secs(1), 0, 0).is_none());
    /// ```
    #[must_use]
    pub fn compute(elapsed: Duration, count: usize, total: usize) -> Option<Self> {
        if total == 0 || count == 0 {
            return None;
        }

        let fraction = (count as f64 / total as f64).min(1.0);
        let estimated_total = elapsed.div_f64(fraction);
        let remaining = estimated_total.saturating_sub(elapsed);

        Some(Self {
            fraction,
            elapsed,
            estimated_total,
            remaining,
        })
    }

    /// Percentage complete, `0.0..=100.0`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }

    /// Wall-clock time the scan is projected to finish, given `now`.
    #[must_use]
    pub fn completion_at(&self, now: DateTime<Local>) -> DateTime<Local> {
        now + chrono::Duration::from_std(self.remaining).unwrap_or_else(|_| chrono::Duration::zero())
    }

    /// One-line summary for the progress message.
    #[must_use]
    pub fn describe(&self, count: usize, total: usize, now: DateTime<Local>) -> String {
        format!(
            "{} of {} - {:.2}% complete - est. time left {} - est. completion {}",
            count,
            total,
            self.percent(),
            format_hms(self.remaining),
            self.completion_at(now).format("%H:%M:%S")
        )
    }
}

/// Format a duration as `HH:MM:SS`, hours unbounded.
///
/// ```
/// use fixity::progress::format_hms;
/// use std::time::Duration;
///
/// assert_eq!(format_hms(Duration::from_secs(3725)), "01:02:05");
/// ```
#[must_use]
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Progress reporter using indicatif.
pub struct Progress {
    counting: Mutex<Option<ProgressBar>>,
    hashing: Mutex<Option<ProgressBar>>,
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
    /// use fixity::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            counting: Mutex::new(None),
            hashing: Mutex::new(None),
            quiet,
        }
    }

    /// Create a style for the counting phase (spinner).
    fn counting_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    /// Create a style for the hashing phase (progress bar).
    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%)\n{wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        let hashing = self.hashing.lock().ok()?.clone();
        hashing.or_else(|| self.counting.lock().ok()?.clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_COUNTING => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::counting_style());
                pb.set_message("Counting files");
                pb.enable_steady_tick(Duration::from_millis(100));
                if let Ok(mut counting) = self.counting.lock() {
                    *counting = Some(pb);
                }
            }
            _ => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::hashing_style());
                pb.set_message(phase.to_string());
                if let Ok(mut hashing) = self.hashing.lock() {
                    *hashing = Some(pb);
                }
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active_bar() {
            pb.set_position(current as u64);
            log::trace!("Processing {}", path);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let slot = match phase {
            PHASE_COUNTING => &self.counting,
            _ => &self.hashing,
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut s| s.take()) {
            pb.finish_and_clear();
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}
