//! Progress bar observer for the pipeline milestones.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use stockfeed_recon::{Progress, Stage};

/// Percent bar on stderr driven by pipeline milestones.
#[derive(Debug)]
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new(100);
        pb.set_style(bar_style());
        Self { pb }
    }

    /// Draws nothing; used for `--quiet` and `--json`.
    pub fn hidden() -> Self {
        Self { pb: ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden()) }
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn milestone(&mut self, stage: Stage) {
        self.pb.set_position(u64::from(stage.percent()));
        self.pb.set_message(stage.label());
        if stage == Stage::Finished {
            self.pb.finish_and_clear();
        }
    }
}

impl Drop for BarProgress {
    // An early pipeline error must not leave a half-drawn bar above it
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
