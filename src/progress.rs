//! Progress reporting for long-running merges.
//!
//! The orchestrator only announces what it is about to do and when a step is
//! done; what the user sees is up to the [`ProgressReporter`]. The terminal
//! implementation draws an `indicatif` progress bar, [`SilentProgress`]
//! discards everything.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Observer of the merge steps. Implementations must not influence control
/// flow.
pub trait ProgressReporter {
    /// A run with `total` steps begins.
    fn start(&mut self, total: u64);

    /// Describe the step in progress.
    fn message(&mut self, message: &str);

    /// One step finished.
    fn advance(&mut self);

    /// All steps finished.
    fn finish(&mut self);
}

/// Template mirroring `current/max [bar] percent elapsed/eta | message`.
const BAR_TEMPLATE: &str =
    "{pos}/{len} [{bar:28}] {percent:>3}% {elapsed:>6}/{eta:<6} | {wide_msg}";

/// Draws a progress bar on stdout.
#[derive(Default)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for TerminalProgress {
    fn start(&mut self, total: u64) {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stdout());
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        self.bar = Some(bar);
    }

    fn message(&mut self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    fn advance(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start(&mut self, _total: u64) {}
    fn message(&mut self, _message: &str) {}
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}
