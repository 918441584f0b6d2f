use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::traits::ProgressObserver;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} frames ({per_sec})";
const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Terminal progress for a video job.
///
/// Container frame counts are not authoritative, so a zero count gets a
/// spinner and an overshooting count simply grows the bar.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for ProgressTracker {
    fn start(&mut self, total: u64) {
        let progress_bar = if total > 0 {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
                pb.set_style(style);
            }
            // Keeps the spinner moving while a single frame is still in inference.
            pb.enable_steady_tick(SPINNER_TICK);
            pb
        };
        self.progress_bar = Some(progress_bar);
    }

    fn advance(&mut self) {
        if let Some(pb) = &self.progress_bar {
            if pb.length().is_some_and(|len| pb.position() >= len) {
                pb.inc_length(1);
            }
            pb.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.disable_steady_tick();
            pb.finish();
        }
    }
}
