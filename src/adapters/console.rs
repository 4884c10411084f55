use crate::core::{CampaignSummary, ProgressObserver};
use std::io::Write;

/// Prints a single updating progress line to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn render(processed: usize, total: usize) -> String {
        let percent = if total == 0 {
            100
        } else {
            processed * 100 / total
        };
        format!("Processing: {}/{} ({}%)", processed, total, percent)
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{}", Self::render(processed, total));
        if processed == total {
            let _ = writeln!(err);
        }
        let _ = err.flush();
        tracing::debug!("Progress {}/{}", processed, total);
    }

    fn on_complete(&self, summary: &CampaignSummary) {
        tracing::info!(
            "Campaign completed: {} sent, {} failed",
            summary.sent,
            summary.failed
        );
    }
}
