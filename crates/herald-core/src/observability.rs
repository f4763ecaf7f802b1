use serde::{Deserialize, Serialize};

use crate::domain::{BatchOutcome, PassReport};

/// Per-outcome counts for one pass, shaped for logs and CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassCounts {
    pub sent: usize,
    pub skipped_no_token: usize,
    pub send_failed_transient: usize,
    pub send_failed_token_invalid: usize,
    pub processing_error: usize,
}

impl PassCounts {
    pub fn record(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Sent => self.sent += 1,
            BatchOutcome::SkippedNoToken => self.skipped_no_token += 1,
            BatchOutcome::SendFailedTransient => self.send_failed_transient += 1,
            BatchOutcome::SendFailedTokenInvalid => self.send_failed_token_invalid += 1,
            BatchOutcome::ProcessingError => self.processing_error += 1,
        }
    }
}

impl From<&PassReport> for PassCounts {
    fn from(report: &PassReport) -> Self {
        let mut counts = PassCounts::default();
        for item in &report.items {
            counts.record(item.outcome);
        }
        counts
    }
}
