//! Outcome model: what happened to each item in a pass.
//!
//! Outcomes are transient. They drive which mutations get staged and feed the
//! pass report; nothing here is persisted.

use serde::{Deserialize, Serialize};

use super::ids::{NotificationId, PassId};

/// Per-item result of a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchOutcome {
    /// Delivered; notification staged as triggered.
    Sent,
    /// Recipient has no token; notification staged as triggered without a send.
    SkippedNoToken,
    /// Gateway failed for a retryable reason; nothing staged.
    SendFailedTransient,
    /// Gateway rejected the token for good; token staged for clearing.
    SendFailedTokenInvalid,
    /// Recipient lookup (or the item task itself) failed; nothing staged.
    ProcessingError,
}

impl BatchOutcome {
    /// Whether this outcome stages the notification as triggered.
    pub fn marks_triggered(self) -> bool {
        matches!(self, BatchOutcome::Sent | BatchOutcome::SkippedNoToken)
    }

    /// Whether the item will be picked up again by the next pass.
    pub fn retried_next_pass(self) -> bool {
        !self.marks_triggered()
    }
}

/// Outcome of one item, tagged with its notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub notification_id: NotificationId,
    pub outcome: BatchOutcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ItemOutcome {
    pub fn new(notification_id: NotificationId, outcome: BatchOutcome) -> Self {
        Self {
            notification_id,
            outcome,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Result of a committed pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: PassId,
    pub items: Vec<ItemOutcome>,
    /// Number of mutations the commit applied.
    pub committed_writes: usize,
}

impl PassReport {
    pub fn count(&self, outcome: BatchOutcome) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }

    pub fn outcome_of(&self, id: &NotificationId) -> Option<BatchOutcome> {
        self.items
            .iter()
            .find(|i| &i.notification_id == id)
            .map(|i| i.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::sent(BatchOutcome::Sent, true)]
    #[case::no_token(BatchOutcome::SkippedNoToken, true)]
    #[case::transient(BatchOutcome::SendFailedTransient, false)]
    #[case::token_invalid(BatchOutcome::SendFailedTokenInvalid, false)]
    #[case::processing(BatchOutcome::ProcessingError, false)]
    fn only_sent_and_no_token_mark_triggered(#[case] outcome: BatchOutcome, #[case] marks: bool) {
        assert_eq!(outcome.marks_triggered(), marks);
        assert_eq!(outcome.retried_next_pass(), !marks);
    }

    #[test]
    fn outcome_serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&BatchOutcome::SendFailedTokenInvalid).unwrap();
        assert_eq!(s, "\"SEND_FAILED_TOKEN_INVALID\"");
    }
}
