//! Feedback record: the persisted outcome of one AI-generation attempt.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::EntryId;

/// Lifecycle of a feedback record.
///
/// A record is born `Pending`, reaches exactly one terminal state per
/// generation attempt, and a regeneration request resets it to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackStatus {
    Pending,
    Completed,
    Failed,
}

impl FeedbackStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedbackStatus::Completed | FeedbackStatus::Failed)
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackStatus::Pending => write!(f, "pending"),
            FeedbackStatus::Completed => write!(f, "completed"),
            FeedbackStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeedbackStatus::Pending),
            "completed" => Ok(FeedbackStatus::Completed),
            "failed" => Ok(FeedbackStatus::Failed),
            _ => Err(anyhow::anyhow!("Unknown feedback status: {}", s)),
        }
    }
}

/// The current feedback record for an entry. There is at most one per entry;
/// regeneration overwrites it in place.
///
/// Field invariants, maintained by the store's single-statement transitions:
/// `Completed` has non-empty `content` and empty `error_message`; `Failed`
/// has the reverse; `Pending` has both empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub entry_id: EntryId,
    pub status: FeedbackStatus,
    pub content: String,
    /// Which provider implementation produced the content, e.g. "anthropic".
    pub provider: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    /// Wall-clock duration of the successful generation call.
    pub generation_time: Option<Duration>,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    /// A fresh record in the initial state, ready to persist.
    pub fn pending(entry_id: EntryId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entry_id,
            status: FeedbackStatus::Pending,
            content: String::new(),
            provider: String::new(),
            model: String::new(),
            tokens_used: None,
            generation_time: None,
            error_message: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            FeedbackStatus::Pending,
            FeedbackStatus::Completed,
            FeedbackStatus::Failed,
        ] {
            let parsed: FeedbackStatus = status.to_string().parse().expect("parses back");
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<FeedbackStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!FeedbackStatus::Pending.is_terminal());
        assert!(FeedbackStatus::Completed.is_terminal());
        assert!(FeedbackStatus::Failed.is_terminal());
    }

    #[test]
    fn test_pending_record_is_empty() {
        let feedback = Feedback::pending(Uuid::new_v4());
        assert_eq!(feedback.status, FeedbackStatus::Pending);
        assert!(feedback.content.is_empty());
        assert!(feedback.error_message.is_empty());
        assert!(feedback.tokens_used.is_none());
        assert!(feedback.generation_time.is_none());
    }
}
