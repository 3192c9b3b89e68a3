//! Error taxonomy of the feedback pipeline.
//!
//! Three classes with different propagation rules: caller errors surface
//! synchronously from `request_feedback` and are never retried; provider
//! errors are absorbed by the retry loop (see the `llm` crate for the type);
//! persistence errors are the only class allowed to escape the background
//! generation task.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FeedbackError {
    /// Caller error: the referenced entry does not exist.
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Caller error: the entry lacks fields required to build a prompt.
    #[error("Entry cannot produce a prompt: {0}")]
    InvalidEntry(String),

    /// Caller error: feedback was never requested for this entry.
    #[error("Feedback has not been requested for entry {0}")]
    NotRequested(Uuid),

    /// Failure to read or write feedback state. Fatal to the attempt: without
    /// a durable status there is nothing safe to report.
    #[error("Feedback persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

pub type FeedbackResult<T> = Result<T, FeedbackError>;

impl FeedbackError {
    /// Caller errors are surfaced synchronously and never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            FeedbackError::EntryNotFound(_)
                | FeedbackError::InvalidEntry(_)
                | FeedbackError::NotRequested(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_error_classification() {
        assert!(FeedbackError::EntryNotFound(Uuid::nil()).is_caller_error());
        assert!(FeedbackError::InvalidEntry("stress".to_string()).is_caller_error());
        assert!(FeedbackError::NotRequested(Uuid::nil()).is_caller_error());
        assert!(!FeedbackError::Persistence(anyhow::anyhow!("disk full")).is_caller_error());
    }

    #[test]
    fn test_error_messages_name_the_entry() {
        let id = Uuid::new_v4();
        let err = FeedbackError::EntryNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
