//! Feedback orchestrator: drives a feedback record through
//! `pending -> completed | failed`, isolating the rest of the system from
//! AI-backend flakiness.
//!
//! The submission contract is non-blocking: `request_feedback` persists a
//! `pending` record and returns it immediately, while the generation attempt
//! (including its retry chain) runs on a background task. Callers either
//! poll `get_feedback` or await `wait_for`.

pub mod backoff;
pub mod prompt;
pub mod service;

pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use service::FeedbackService;
