//! Domain layer for the daybook journal: entities, errors, configuration.
//!
//! No I/O lives here. The journal store, the LLM providers, and the feedback
//! orchestrator all build on these types.

pub mod config;
pub mod entities;
pub mod errors;

pub use config::{Config, ProviderConfig, ProviderKind, RetrySettings};
pub use entities::{Entry, EntryId, Feedback, FeedbackStatus};
pub use errors::{FeedbackError, FeedbackResult};
