pub mod entry;
pub mod feedback;

pub use entry::{Entry, EntryId};
pub use feedback::{Feedback, FeedbackStatus};
