//! SQLite persistence for journal entries and their feedback records.

mod store;

pub use store::JournalStore;
