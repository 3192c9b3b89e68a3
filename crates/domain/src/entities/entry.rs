//! Daily journal entry: one record of financial and wellbeing metrics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FeedbackError;

/// Unique identifier of a journal entry.
pub type EntryId = Uuid;

/// One day's journaled record, owned by a user. `(owner, date)` is unique.
///
/// The feedback pipeline only ever reads an entry; it never mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub owner: String,
    pub date: NaiveDate,
    /// Money earned that day.
    pub income: f64,
    /// Money spent that day.
    pub expenses: f64,
    pub hours_worked: f64,
    pub sleep_hours: f64,
    /// Self-reported stress, 1 (calm) to 10 (overwhelmed).
    pub stress_level: u8,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Create a new entry with fresh timestamps. Persistence assigns nothing
    /// beyond what is set here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: &str,
        date: NaiveDate,
        income: f64,
        expenses: f64,
        hours_worked: f64,
        sleep_hours: f64,
        stress_level: u8,
        notes: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            date,
            income,
            expenses,
            hours_worked,
            sleep_hours,
            stress_level,
            notes: notes.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check that the entry carries everything prompt assembly needs.
    ///
    /// A violation here is a caller error: no feedback record is created and
    /// nothing is retried.
    pub fn validate_for_prompt(&self) -> Result<(), FeedbackError> {
        if self.owner.is_empty() {
            return Err(FeedbackError::InvalidEntry("owner is empty".to_string()));
        }
        if !(1..=10).contains(&self.stress_level) {
            return Err(FeedbackError::InvalidEntry(format!(
                "stress level {} is outside 1-10",
                self.stress_level
            )));
        }
        for (name, value) in [
            ("income", self.income),
            ("expenses", self.expenses),
            ("hours_worked", self.hours_worked),
            ("sleep_hours", self.sleep_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FeedbackError::InvalidEntry(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> Entry {
        Entry::new(
            "tester",
            NaiveDate::from_ymd_opt(2025, 10, 21).expect("valid date"),
            420.0,
            35.5,
            9.0,
            6.5,
            6,
            "Worked overtime.",
        )
    }

    #[test]
    fn test_new_entry_has_identity_and_timestamps() {
        let entry = sample_entry();
        assert_ne!(entry.id, Uuid::nil());
        assert_eq!(entry.created_at, entry.updated_at);
        assert_eq!(entry.stress_level, 6);
    }

    #[test]
    fn test_validate_accepts_well_formed_entry() {
        assert!(sample_entry().validate_for_prompt().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_stress() {
        let mut entry = sample_entry();
        entry.stress_level = 0;
        assert!(entry.validate_for_prompt().is_err());
        entry.stress_level = 11;
        assert!(entry.validate_for_prompt().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_amounts() {
        let mut entry = sample_entry();
        entry.income = -1.0;
        let err = entry.validate_for_prompt().unwrap_err();
        assert!(err.to_string().contains("income"));
    }

    #[test]
    fn test_validate_rejects_empty_owner() {
        let mut entry = sample_entry();
        entry.owner.clear();
        assert!(entry.validate_for_prompt().is_err());
    }
}
