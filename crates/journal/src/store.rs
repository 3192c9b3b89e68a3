use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use domain::{Entry, EntryId, Feedback, FeedbackStatus};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// SQLite store for entries and feedback records.
///
/// One connection behind an async mutex; every write is a single statement,
/// so a concurrent reader never observes a half-applied status transition.
pub struct JournalStore {
    conn: Arc<Mutex<Connection>>,
}

impl JournalStore {
    /// Open (and if needed initialize) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        Self::with_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                date TEXT NOT NULL,
                income REAL NOT NULL,
                expenses REAL NOT NULL,
                hours_worked REAL NOT NULL,
                sleep_hours REAL NOT NULL,
                stress_level INTEGER NOT NULL,
                notes TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (owner, date)
            );

            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                provider TEXT NOT NULL DEFAULT '',
                model TEXT NOT NULL DEFAULT '',
                tokens_used INTEGER,
                generation_time_ms INTEGER,
                error_message TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_entries_owner_date ON entries(owner, date);
            CREATE INDEX IF NOT EXISTS idx_feedback_status ON feedback(status);
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // --- entries -----------------------------------------------------------

    /// Persist a new entry. `(owner, date)` must be unique.
    pub async fn create_entry(&self, entry: &Entry) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO entries (
                id, owner, date, income, expenses, hours_worked, sleep_hours,
                stress_level, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.id.to_string(),
                entry.owner,
                entry.date.format("%Y-%m-%d").to_string(),
                entry.income,
                entry.expenses,
                entry.hours_worked,
                entry.sleep_hours,
                entry.stress_level as i64,
                entry.notes,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )
        .with_context(|| {
            format!(
                "Failed to insert entry for {} on {} (an entry may already exist for that day)",
                entry.owner, entry.date
            )
        })?;

        debug!("Created entry {} ({} {})", entry.id, entry.owner, entry.date);
        Ok(())
    }

    pub async fn get_entry(&self, id: &EntryId) -> Result<Option<Entry>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, owner, date, income, expenses, hours_worked, sleep_hours,
                    stress_level, notes, created_at, updated_at
             FROM entries WHERE id = ?1",
        )?;

        let entry = stmt
            .query_row(params![id.to_string()], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    pub async fn get_entry_by_date(&self, owner: &str, date: NaiveDate) -> Result<Option<Entry>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, owner, date, income, expenses, hours_worked, sleep_hours,
                    stress_level, notes, created_at, updated_at
             FROM entries WHERE owner = ?1 AND date = ?2",
        )?;

        let entry = stmt
            .query_row(
                params![owner, date.format("%Y-%m-%d").to_string()],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Most recent entries for an owner, newest first.
    pub async fn list_entries(&self, owner: &str, limit: usize) -> Result<Vec<Entry>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, owner, date, income, expenses, hours_worked, sleep_hours,
                    stress_level, notes, created_at, updated_at
             FROM entries WHERE owner = ?1 ORDER BY date DESC LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![owner, limit as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub async fn update_notes(&self, id: &EntryId, notes: &str) -> Result<()> {
        let conn = self.conn.lock().await;

        let changed = conn.execute(
            "UPDATE entries SET notes = ?1, updated_at = ?2 WHERE id = ?3",
            params![notes, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(anyhow!("Entry {} does not exist", id));
        }
        Ok(())
    }

    // --- feedback ----------------------------------------------------------

    /// Create the feedback row for an entry in `pending` state, or reset an
    /// existing row back to `pending` (regeneration discards the prior
    /// content or error message).
    pub async fn upsert_pending_feedback(&self, entry_id: &EntryId) -> Result<Feedback> {
        let pending = Feedback::pending(*entry_id);
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO feedback (
                id, entry_id, status, content, provider, model,
                tokens_used, generation_time_ms, error_message, created_at, updated_at
            ) VALUES (?1, ?2, 'pending', '', '', '', NULL, NULL, '', ?3, ?4)
            ON CONFLICT (entry_id) DO UPDATE SET
                status = 'pending',
                content = '',
                provider = '',
                model = '',
                tokens_used = NULL,
                generation_time_ms = NULL,
                error_message = '',
                updated_at = ?4",
            params![
                pending.id.to_string(),
                entry_id.to_string(),
                pending.created_at.to_rfc3339(),
                pending.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to write pending feedback state")?;

        drop(conn);
        self.get_feedback(entry_id)
            .await?
            .ok_or_else(|| anyhow!("Pending feedback for entry {} vanished after write", entry_id))
    }

    pub async fn get_feedback(&self, entry_id: &EntryId) -> Result<Option<Feedback>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, entry_id, status, content, provider, model,
                    tokens_used, generation_time_ms, error_message, created_at, updated_at
             FROM feedback WHERE entry_id = ?1",
        )?;

        let feedback = stmt
            .query_row(params![entry_id.to_string()], feedback_from_row)
            .optional()?;
        Ok(feedback)
    }

    /// Transition `pending -> completed` as one atomic replace of the whole
    /// outcome: content, provenance metadata, and timestamp together.
    pub async fn complete_feedback(
        &self,
        entry_id: &EntryId,
        content: &str,
        provider: &str,
        model: &str,
        tokens_used: Option<u32>,
        generation_time: Duration,
    ) -> Result<()> {
        if content.is_empty() {
            return Err(anyhow!("Refusing to mark feedback completed with empty content"));
        }
        let conn = self.conn.lock().await;

        let changed = conn.execute(
            "UPDATE feedback SET
                status = 'completed',
                content = ?1,
                provider = ?2,
                model = ?3,
                tokens_used = ?4,
                generation_time_ms = ?5,
                error_message = '',
                updated_at = ?6
             WHERE entry_id = ?7",
            params![
                content,
                provider,
                model,
                tokens_used,
                generation_time.as_millis() as i64,
                Utc::now().to_rfc3339(),
                entry_id.to_string(),
            ],
        )
        .context("Failed to write completed feedback state")?;
        if changed == 0 {
            return Err(anyhow!("No feedback row for entry {}", entry_id));
        }
        Ok(())
    }

    /// Transition `pending -> failed`, carrying the last error observed.
    pub async fn fail_feedback(&self, entry_id: &EntryId, error_message: &str) -> Result<()> {
        if error_message.is_empty() {
            return Err(anyhow!("Refusing to mark feedback failed without an error message"));
        }
        let conn = self.conn.lock().await;

        let changed = conn.execute(
            "UPDATE feedback SET
                status = 'failed',
                content = '',
                tokens_used = NULL,
                generation_time_ms = NULL,
                error_message = ?1,
                updated_at = ?2
             WHERE entry_id = ?3",
            params![
                error_message,
                Utc::now().to_rfc3339(),
                entry_id.to_string(),
            ],
        )
        .context("Failed to write failed feedback state")?;
        if changed == 0 {
            return Err(anyhow!("No feedback row for entry {}", entry_id));
        }
        Ok(())
    }
}

// --- row mapping -----------------------------------------------------------

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: parse_uuid(row, 0)?,
        owner: row.get(1)?,
        date: parse_date(row, 2)?,
        income: row.get(3)?,
        expenses: row.get(4)?,
        hours_worked: row.get(5)?,
        sleep_hours: row.get(6)?,
        stress_level: row.get::<_, i64>(7)? as u8,
        notes: row.get(8)?,
        created_at: parse_timestamp(row, 9)?,
        updated_at: parse_timestamp(row, 10)?,
    })
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    let status: String = row.get(2)?;
    Ok(Feedback {
        id: parse_uuid(row, 0)?,
        entry_id: parse_uuid(row, 1)?,
        status: status
            .parse()
            .map_err(|_| bad_column(2, format!("unknown status {status}")))?,
        content: row.get(3)?,
        provider: row.get(4)?,
        model: row.get(5)?,
        tokens_used: row.get::<_, Option<i64>>(6)?.map(|t| t as u32),
        generation_time: row
            .get::<_, Option<i64>>(7)?
            .map(|ms| Duration::from_millis(ms as u64)),
        error_message: row.get(8)?,
        created_at: parse_timestamp(row, 9)?,
        updated_at: parse_timestamp(row, 10)?,
    })
}

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| bad_column(idx, e.to_string()))
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| bad_column(idx, e.to_string()))
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, e.to_string()))
}

fn bad_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}
