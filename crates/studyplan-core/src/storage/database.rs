//! SQLite-based storage for obligations, calendar events and suggestions.
//!
//! Also serves as the planner's [`PlannerStore`] and [`ProposalSink`].
//! Suggestions move out of `pending` exactly once; the status update is
//! conditional on the row still being pending, so two racing decisions
//! cannot both succeed.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::copilot::{IdGenerator, PlannerStore, ProposalSink};
use crate::error::{DatabaseError, Result, SuggestionError};
use crate::planner::{BusyInterval, Obligation};
use crate::schedule::{
    BlockPayload, CalendarEvent, EventOrigin, ObligationRecord, ProposalRecord, Suggestion,
    SuggestionKind, SuggestionStatus,
};

// === Helper Functions ===

/// Timestamps are stored as second-precision RFC3339 in UTC so that string
/// order matches time order.
fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(table: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table,
            message: format!("bad timestamp '{s}': {e}"),
        })
}

fn parse_date(table: &'static str, s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DatabaseError::CorruptRow {
        table,
        message: format!("bad date '{s}': {e}"),
    })
}

type ObligationRow = (String, String, String, Option<String>, bool, String);
type EventRow = (String, String, String, String, String, String);
type SuggestionRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
);

fn obligation_from_row(row: ObligationRow) -> Result<ObligationRecord, DatabaseError> {
    let (id, user_id, title, due_date, completed, created_at) = row;
    Ok(ObligationRecord {
        id,
        user_id,
        title,
        due_date: due_date
            .as_deref()
            .map(|d| parse_date("obligations", d))
            .transpose()?,
        completed,
        created_at: parse_ts("obligations", &created_at)?,
    })
}

fn event_from_row(row: EventRow) -> Result<CalendarEvent, DatabaseError> {
    let (id, user_id, title, start, end, origin) = row;
    Ok(CalendarEvent {
        origin: EventOrigin::parse(&origin).ok_or_else(|| DatabaseError::CorruptRow {
            table: "events",
            message: format!("unknown origin '{origin}'"),
        })?,
        start: parse_ts("events", &start)?,
        end: parse_ts("events", &end)?,
        id,
        user_id,
        title,
    })
}

fn suggestion_from_row(row: SuggestionRow) -> Result<Suggestion, DatabaseError> {
    let (id, user_id, kind, label, payload, status, created_at, decided_at) = row;
    let corrupt = |message: String| DatabaseError::CorruptRow {
        table: "suggestions",
        message,
    };
    Ok(Suggestion {
        kind: SuggestionKind::parse(&kind).ok_or_else(|| corrupt(format!("unknown kind '{kind}'")))?,
        payload: serde_json::from_str::<BlockPayload>(&payload)
            .map_err(|e| corrupt(format!("bad payload: {e}")))?,
        status: SuggestionStatus::parse(&status)
            .ok_or_else(|| corrupt(format!("unknown status '{status}'")))?,
        created_at: parse_ts("suggestions", &created_at)?,
        decided_at: decided_at
            .as_deref()
            .map(|d| parse_ts("suggestions", d))
            .transpose()?,
        id,
        user_id,
        label,
    })
}

const SUGGESTION_COLUMNS: &str =
    "id, user_id, kind, label, payload, status, created_at, decided_at";

/// SQLite database for planner data.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/studyplan/studyplan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyplan.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Obligations ===

    /// Store a new obligation.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn add_obligation(&self, obligation: &ObligationRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO obligations (id, user_id, title, due_date, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                obligation.id,
                obligation.user_id,
                obligation.title,
                obligation.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                obligation.completed,
                format_ts(obligation.created_at),
            ],
        )?;
        Ok(())
    }

    /// Obligations for a user, due date ascending with undated last.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_obligations(&self, user_id: &str, include_completed: bool) -> Result<Vec<ObligationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, due_date, completed, created_at
             FROM obligations
             WHERE user_id = ?1 AND (?2 OR completed = 0)
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id, include_completed], obligation_row)?;

        let mut obligations = Vec::new();
        for row in rows {
            obligations.push(obligation_from_row(row?)?);
        }
        Ok(obligations)
    }

    /// Mark an obligation completed. Returns `false` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn complete_obligation(&self, user_id: &str, id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE obligations SET completed = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    // === Events ===

    /// Store a calendar event.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_event(&self, event: &CalendarEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, user_id, title, start_at, end_at, origin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id,
                event.user_id,
                event.title,
                format_ts(event.start),
                format_ts(event.end),
                event.origin.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Events overlapping `[from, to)`, ordered by start.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_events(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, start_at, end_at, origin
             FROM events
             WHERE user_id = ?1 AND start_at < ?3 AND end_at > ?2
             ORDER BY start_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id, format_ts(from), format_ts(to)], event_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(event_from_row(row?)?);
        }
        Ok(events)
    }

    /// Delete an event. Returns `false` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete_event(&self, user_id: &str, id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    // === Suggestions ===

    /// Suggestions for a user, newest first, optionally filtered by status.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_suggestions(
        &self,
        user_id: &str,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUGGESTION_COLUMNS}
             FROM suggestions
             WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, status.map(|s| s.as_str())], suggestion_row)?;

        let mut suggestions = Vec::new();
        for row in rows {
            suggestions.push(suggestion_from_row(row?)?);
        }
        Ok(suggestions)
    }

    /// Fetch one suggestion.
    ///
    /// # Errors
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_suggestion(&self, user_id: &str, id: &str) -> Result<Option<Suggestion>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                suggestion_row,
            )
            .optional()?;
        Ok(row.map(suggestion_from_row).transpose()?)
    }

    /// Accept a pending suggestion and create the calendar block it describes.
    ///
    /// # Errors
    /// Returns [`SuggestionError::NotFound`] for unknown ids and
    /// [`SuggestionError::AlreadyDecided`] if the suggestion is no longer
    /// pending. Storage failures roll the decision back.
    pub fn accept_suggestion(
        &self,
        user_id: &str,
        id: &str,
        now: DateTime<Utc>,
        ids: &dyn IdGenerator,
    ) -> Result<CalendarEvent> {
        let tx = self.conn.unchecked_transaction()?;
        let suggestion = self.decide(user_id, id, SuggestionStatus::Accepted, now)?;

        let payload = &suggestion.payload;
        let event = CalendarEvent::new(
            ids.next_id(),
            user_id.to_string(),
            payload.title.clone(),
            payload.start,
            payload.end,
            EventOrigin::Suggestion,
        )
        .map_err(|e| SuggestionError::InvalidPayload {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        self.create_event(&event)?;
        tx.commit()?;

        tracing::info!(user_id, suggestion = id, event = %event.id, "accepted suggestion");
        Ok(event)
    }

    /// Reject a pending suggestion.
    ///
    /// # Errors
    /// Same decision errors as [`Database::accept_suggestion`].
    pub fn reject_suggestion(&self, user_id: &str, id: &str, now: DateTime<Utc>) -> Result<Suggestion> {
        let suggestion = self.decide(user_id, id, SuggestionStatus::Rejected, now)?;
        tracing::info!(user_id, suggestion = id, "rejected suggestion");
        Ok(suggestion)
    }

    fn decide(
        &self,
        user_id: &str,
        id: &str,
        status: SuggestionStatus,
        now: DateTime<Utc>,
    ) -> Result<Suggestion> {
        let Some(mut suggestion) = self.get_suggestion(user_id, id)? else {
            return Err(SuggestionError::NotFound(id.to_string()).into());
        };

        let changed = self.conn.execute(
            "UPDATE suggestions SET status = ?1, decided_at = ?2
             WHERE id = ?3 AND user_id = ?4 AND status = 'pending'",
            params![status.as_str(), format_ts(now), id, user_id],
        )?;
        if changed == 0 {
            let current = self
                .get_suggestion(user_id, id)?
                .map(|s| s.status)
                .unwrap_or(suggestion.status);
            tracing::warn!(user_id, suggestion = id, status = current.as_str(), "suggestion already decided");
            return Err(SuggestionError::AlreadyDecided {
                id: id.to_string(),
                status: current.as_str().to_string(),
            }
            .into());
        }

        suggestion.status = status;
        suggestion.decided_at = Some(now);
        Ok(suggestion)
    }
}

fn obligation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ObligationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn suggestion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SuggestionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

impl PlannerStore for Database {
    fn obligations(&self, user_id: &str, limit: usize) -> Result<Vec<Obligation>> {
        Ok(self
            .list_obligations(user_id, false)?
            .iter()
            .take(limit)
            .map(ObligationRecord::to_obligation)
            .collect())
    }

    fn busy_intervals(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        Ok(self
            .list_events(user_id, from, to)?
            .iter()
            .map(CalendarEvent::busy_interval)
            .collect())
    }

    fn next_suggested_block(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CalendarEvent>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, title, start_at, end_at, origin
                 FROM events
                 WHERE user_id = ?1 AND origin = 'suggestion' AND start_at >= ?2
                 ORDER BY start_at ASC
                 LIMIT 1",
                params![user_id, format_ts(now)],
                event_row,
            )
            .optional()?;
        Ok(row.map(event_from_row).transpose()?)
    }
}

impl ProposalSink for Database {
    fn insert_proposals(
        &self,
        user_id: &str,
        records: &[ProposalRecord],
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let payload = serde_json::to_string(&record.payload)?;
            self.conn.execute(
                "INSERT INTO suggestions (id, user_id, kind, label, payload, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                params![
                    record.id,
                    user_id,
                    record.kind.as_str(),
                    record.label,
                    payload,
                    format_ts(created_at),
                ],
            )?;
            stored.push(Suggestion::from_record(user_id, record, created_at));
        }
        tx.commit()?;
        Ok(stored)
    }
}
