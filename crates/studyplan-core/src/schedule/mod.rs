//! Stored schedule data: obligations, calendar events and suggestions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::planner::{BusyInterval, Obligation};

/// A task or assignment as stored for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl ObligationRecord {
    pub fn to_obligation(&self) -> Obligation {
        Obligation {
            id: self.id.clone(),
            title: self.title.clone(),
            due_date: self.due_date,
        }
    }
}

/// Where a calendar event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Entered by the user or imported
    Manual,
    /// Created by accepting a study-block suggestion
    Suggestion,
}

impl EventOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Suggestion => "suggestion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "suggestion" => Some(Self::Suggestion),
            _ => None,
        }
    }
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub origin: EventOrigin,
}

impl CalendarEvent {
    /// Create a new calendar event.
    ///
    /// # Errors
    /// Returns an error unless `end > start`.
    pub fn new(
        id: String,
        user_id: String,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        origin: EventOrigin,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self {
            id,
            user_id,
            title,
            start,
            end,
            origin,
        })
    }

    pub fn busy_interval(&self) -> BusyInterval {
        BusyInterval::new(self.start, self.end)
    }
}

/// Kind of change a suggestion would make once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    CreateCalendarBlock,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCalendarBlock => "create_calendar_block",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create_calendar_block" => Some(Self::CreateCalendarBlock),
            _ => None,
        }
    }
}

/// Lifecycle of a suggestion. Moves out of `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Calendar block described by a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A proposal ready to be written to the suggestion store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub label: String,
    pub payload: BlockPayload,
}

/// A persisted proposal awaiting (or past) a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub label: String,
    pub payload: BlockPayload,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Suggestion {
    pub fn from_record(user_id: &str, record: &ProposalRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id: record.id.clone(),
            user_id: user_id.to_string(),
            kind: record.kind,
            label: record.label.clone(),
            payload: record.payload.clone(),
            status: SuggestionStatus::Pending,
            created_at,
            decided_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let result = CalendarEvent::new(
            "e".into(),
            "u".into(),
            "Lecture".into(),
            start,
            start,
            EventOrigin::Manual,
        );
        assert!(matches!(result, Err(ValidationError::InvalidTimeRange { .. })));
    }

    #[test]
    fn proposal_record_serializes_type_tag() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let record = ProposalRecord {
            id: "s-1".into(),
            kind: SuggestionKind::CreateCalendarBlock,
            label: "Study: Essay".into(),
            payload: BlockPayload {
                title: "Study: Essay".into(),
                start,
                end: start + chrono::Duration::hours(1),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "create_calendar_block");
        assert_eq!(json["payload"]["title"], "Study: Essay");
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            SuggestionStatus::Pending,
            SuggestionStatus::Accepted,
            SuggestionStatus::Rejected,
        ] {
            assert_eq!(SuggestionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EventOrigin::parse("suggestion"), Some(EventOrigin::Suggestion));
        assert_eq!(SuggestionKind::parse("delete_everything"), None);
    }
}
