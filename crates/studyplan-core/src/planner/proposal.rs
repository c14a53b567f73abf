//! Allocator inputs and outputs.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Topic used when there are no obligations to cycle through.
pub const GENERAL_REVIEW: &str = "General review";

/// An incomplete task or assignment, as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
}

/// A proposed study block. Becomes a pending suggestion once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyBlockProposal {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StudyBlockProposal {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Human-readable label, e.g. `Study: Essay (Mon Oct 19, 14:00-15:00)`.
    pub fn label(&self, offset: FixedOffset) -> String {
        let start = self.start.with_timezone(&offset);
        let end = self.end.with_timezone(&offset);
        format!(
            "{} ({}, {}-{})",
            self.title,
            start.format("%a %b %-d"),
            start.format("%H:%M"),
            end.format("%H:%M")
        )
    }
}

/// Result of one allocator call.
///
/// `Unavailable` is a soft failure: the reply explains why and nothing is
/// proposed. It is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Planned {
        reply: String,
        proposals: Vec<StudyBlockProposal>,
    },
    Unavailable {
        reply: String,
    },
}

impl PlanOutcome {
    pub fn unavailable(reply: impl Into<String>) -> Self {
        Self::Unavailable {
            reply: reply.into(),
        }
    }

    pub fn reply(&self) -> &str {
        match self {
            Self::Planned { reply, .. } | Self::Unavailable { reply } => reply,
        }
    }

    pub fn proposals(&self) -> &[StudyBlockProposal] {
        match self {
            Self::Planned { proposals, .. } => proposals,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn is_planned(&self) -> bool {
        matches!(self, Self::Planned { .. })
    }

    pub fn into_parts(self) -> (String, Vec<StudyBlockProposal>) {
        match self {
            Self::Planned { reply, proposals } => (reply, proposals),
            Self::Unavailable { reply } => (reply, Vec::new()),
        }
    }
}
