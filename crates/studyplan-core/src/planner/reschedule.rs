//! Alternative slots for a single block or time window.
//!
//! Rescheduling answers "where else could this go?", so it does not spread
//! across days: candidates inside an explicit window come first, then the
//! lookahead is scanned chronologically.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BusyInterval, PlanOutcome, PlannerConfig, Slot, SlotGenerator, StudyBlockProposal};

/// Why a window argument could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowParseError {
    #[error("window is empty")]
    Empty,

    #[error("expected 'YYYY-MM-DD HH:MM-HH:MM', got '{0}'")]
    Malformed(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("window end {end} must be after start {start}")]
    EmptyRange { start: NaiveTime, end: NaiveTime },
}

/// An explicit local-time window on one date, e.g. `2026-10-20 14:00-16:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl RescheduleWindow {
    /// Parse `YYYY-MM-DD HH:MM-HH:MM` strictly.
    ///
    /// # Errors
    /// Returns a [`WindowParseError`] describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, WindowParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(WindowParseError::Empty);
        }

        let mut parts = input.split_whitespace();
        let (Some(date), Some(range), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(WindowParseError::Malformed(input.to_string()));
        };
        let Some((start, end)) = range.split_once('-') else {
            return Err(WindowParseError::Malformed(input.to_string()));
        };

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| WindowParseError::InvalidDate(date.to_string()))?;
        let start = parse_time(start)?;
        let end = parse_time(end)?;
        if end <= start {
            return Err(WindowParseError::EmptyRange { start, end });
        }

        Ok(Self { date, start, end })
    }

    /// The window as UTC instants in the configured offset.
    pub fn to_instants(&self, config: &PlannerConfig) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = config.local_instant(self.date, self.start.hour(), self.start.minute())?;
        let end = config.local_instant(self.date, self.end.hour(), self.end.minute())?;
        Some((start, end))
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, WindowParseError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| WindowParseError::InvalidTime(s.to_string()))
}

impl FromStr for RescheduleWindow {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RescheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// What is being moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RescheduleTarget {
    /// An explicit window the user wants to study in instead
    Window(RescheduleWindow),
    /// An existing study block created from an earlier proposal
    Block {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Up to `max_reschedule_alternatives` slots that avoid the original
/// interval and every busy interval.
///
/// For a window target, sub-slots strictly inside the window are offered
/// first; the rest come from the lookahead in chronological order. Fewer
/// than `min_reschedule_alternatives` results is a soft failure.
pub fn reschedule(
    now: DateTime<Utc>,
    target: &RescheduleTarget,
    busy: &[BusyInterval],
    config: &PlannerConfig,
) -> PlanOutcome {
    let generator = SlotGenerator::new(config);
    let max = config.max_reschedule_alternatives as usize;

    let (original_start, original_end, title, mut alternatives) = match target {
        RescheduleTarget::Window(window) => {
            let Some((start, end)) = window.to_instants(config) else {
                return PlanOutcome::unavailable(format!(
                    "The window {window} does not exist in your time zone."
                ));
            };
            if end <= now {
                return PlanOutcome::unavailable(format!(
                    "The window {window} is already past. Pick a window later than now."
                ));
            }
            let inside = window_slots(&generator, config, window.date, start, end, now, busy);
            (start, end, "Study: Rescheduled block".to_string(), inside)
        }
        RescheduleTarget::Block { title, start, end } => (*start, *end, title.clone(), Vec::new()),
    };
    alternatives.truncate(max);

    let today = config.local_date(now);
    let lookahead = generator.generate(now, today, config.reschedule_lookahead_days, busy);
    for slot in lookahead {
        if alternatives.len() >= max {
            break;
        }
        if slot.overlaps(original_start, original_end)
            || alternatives.iter().any(|a| a.conflicts_with(&slot))
        {
            continue;
        }
        alternatives.push(slot);
    }

    let min = config.min_reschedule_alternatives as usize;
    if alternatives.len() < min {
        tracing::warn!(found = alternatives.len(), min, "too few reschedule alternatives");
        return PlanOutcome::unavailable(format!(
            "Couldn't find at least {min} free alternatives in the next {} days. \
             Try a different window or clear some events.",
            config.reschedule_lookahead_days
        ));
    }

    let proposals: Vec<StudyBlockProposal> = alternatives
        .iter()
        .map(|slot| StudyBlockProposal::new(title.clone(), slot.start, slot.end))
        .collect();
    tracing::info!(alternatives = proposals.len(), "proposed reschedule alternatives");
    PlanOutcome::Planned {
        reply: format!(
            "Found {} alternative slots. Accept one to move your study block.",
            proposals.len()
        ),
        proposals,
    }
}

/// Back-to-back slots inside `[start, end)`, clipped to working hours.
fn window_slots(
    generator: &SlotGenerator<'_>,
    config: &PlannerConfig,
    day: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    busy: &[BusyInterval],
) -> Vec<Slot> {
    let (Some(work_start), Some(work_end)) = (
        config.local_instant(day, config.working_start_hour, 0),
        config.local_instant(day, config.working_end_hour, 0),
    ) else {
        return Vec::new();
    };

    let step = Duration::minutes(i64::from(config.slot_minutes));
    let mut slots = Vec::new();
    let mut cursor = start;
    while cursor + step <= end {
        let slot = generator.slot_at(cursor, day);
        if slot.start >= work_start && slot.end <= work_end && generator.is_free(&slot, now, busy) {
            slots.push(slot);
        }
        cursor += step;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testing::{at, busy, day, monday_morning};

    fn window(day_offset: i64, from: (u32, u32), to: (u32, u32)) -> RescheduleWindow {
        RescheduleWindow {
            date: day(day_offset),
            start: NaiveTime::from_hms_opt(from.0, from.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(to.0, to.1, 0).unwrap(),
        }
    }

    #[test]
    fn parses_strict_window() {
        let parsed = RescheduleWindow::parse("2026-10-20 14:00-16:00").unwrap();
        assert_eq!(parsed, window(1, (14, 0), (16, 0)));
        assert_eq!(parsed.to_string(), "2026-10-20 14:00-16:00");
    }

    #[test]
    fn rejects_malformed_windows() {
        assert_eq!(RescheduleWindow::parse("  "), Err(WindowParseError::Empty));
        assert!(matches!(
            RescheduleWindow::parse("tomorrow afternoon"),
            Err(WindowParseError::Malformed(_))
        ));
        assert!(matches!(
            RescheduleWindow::parse("2026-13-01 14:00-16:00"),
            Err(WindowParseError::InvalidDate(_))
        ));
        assert!(matches!(
            RescheduleWindow::parse("2026-10-20 14:00-25:00"),
            Err(WindowParseError::InvalidTime(_))
        ));
        assert!(matches!(
            RescheduleWindow::parse("2026-10-20 16:00-14:00"),
            Err(WindowParseError::EmptyRange { .. })
        ));
        assert!(matches!(
            RescheduleWindow::parse("2026-10-20 14:00"),
            Err(WindowParseError::Malformed(_))
        ));
    }

    #[test]
    fn window_alternatives_start_inside_window() {
        let config = PlannerConfig::default();
        let target = RescheduleTarget::Window(window(1, (14, 0), (16, 0)));
        let outcome = reschedule(monday_morning(), &target, &[], &config);
        let proposals = outcome.proposals();
        assert_eq!(proposals.len(), 5);
        assert_eq!(proposals[0].start, at(1, 14, 0));
        assert_eq!(proposals[0].end, at(1, 15, 0));
        assert_eq!(proposals[1].start, at(1, 15, 0));
        // Remaining alternatives come from the lookahead, outside the window.
        assert_eq!(proposals[2].start, at(0, 8, 0));
        for p in &proposals[2..] {
            assert!(!crate::planner::overlaps(p.start, p.end, at(1, 14, 0), at(1, 16, 0)));
        }
    }

    #[test]
    fn busy_time_inside_window_is_skipped() {
        let config = PlannerConfig::default();
        let target = RescheduleTarget::Window(window(1, (14, 0), (17, 0)));
        let outcome = reschedule(monday_morning(), &target, &[busy(1, 14, 15)], &config);
        assert_eq!(outcome.proposals()[0].start, at(1, 15, 0));
        assert_eq!(outcome.proposals()[1].start, at(1, 16, 0));
    }

    #[test]
    fn block_alternatives_avoid_the_block() {
        let config = PlannerConfig::default();
        let target = RescheduleTarget::Block {
            title: "Study: Essay".into(),
            start: at(0, 8, 0),
            end: at(0, 9, 0),
        };
        let busy = vec![busy(0, 8, 9)];
        let outcome = reschedule(monday_morning(), &target, &busy, &config);
        let proposals = outcome.proposals();
        assert_eq!(proposals.len(), 5);
        assert_eq!(proposals[0].start, at(0, 9, 0));
        assert!(proposals.iter().all(|p| p.title == "Study: Essay"));
    }

    #[test]
    fn past_window_is_soft_failure() {
        let config = PlannerConfig::default();
        let target = RescheduleTarget::Window(window(-1, (14, 0), (16, 0)));
        let outcome = reschedule(monday_morning(), &target, &[], &config);
        assert!(!outcome.is_planned());
        assert!(outcome.reply().contains("already past"));
    }

    #[test]
    fn too_few_alternatives_is_soft_failure() {
        let config = PlannerConfig::default();
        let busy: Vec<_> = (0..7)
            .map(|d| if d == 0 { busy(0, 8, 21) } else { busy(d, 8, 22) })
            .collect();
        let target = RescheduleTarget::Block {
            title: "Study: Essay".into(),
            start: at(0, 10, 0),
            end: at(0, 11, 0),
        };
        let outcome = reschedule(monday_morning(), &target, &busy, &config);
        assert!(outcome.proposals().is_empty());
        assert!(outcome.reply().contains("at least 2"));
    }
}
