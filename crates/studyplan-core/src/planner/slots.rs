//! Candidate slot generation.
//!
//! Enumerates fixed-length slots starting on each working hour of each day
//! in a horizon and keeps the ones that have not started yet and are free.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BusyInterval, PlannerConfig};

/// A candidate block of free time inside working hours on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    /// Local date the slot belongs to
    pub day: NaiveDate,
}

impl Slot {
    /// Check if this slot overlaps `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        super::overlaps(self.start, self.end, start, end)
    }

    pub fn conflicts_with(&self, other: &Slot) -> bool {
        self.overlaps(other.start, other.end)
    }
}

/// Generator for free slots in a schedule
pub struct SlotGenerator<'a> {
    config: &'a PlannerConfig,
}

impl<'a> SlotGenerator<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// All free slots on `days` consecutive local days starting at `first_day`.
    ///
    /// # Arguments
    /// * `now` - Slots starting before this instant are dropped
    /// * `first_day` - Local date of day offset 0
    /// * `days` - Number of days to scan
    /// * `busy` - Occupied intervals, in any order, possibly overlapping
    ///
    /// # Returns
    /// Slots sorted by start time
    pub fn generate(
        &self,
        now: DateTime<Utc>,
        first_day: NaiveDate,
        days: u32,
        busy: &[BusyInterval],
    ) -> Vec<Slot> {
        let mut slots = Vec::new();
        for offset in 0..days {
            let day = first_day + Duration::days(i64::from(offset));
            slots.extend(self.day_slots(day, now, busy));
        }
        tracing::debug!(%first_day, days, busy = busy.len(), slots = slots.len(), "generated slots");
        slots
    }

    /// Free slots on one local day.
    pub fn day_slots(
        &self,
        day: NaiveDate,
        now: DateTime<Utc>,
        busy: &[BusyInterval],
    ) -> Vec<Slot> {
        let Some(working_end) = self.config.local_instant(day, self.config.working_end_hour, 0)
        else {
            return Vec::new();
        };
        (self.config.working_start_hour..self.config.working_end_hour)
            .filter_map(|hour| self.candidate(day, hour, 0))
            .filter(|slot| slot.end <= working_end)
            .filter(|slot| self.is_free(slot, now, busy))
            .collect()
    }

    /// Candidate slot starting at `hour:minute` local time, before any filtering.
    pub fn candidate(&self, day: NaiveDate, hour: u32, minute: u32) -> Option<Slot> {
        let start = self.config.local_instant(day, hour, minute)?;
        Some(self.slot_at(start, day))
    }

    pub(crate) fn slot_at(&self, start: DateTime<Utc>, day: NaiveDate) -> Slot {
        let minutes = self.config.slot_minutes;
        Slot {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
            duration_minutes: minutes,
            day,
        }
    }

    /// Not yet started and clear of every busy interval.
    pub fn is_free(&self, slot: &Slot, now: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
        slot.start >= now && !busy.iter().any(|b| b.overlaps(slot.start, slot.end))
    }
}
