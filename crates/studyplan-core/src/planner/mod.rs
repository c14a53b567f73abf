//! Study-block slot allocation.
//!
//! This module provides:
//! - Planning horizon calculation from upcoming due dates
//! - Hourly slot generation inside working hours, avoiding busy intervals
//! - Day-spreading block selection for full-horizon plans
//! - Alternative-slot search for rescheduling a single block
//!
//! Every entry point is a pure function of `(now, obligations, busy intervals,
//! parameters)`. Nothing here touches storage; persistence of the resulting
//! proposals belongs to [`crate::copilot`].

mod allocator;
mod horizon;
mod interval;
mod proposal;
mod reschedule;
mod selector;
mod slots;
mod spread;

pub use allocator::{plan_for_deadline, plan_study_blocks, DeadlineRequest};
pub use horizon::{planning_window, PlanningWindow};
pub use interval::{overlaps, BusyInterval};
pub use proposal::{Obligation, PlanOutcome, StudyBlockProposal, GENERAL_REVIEW};
pub use reschedule::{
    reschedule, RescheduleTarget, RescheduleWindow, WindowParseError,
};
pub use selector::{assign_topics, target_block_count, BlockSelector};
pub use slots::{Slot, SlotGenerator};
pub use spread::Spread;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Blocks-per-week targets for each spread tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksPerWeek {
    #[serde(default = "default_light")]
    pub light: u32,
    #[serde(default = "default_balanced")]
    pub balanced: u32,
    #[serde(default = "default_intensive")]
    pub intensive: u32,
}

/// Allocator tunables.
///
/// Serialized as the `[planner]` table of `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// First working hour (inclusive, local time)
    #[serde(default = "default_working_start")]
    pub working_start_hour: u32,
    /// Last working hour (exclusive, local time)
    #[serde(default = "default_working_end")]
    pub working_end_hour: u32,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_min_days")]
    pub min_planning_days: u32,
    #[serde(default = "default_max_days")]
    pub max_planning_days: u32,
    /// Hard ceiling on blocks per plan, whatever the spread or horizon
    #[serde(default = "default_max_total_blocks")]
    pub max_total_blocks: u32,
    #[serde(default = "default_max_alternatives")]
    pub max_reschedule_alternatives: u32,
    #[serde(default = "default_min_alternatives")]
    pub min_reschedule_alternatives: u32,
    #[serde(default = "default_lookahead")]
    pub reschedule_lookahead_days: u32,
    /// How many obligations are read per planning call
    #[serde(default = "default_obligation_limit")]
    pub obligation_limit: u32,
    /// Offset of the user's wall clock from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub default_spread: Spread,
    #[serde(default)]
    pub blocks_per_week: BlocksPerWeek,
}

fn default_light() -> u32 {
    2
}
fn default_balanced() -> u32 {
    4
}
fn default_intensive() -> u32 {
    6
}
fn default_working_start() -> u32 {
    8
}
fn default_working_end() -> u32 {
    22
}
fn default_slot_minutes() -> u32 {
    60
}
fn default_min_days() -> u32 {
    7
}
fn default_max_days() -> u32 {
    84
}
fn default_max_total_blocks() -> u32 {
    30
}
fn default_max_alternatives() -> u32 {
    5
}
fn default_min_alternatives() -> u32 {
    2
}
fn default_lookahead() -> u32 {
    7
}
fn default_obligation_limit() -> u32 {
    20
}

impl Default for BlocksPerWeek {
    fn default() -> Self {
        Self {
            light: default_light(),
            balanced: default_balanced(),
            intensive: default_intensive(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            working_start_hour: default_working_start(),
            working_end_hour: default_working_end(),
            slot_minutes: default_slot_minutes(),
            min_planning_days: default_min_days(),
            max_planning_days: default_max_days(),
            max_total_blocks: default_max_total_blocks(),
            max_reschedule_alternatives: default_max_alternatives(),
            min_reschedule_alternatives: default_min_alternatives(),
            reschedule_lookahead_days: default_lookahead(),
            obligation_limit: default_obligation_limit(),
            utc_offset_minutes: 0,
            default_spread: Spread::default(),
            blocks_per_week: BlocksPerWeek::default(),
        }
    }
}

impl PlannerConfig {
    /// Check that the tunables describe a usable planner.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: format!("planner.{key}"),
            message: message.to_string(),
        };

        if self.working_end_hour > 24 {
            return Err(invalid("working_end_hour", "must be at most 24"));
        }
        if self.working_start_hour >= self.working_end_hour {
            return Err(invalid(
                "working_start_hour",
                "must be earlier than working_end_hour",
            ));
        }
        if self.slot_minutes == 0 {
            return Err(invalid("slot_minutes", "must be positive"));
        }
        if self.slot_minutes > (self.working_end_hour - self.working_start_hour) * 60 {
            return Err(invalid("slot_minutes", "does not fit inside working hours"));
        }
        if self.min_planning_days == 0 {
            return Err(invalid("min_planning_days", "must be positive"));
        }
        if self.min_planning_days > self.max_planning_days {
            return Err(invalid(
                "min_planning_days",
                "must not exceed max_planning_days",
            ));
        }
        if self.min_reschedule_alternatives > self.max_reschedule_alternatives {
            return Err(invalid(
                "min_reschedule_alternatives",
                "must not exceed max_reschedule_alternatives",
            ));
        }
        for spread in [Spread::Light, Spread::Balanced, Spread::Intensive] {
            let per_week = spread.blocks_per_week(&self.blocks_per_week) as usize;
            if per_week < spread.min_blocks() {
                return Err(ConfigError::InvalidValue {
                    key: format!("planner.blocks_per_week.{spread}"),
                    message: format!("must be at least {}", spread.min_blocks()),
                });
            }
        }
        let largest_minimum = [Spread::Light, Spread::Balanced, Spread::Intensive]
            .iter()
            .map(Spread::min_blocks)
            .max()
            .unwrap_or(0);
        if (self.max_total_blocks as usize) < largest_minimum {
            return Err(ConfigError::InvalidValue {
                key: "planner.max_total_blocks".to_string(),
                message: format!("must be at least {largest_minimum}"),
            });
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(invalid("utc_offset_minutes", "must be within +/-23:59"));
        }
        Ok(())
    }

    /// The user's wall-clock offset.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Local calendar date of `now`.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset()).date_naive()
    }

    /// Instant at `hour:minute` local time on `date`.
    ///
    /// `hour == 24` is accepted and means midnight at the end of `date`.
    pub fn local_instant(&self, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
        let (date, hour) = if hour == 24 {
            (date.succ_opt()?, 0)
        } else {
            (date, hour)
        };
        let naive = date.and_hms_opt(hour, minute, 0)?;
        self.offset()
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
