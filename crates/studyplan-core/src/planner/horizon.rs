//! Planning horizon calculation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Obligation, PlannerConfig};

const SECONDS_PER_DAY: i64 = 86_400;

/// How far ahead a plan reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningWindow {
    /// Local date the horizon starts on
    pub today: NaiveDate,
    /// Number of days including today
    pub horizon_days: u32,
}

impl PlanningWindow {
    /// Number of (possibly partial) weeks the horizon spans.
    pub fn weeks(&self) -> u32 {
        self.horizon_days.div_ceil(7)
    }

    /// Local date of the last day in the horizon.
    pub fn last_day(&self) -> NaiveDate {
        self.today + chrono::Duration::days(i64::from(self.horizon_days.saturating_sub(1)))
    }
}

/// Derive the planning window from upcoming due dates.
///
/// Without any dated obligation the horizon is `min_planning_days`.
/// Otherwise it is the whole number of days (rounded up) until the start of
/// the furthest due date, clamped to `[min_planning_days, max_planning_days]`.
pub fn planning_window(
    obligations: &[Obligation],
    now: DateTime<Utc>,
    config: &PlannerConfig,
) -> PlanningWindow {
    let today = config.local_date(now);
    let furthest = obligations.iter().filter_map(|o| o.due_date).max();

    let horizon_days = match furthest {
        None => config.min_planning_days,
        Some(due) => {
            let raw = days_until(due, now, config);
            raw.clamp(config.min_planning_days, config.max_planning_days)
        }
    };

    tracing::debug!(%today, ?furthest, horizon_days, "computed planning window");
    PlanningWindow {
        today,
        horizon_days,
    }
}

/// Whole days, rounded up, from `now` to local midnight starting `due`.
/// Dates already reached count as zero.
fn days_until(due: NaiveDate, now: DateTime<Utc>, config: &PlannerConfig) -> u32 {
    let Some(due_start) = config.local_instant(due, 0, 0) else {
        return 0;
    };
    let seconds = (due_start - now).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testing::{day, monday_morning, obligation};

    #[test]
    fn no_due_dates_uses_minimum() {
        let config = PlannerConfig::default();
        let obligations = vec![obligation("a", "Reading", None)];
        let window = planning_window(&obligations, monday_morning(), &config);
        assert_eq!(window.horizon_days, 7);
        assert_eq!(window.today, day(0));
    }

    #[test]
    fn empty_obligations_uses_minimum() {
        let window = planning_window(&[], monday_morning(), &PlannerConfig::default());
        assert_eq!(window.horizon_days, 7);
    }

    #[test]
    fn near_due_date_is_clamped_up() {
        let obligations = vec![obligation("a", "Quiz", Some(day(2)))];
        let window = planning_window(&obligations, monday_morning(), &PlannerConfig::default());
        assert_eq!(window.horizon_days, 7);
    }

    #[test]
    fn past_due_date_is_clamped_up() {
        let obligations = vec![obligation("a", "Late lab", Some(day(-5)))];
        let window = planning_window(&obligations, monday_morning(), &PlannerConfig::default());
        assert_eq!(window.horizon_days, 7);
    }

    #[test]
    fn far_due_date_is_clamped_down() {
        let obligations = vec![obligation("a", "Thesis", Some(day(200)))];
        let window = planning_window(&obligations, monday_morning(), &PlannerConfig::default());
        assert_eq!(window.horizon_days, 84);
    }

    #[test]
    fn furthest_due_date_wins_and_rounds_up() {
        // 07:00 Monday to midnight starting day 20 is 19 days and 17 hours.
        let obligations = vec![
            obligation("a", "Essay", Some(day(10))),
            obligation("b", "Project", Some(day(20))),
            obligation("c", "Someday", None),
        ];
        let window = planning_window(&obligations, monday_morning(), &PlannerConfig::default());
        assert_eq!(window.horizon_days, 20);
        assert_eq!(window.weeks(), 3);
        assert_eq!(window.last_day(), day(19));
    }
}
