//! Full-horizon and deadline planning.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    assign_topics, planning_window, target_block_count, BlockSelector, BusyInterval, Obligation,
    PlanOutcome, PlannerConfig, PlanningWindow, SlotGenerator, Spread, StudyBlockProposal,
    GENERAL_REVIEW,
};

/// Propose study blocks across the planning horizon.
///
/// # Arguments
/// * `now` - Current instant; no block starts before it
/// * `obligations` - Incomplete obligations, ordered by due date (undated last)
/// * `busy` - Busy intervals overlapping the horizon
/// * `spread` - Density tier
///
/// # Returns
/// `Planned` with at least `spread.min_blocks()` proposals, or `Unavailable`
/// with an explanation. A short plan is never returned.
pub fn plan_study_blocks(
    now: DateTime<Utc>,
    obligations: &[Obligation],
    busy: &[BusyInterval],
    spread: Spread,
    config: &PlannerConfig,
) -> PlanOutcome {
    let window = planning_window(obligations, now, config);
    let target = target_block_count(spread, &window, config);

    let pool = SlotGenerator::new(config).generate(now, window.today, window.horizon_days, busy);
    if pool.is_empty() {
        tracing::warn!(horizon_days = window.horizon_days, "no free slots in horizon");
        return PlanOutcome::unavailable(format!(
            "Not enough free time in the next {} days to plan study blocks. \
             Try clearing some events first.",
            window.horizon_days
        ));
    }

    let chosen = BlockSelector::new(target).select(&pool);
    if chosen.len() < spread.min_blocks() {
        tracing::warn!(
            found = chosen.len(),
            needed = spread.min_blocks(),
            %spread,
            "plan below minimum viable size"
        );
        return not_enough_for_spread(spread, chosen.len(), &window);
    }

    let proposals = assign_topics(&chosen, obligations);
    tracing::info!(
        proposals = proposals.len(),
        target,
        horizon_days = window.horizon_days,
        %spread,
        "planned study blocks"
    );
    PlanOutcome::Planned {
        reply: format!(
            "Proposed {} study blocks over the next {} days ({} spread). \
             Accept the ones that work for you.",
            proposals.len(),
            window.horizon_days,
            spread
        ),
        proposals,
    }
}

/// A single due date to plan towards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRequest {
    pub due_date: NaiveDate,
    /// Topic for every block; falls back to an obligation due that day
    pub title: Option<String>,
}

/// Propose study blocks on the days before one due date.
///
/// The horizon runs from today up to, but excluding, the due date and is
/// clamped to `[1, max_planning_days]`. Due dates on or before today are
/// rejected softly.
pub fn plan_for_deadline(
    now: DateTime<Utc>,
    request: &DeadlineRequest,
    obligations: &[Obligation],
    busy: &[BusyInterval],
    spread: Spread,
    config: &PlannerConfig,
) -> PlanOutcome {
    let today = config.local_date(now);
    let days_before = (request.due_date - today).num_days();
    if days_before <= 0 {
        tracing::warn!(due = %request.due_date, %today, "deadline is not in the future");
        return PlanOutcome::unavailable(format!(
            "The target date {} is invalid or already past. Pick a date after today.",
            request.due_date
        ));
    }

    let horizon_days = u32::try_from(days_before)
        .unwrap_or(u32::MAX)
        .clamp(1, config.max_planning_days);
    let window = PlanningWindow {
        today,
        horizon_days,
    };
    let target = target_block_count(spread, &window, config);

    let pool = SlotGenerator::new(config).generate(now, today, horizon_days, busy);
    let chosen = BlockSelector::new(target).select(&pool);
    if chosen.len() < spread.min_blocks() {
        tracing::warn!(found = chosen.len(), due = %request.due_date, "deadline plan below minimum");
        return not_enough_for_spread(spread, chosen.len(), &window);
    }

    let topic = request
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            obligations
                .iter()
                .find(|o| o.due_date == Some(request.due_date))
                .map(|o| o.title.clone())
        })
        .unwrap_or_else(|| GENERAL_REVIEW.to_string());

    let proposals: Vec<StudyBlockProposal> = chosen
        .iter()
        .map(|slot| StudyBlockProposal::new(format!("Study: {topic}"), slot.start, slot.end))
        .collect();

    tracing::info!(proposals = proposals.len(), due = %request.due_date, "planned deadline blocks");
    PlanOutcome::Planned {
        reply: format!(
            "Proposed {} study blocks for {} before {}.",
            proposals.len(),
            topic,
            request.due_date
        ),
        proposals,
    }
}

fn not_enough_for_spread(spread: Spread, found: usize, window: &PlanningWindow) -> PlanOutcome {
    PlanOutcome::unavailable(format!(
        "Not enough free time for a {} plan: found {} free block(s) in the next {} days \
         but need at least {}. Try a lighter spread or clear some events.",
        spread,
        found,
        window.horizon_days,
        spread.min_blocks()
    ))
}
