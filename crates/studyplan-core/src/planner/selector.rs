//! Block selection across a planning horizon.
//!
//! Selection is two-phase:
//! 1. Round-robin over the days that have free slots, ascending, taking one
//!    slot per visit. This spreads blocks over the whole horizon instead of
//!    filling the first free days.
//! 2. Chronological backfill over every remaining slot until the target is
//!    met or the pool is exhausted.
//!
//! The round-robin phase is bounded at `2 × num_days` visits. Each visit
//! either takes a slot or finds its day exhausted, so the bound also
//! terminates when every day runs dry before the target is reached.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{Obligation, PlanningWindow, PlannerConfig, Slot, Spread, StudyBlockProposal, GENERAL_REVIEW};

/// `min(blocks_per_week × weeks, max_total_blocks)`.
pub fn target_block_count(spread: Spread, window: &PlanningWindow, config: &PlannerConfig) -> usize {
    let per_week = spread.blocks_per_week(&config.blocks_per_week);
    let wanted = per_week.saturating_mul(window.weeks());
    wanted.min(config.max_total_blocks) as usize
}

/// Chooses non-overlapping slots, spread over distinct days.
pub struct BlockSelector {
    target: usize,
}

impl BlockSelector {
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// Select up to `target` slots from `pool`.
    ///
    /// `pool` must be sorted by start time. The result is sorted by start
    /// time and contains no two overlapping slots.
    pub fn select(&self, pool: &[Slot]) -> Vec<Slot> {
        let mut used = vec![false; pool.len()];
        let mut chosen: Vec<usize> = Vec::new();

        self.round_robin(pool, &mut used, &mut chosen);
        let after_round_robin = chosen.len();
        self.backfill(pool, &mut used, &mut chosen);

        tracing::debug!(
            target = self.target,
            pool = pool.len(),
            round_robin = after_round_robin,
            backfilled = chosen.len() - after_round_robin,
            "selected study blocks"
        );

        let mut slots: Vec<Slot> = chosen.into_iter().map(|i| pool[i]).collect();
        slots.sort_by_key(|s| s.start);
        slots
    }

    /// Upper bound on round-robin visits for `num_days` candidate days.
    pub fn round_robin_limit(num_days: usize) -> usize {
        num_days.saturating_mul(2)
    }

    fn round_robin(&self, pool: &[Slot], used: &mut [bool], chosen: &mut Vec<usize>) {
        let mut by_day: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (i, slot) in pool.iter().enumerate() {
            by_day.entry(slot.day).or_default().push(i);
        }
        let days: Vec<&Vec<usize>> = by_day.values().collect();
        if days.is_empty() {
            return;
        }

        let limit = Self::round_robin_limit(days.len());
        let mut visits = 0;
        while chosen.len() < self.target && visits < limit {
            let day = days[visits % days.len()];
            if let Some(&i) = day
                .iter()
                .find(|&&i| !used[i] && !conflicts(pool, chosen, &pool[i]))
            {
                used[i] = true;
                chosen.push(i);
            }
            visits += 1;
        }
    }

    fn backfill(&self, pool: &[Slot], used: &mut [bool], chosen: &mut Vec<usize>) {
        for i in 0..pool.len() {
            if chosen.len() >= self.target {
                break;
            }
            if used[i] || conflicts(pool, chosen, &pool[i]) {
                continue;
            }
            used[i] = true;
            chosen.push(i);
        }
    }
}

fn conflicts(pool: &[Slot], chosen: &[usize], slot: &Slot) -> bool {
    chosen.iter().any(|&c| pool[c].conflicts_with(slot))
}

/// Label chosen slots by cycling through the ordered obligations.
///
/// `slots` are sorted by start time first. Without obligations every block
/// is a general review.
pub fn assign_topics(slots: &[Slot], obligations: &[Obligation]) -> Vec<StudyBlockProposal> {
    let mut ordered = slots.to_vec();
    ordered.sort_by_key(|s| s.start);
    ordered
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let topic = if obligations.is_empty() {
                GENERAL_REVIEW
            } else {
                obligations[i % obligations.len()].title.as_str()
            };
            StudyBlockProposal::new(format!("Study: {topic}"), slot.start, slot.end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testing::{at, busy, day, monday_morning, obligation};
    use crate::planner::SlotGenerator;
    use std::collections::HashSet;

    fn window(days: u32) -> PlanningWindow {
        PlanningWindow {
            today: day(0),
            horizon_days: days,
        }
    }

    #[test]
    fn target_count_scales_with_weeks() {
        let config = PlannerConfig::default();
        assert_eq!(target_block_count(Spread::Balanced, &window(7), &config), 4);
        assert_eq!(target_block_count(Spread::Light, &window(8), &config), 4);
        assert_eq!(target_block_count(Spread::Intensive, &window(21), &config), 18);
    }

    #[test]
    fn target_count_is_capped_at_thirty() {
        let config = PlannerConfig::default();
        assert_eq!(target_block_count(Spread::Intensive, &window(84), &config), 30);
        assert_eq!(target_block_count(Spread::Balanced, &window(84), &config), 30);
    }

    #[test]
    fn round_robin_picks_distinct_days_first() {
        let config = PlannerConfig::default();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 7, &[]);
        let chosen = BlockSelector::new(4).select(&pool);
        assert_eq!(chosen.len(), 4);
        let days: HashSet<_> = chosen.iter().map(|s| s.day).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(chosen[0].start, at(0, 8, 0));
        assert_eq!(chosen[3].start, at(3, 8, 0));
    }

    #[test]
    fn second_round_revisits_days_in_order() {
        let config = PlannerConfig::default();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 3, &[]);
        let chosen = BlockSelector::new(5).select(&pool);
        let starts: Vec<_> = chosen.iter().map(|s| s.start).collect();
        assert_eq!(
            starts,
            vec![at(0, 8, 0), at(0, 9, 0), at(1, 8, 0), at(1, 9, 0), at(2, 8, 0)]
        );
    }

    #[test]
    fn backfill_fills_when_days_run_out() {
        // Two usable days with five free hours each; target eight needs more
        // than the 2 × 2 round-robin visits can provide.
        let config = PlannerConfig::default();
        let busy_all: Vec<_> = (0..7)
            .flat_map(|d| {
                if d < 2 {
                    vec![busy(d, 13, 22)]
                } else {
                    vec![busy(d, 8, 22)]
                }
            })
            .collect();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 7, &busy_all);
        assert_eq!(pool.len(), 10);
        assert_eq!(BlockSelector::round_robin_limit(2), 4);

        let chosen = BlockSelector::new(8).select(&pool);
        assert_eq!(chosen.len(), 8);
        // Backfill is chronological: day 0 fills before day 1.
        let on_day0 = chosen.iter().filter(|s| s.day == day(0)).count();
        assert_eq!(on_day0, 5);
    }

    #[test]
    fn selection_stops_when_pool_is_exhausted() {
        let config = PlannerConfig::default();
        let busy_all: Vec<_> = (0..7).map(|d| busy(d, 8, 21)).collect();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 7, &busy_all);
        let chosen = BlockSelector::new(30).select(&pool);
        assert_eq!(chosen.len(), 7);
    }

    #[test]
    fn overlapping_candidates_are_never_both_chosen() {
        let config = PlannerConfig::default();
        let generator = SlotGenerator::new(&config);
        // Hand-built pool with half-hour staggered candidates on one day.
        let pool: Vec<Slot> = (0..6)
            .map(|i| generator.slot_at(at(0, 8, 0) + chrono::Duration::minutes(30 * i), day(0)))
            .collect();
        let chosen = BlockSelector::new(6).select(&pool);
        for (i, a) in chosen.iter().enumerate() {
            for b in &chosen[i + 1..] {
                assert!(!a.conflicts_with(b));
            }
        }
        assert_eq!(chosen.len(), 3);
    }

    #[test]
    fn topics_cycle_through_obligations() {
        let config = PlannerConfig::default();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 7, &[]);
        let chosen = BlockSelector::new(5).select(&pool);
        let obligations = vec![
            obligation("1", "Essay", Some(day(3))),
            obligation("2", "Lab report", None),
        ];
        let proposals = assign_topics(&chosen, &obligations);
        let titles: Vec<_> = proposals.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Study: Essay",
                "Study: Lab report",
                "Study: Essay",
                "Study: Lab report",
                "Study: Essay"
            ]
        );
    }

    #[test]
    fn topics_default_to_general_review() {
        let config = PlannerConfig::default();
        let pool = SlotGenerator::new(&config).generate(monday_morning(), day(0), 7, &[]);
        let proposals = assign_topics(&BlockSelector::new(3).select(&pool), &[]);
        assert!(proposals.iter().all(|p| p.title == "Study: General review"));
    }
}
