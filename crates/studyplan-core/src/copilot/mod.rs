//! Copilot command handling.
//!
//! Routes a text message to the planner, reads one consistent snapshot of
//! obligations and busy intervals from a [`PlannerStore`], and writes the
//! resulting proposals through a [`ProposalSink`]. Planning never edits the
//! calendar; a proposal only becomes an event when a human accepts it.

mod command;
mod ids;

pub use command::{CopilotCommand, HELP_TEXT};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::planner::{
    plan_for_deadline, plan_study_blocks, planning_window, reschedule, BusyInterval,
    DeadlineRequest, Obligation, PlanOutcome, PlannerConfig, RescheduleTarget, RescheduleWindow,
    Spread, StudyBlockProposal,
};
use crate::schedule::{
    BlockPayload, CalendarEvent, ProposalRecord, Suggestion, SuggestionKind,
};

/// Read side of the planner's collaborators.
pub trait PlannerStore {
    /// Incomplete obligations, due date ascending with undated last.
    fn obligations(&self, user_id: &str, limit: usize) -> Result<Vec<Obligation>>;

    /// Busy intervals of events overlapping `[from, to)`.
    fn busy_intervals(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>>;

    /// The next event created from a suggestion that has not started yet.
    fn next_suggested_block(&self, user_id: &str, now: DateTime<Utc>)
        -> Result<Option<CalendarEvent>>;
}

/// Write side: persists proposals as pending suggestions.
pub trait ProposalSink {
    fn insert_proposals(
        &self,
        user_id: &str,
        records: &[ProposalRecord],
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>>;
}

/// One message sent to the copilot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopilotRequest {
    pub user_id: Option<String>,
    pub message: String,
}

/// What the caller shows the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopilotReply {
    pub reply: String,
    pub proposals: Vec<Suggestion>,
}

impl CopilotReply {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            proposals: Vec::new(),
        }
    }
}

const USAGE_NO_USER: &str = "Usage: a user id is required to plan. Sign in or pass --user.";

/// Trimmed user id, or `None` when there is no usable one.
fn signed_in(user_id: Option<&str>) -> Option<&str> {
    user_id.map(str::trim).filter(|u| !u.is_empty())
}

/// Rule-based copilot over the study planner.
pub struct Copilot<'a> {
    config: &'a PlannerConfig,
    ids: &'a dyn IdGenerator,
}

impl<'a> Copilot<'a> {
    pub fn new(config: &'a PlannerConfig, ids: &'a dyn IdGenerator) -> Self {
        Self { config, ids }
    }

    /// Route and handle one message.
    ///
    /// Soft failures (no free time, bad dates, nothing to reschedule) come
    /// back as `Ok` replies without proposals.
    ///
    /// # Errors
    /// Returns an error only if reading the snapshot or writing proposals fails.
    pub fn handle<S>(&self, store: &S, request: &CopilotRequest, now: DateTime<Utc>) -> Result<CopilotReply>
    where
        S: PlannerStore + ProposalSink,
    {
        let Some(user_id) = signed_in(request.user_id.as_deref()) else {
            return Ok(CopilotReply::text(USAGE_NO_USER));
        };

        let command = CopilotCommand::parse(&request.message);
        tracing::debug!(user_id, ?command, "routing copilot message");
        match command {
            CopilotCommand::Plan { spread } => {
                self.plan(store, user_id, spread.unwrap_or(self.config.default_spread), now)
            }
            CopilotCommand::Reschedule { window: None } => self.reschedule_next(store, user_id, now),
            CopilotCommand::Reschedule {
                window: Some(Ok(window)),
            } => self.reschedule_window(store, user_id, window, now),
            CopilotCommand::Reschedule {
                window: Some(Err(err)),
            } => {
                tracing::warn!(%err, "rejected reschedule window");
                Ok(CopilotReply::text(format!(
                    "I couldn't read that window ({err}). \
                     Use /reschedule YYYY-MM-DD HH:MM-HH:MM, or /reschedule alone to move your next study block."
                )))
            }
            CopilotCommand::Deadline {
                due_date: Ok(due_date),
                title,
            } => self.deadline(
                store,
                user_id,
                DeadlineRequest { due_date, title },
                self.config.default_spread,
                now,
            ),
            CopilotCommand::Deadline {
                due_date: Err(reason),
                ..
            } => Ok(CopilotReply::text(format!(
                "The target date is invalid or past ({reason}). Use /deadline YYYY-MM-DD [title]."
            ))),
            CopilotCommand::Help => Ok(CopilotReply::text(HELP_TEXT)),
            CopilotCommand::Unknown { .. } => Ok(CopilotReply::text(format!(
                "I can help you plan study time.\n{HELP_TEXT}"
            ))),
        }
    }

    /// Propose blocks across the planning horizon.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn plan<S>(&self, store: &S, user_id: &str, spread: Spread, now: DateTime<Utc>) -> Result<CopilotReply>
    where
        S: PlannerStore + ProposalSink,
    {
        let Some(user_id) = signed_in(Some(user_id)) else {
            return Ok(CopilotReply::text(USAGE_NO_USER));
        };
        let obligations = store.obligations(user_id, self.config.obligation_limit as usize)?;
        let window = planning_window(&obligations, now, self.config);
        let busy = self.busy_between(store, user_id, window.today, window.horizon_days)?;
        let outcome = plan_study_blocks(now, &obligations, &busy, spread, self.config);
        self.persist(store, user_id, outcome, now)
    }

    /// Propose blocks before one due date.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn deadline<S>(
        &self,
        store: &S,
        user_id: &str,
        request: DeadlineRequest,
        spread: Spread,
        now: DateTime<Utc>,
    ) -> Result<CopilotReply>
    where
        S: PlannerStore + ProposalSink,
    {
        let Some(user_id) = signed_in(Some(user_id)) else {
            return Ok(CopilotReply::text(USAGE_NO_USER));
        };
        let obligations = store.obligations(user_id, self.config.obligation_limit as usize)?;
        let today = self.config.local_date(now);
        let days = u32::try_from((request.due_date - today).num_days().max(0)).unwrap_or(0);
        let busy = self.busy_between(store, user_id, today, days)?;
        let outcome = plan_for_deadline(now, &request, &obligations, &busy, spread, self.config);
        self.persist(store, user_id, outcome, now)
    }

    /// Alternatives for an explicit window.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn reschedule_window<S>(
        &self,
        store: &S,
        user_id: &str,
        window: RescheduleWindow,
        now: DateTime<Utc>,
    ) -> Result<CopilotReply>
    where
        S: PlannerStore + ProposalSink,
    {
        let Some(user_id) = signed_in(Some(user_id)) else {
            return Ok(CopilotReply::text(USAGE_NO_USER));
        };
        let busy = self.reschedule_busy(store, user_id, Some(window.date), now)?;
        let outcome = reschedule(now, &RescheduleTarget::Window(window), &busy, self.config);
        self.persist(store, user_id, outcome, now)
    }

    /// Alternatives for the next upcoming block created from a suggestion.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn reschedule_next<S>(&self, store: &S, user_id: &str, now: DateTime<Utc>) -> Result<CopilotReply>
    where
        S: PlannerStore + ProposalSink,
    {
        let Some(user_id) = signed_in(Some(user_id)) else {
            return Ok(CopilotReply::text(USAGE_NO_USER));
        };
        let Some(block) = store.next_suggested_block(user_id, now)? else {
            tracing::warn!(user_id, "no upcoming study block to reschedule");
            return Ok(CopilotReply::text(
                "I couldn't find an upcoming study block to reschedule. \
                 Use /reschedule YYYY-MM-DD HH:MM-HH:MM to pick a window instead.",
            ));
        };
        let busy = self.reschedule_busy(store, user_id, None, now)?;
        let target = RescheduleTarget::Block {
            title: block.title,
            start: block.start,
            end: block.end,
        };
        let outcome = reschedule(now, &target, &busy, self.config);
        self.persist(store, user_id, outcome, now)
    }

    fn reschedule_busy<S: PlannerStore>(
        &self,
        store: &S,
        user_id: &str,
        window_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        let today = self.config.local_date(now);
        let mut days = self.config.reschedule_lookahead_days;
        if let Some(date) = window_date {
            let until = u32::try_from((date - today).num_days() + 1).unwrap_or(0);
            days = days.max(until);
        }
        self.busy_between(store, user_id, today, days)
    }

    fn busy_between<S: PlannerStore>(
        &self,
        store: &S,
        user_id: &str,
        first_day: NaiveDate,
        days: u32,
    ) -> Result<Vec<BusyInterval>> {
        let from = self
            .config
            .local_instant(first_day, 0, 0)
            .unwrap_or_else(|| first_day.and_time(chrono::NaiveTime::MIN).and_utc());
        let to = from + Duration::days(i64::from(days.max(1)));
        store.busy_intervals(user_id, from, to)
    }

    fn persist<S: ProposalSink>(
        &self,
        store: &S,
        user_id: &str,
        outcome: PlanOutcome,
        now: DateTime<Utc>,
    ) -> Result<CopilotReply> {
        let (reply, proposals) = outcome.into_parts();
        if proposals.is_empty() {
            return Ok(CopilotReply::text(reply));
        }
        let records: Vec<ProposalRecord> = proposals
            .iter()
            .map(|p| self.record_for(p))
            .collect();
        let suggestions = store.insert_proposals(user_id, &records, now)?;
        tracing::info!(user_id, count = suggestions.len(), "stored study block suggestions");
        Ok(CopilotReply {
            reply,
            proposals: suggestions,
        })
    }

    fn record_for(&self, proposal: &StudyBlockProposal) -> ProposalRecord {
        ProposalRecord {
            id: self.ids.next_id(),
            kind: SuggestionKind::CreateCalendarBlock,
            label: proposal.label(self.config.offset()),
            payload: BlockPayload {
                title: proposal.title.clone(),
                start: proposal.start,
                end: proposal.end,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{EventOrigin, SuggestionStatus};
    use chrono::TimeZone;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStore {
        obligations: Vec<Obligation>,
        events: Vec<CalendarEvent>,
        suggestions: RefCell<Vec<Suggestion>>,
        fail_writes: bool,
    }

    impl PlannerStore for MemoryStore {
        fn obligations(&self, _user_id: &str, limit: usize) -> Result<Vec<Obligation>> {
            Ok(self.obligations.iter().take(limit).cloned().collect())
        }

        fn busy_intervals(
            &self,
            _user_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<BusyInterval>> {
            Ok(self
                .events
                .iter()
                .filter(|e| e.start < to && e.end > from)
                .map(CalendarEvent::busy_interval)
                .collect())
        }

        fn next_suggested_block(
            &self,
            _user_id: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<CalendarEvent>> {
            Ok(self
                .events
                .iter()
                .filter(|e| e.origin == EventOrigin::Suggestion && e.start >= now)
                .min_by_key(|e| e.start)
                .cloned())
        }
    }

    impl ProposalSink for MemoryStore {
        fn insert_proposals(
            &self,
            user_id: &str,
            records: &[ProposalRecord],
            created_at: DateTime<Utc>,
        ) -> Result<Vec<Suggestion>> {
            if self.fail_writes {
                return Err(crate::error::DatabaseError::Locked.into());
            }
            let stored: Vec<Suggestion> = records
                .iter()
                .map(|r| Suggestion::from_record(user_id, r, created_at))
                .collect();
            self.suggestions.borrow_mut().extend(stored.iter().cloned());
            Ok(stored)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()
    }

    fn request(message: &str) -> CopilotRequest {
        CopilotRequest {
            user_id: Some("student".into()),
            message: message.into(),
        }
    }

    #[test]
    fn plan_writes_pending_suggestions_with_injected_ids() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let reply = Copilot::new(&config, &ids)
            .handle(&store, &request("/plan"), now())
            .unwrap();

        assert_eq!(reply.proposals.len(), 4);
        let ids: Vec<_> = reply.proposals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s-1", "s-2", "s-3", "s-4"]);
        assert!(reply
            .proposals
            .iter()
            .all(|s| s.status == SuggestionStatus::Pending
                && s.kind == SuggestionKind::CreateCalendarBlock));
        assert_eq!(store.suggestions.borrow().len(), 4);
        assert!(reply.reply.contains("Proposed 4 study blocks"));
    }

    #[test]
    fn blank_user_is_refused_by_every_entry_point() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let copilot = Copilot::new(&config, &ids);
        let window = RescheduleWindow::parse("2026-10-21 14:00-16:00").unwrap();
        let deadline = DeadlineRequest {
            due_date: NaiveDate::from_ymd_opt(2026, 10, 23).unwrap(),
            title: None,
        };

        let replies = vec![
            copilot.plan(&store, "", Spread::Balanced, now()).unwrap(),
            copilot
                .deadline(&store, "  ", deadline, Spread::Balanced, now())
                .unwrap(),
            copilot.reschedule_window(&store, "", window, now()).unwrap(),
            copilot.reschedule_next(&store, "\t", now()).unwrap(),
        ];
        for reply in replies {
            assert!(reply.reply.starts_with("Usage:"));
            assert!(reply.proposals.is_empty());
        }
        assert!(store.suggestions.borrow().is_empty());
    }

    #[test]
    fn missing_user_gets_usage_message() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let reply = Copilot::new(&config, &ids)
            .handle(
                &store,
                &CopilotRequest {
                    user_id: None,
                    message: "/plan".into(),
                },
                now(),
            )
            .unwrap();
        assert!(reply.reply.starts_with("Usage:"));
        assert!(reply.proposals.is_empty());
        assert!(store.suggestions.borrow().is_empty());
    }

    #[test]
    fn malformed_window_is_rejected_explicitly() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let reply = Copilot::new(&config, &ids)
            .handle(&store, &request("/reschedule 2026-10-20 2pm-4pm"), now())
            .unwrap();
        assert!(reply.reply.contains("couldn't read that window"));
        assert!(reply.proposals.is_empty());
    }

    #[test]
    fn reschedule_without_target_is_soft_failure() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let reply = Copilot::new(&config, &ids)
            .handle(&store, &request("/reschedule"), now())
            .unwrap();
        assert!(reply.reply.contains("couldn't find an upcoming study block"));
        assert!(reply.proposals.is_empty());
    }

    #[test]
    fn reschedule_moves_next_suggested_block() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let block = CalendarEvent::new(
            "e-1".into(),
            "student".into(),
            "Study: Essay".into(),
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
            EventOrigin::Suggestion,
        )
        .unwrap();
        let store = MemoryStore {
            events: vec![block],
            ..MemoryStore::default()
        };
        let reply = Copilot::new(&config, &ids)
            .handle(&store, &request("/reschedule"), now())
            .unwrap();
        assert_eq!(reply.proposals.len(), 5);
        assert_eq!(
            reply.proposals[0].payload.start,
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
        );
        assert!(reply.proposals.iter().all(|s| s.payload.title == "Study: Essay"));
    }

    #[test]
    fn storage_failure_propagates() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let result = Copilot::new(&config, &ids).handle(&store, &request("/plan light"), now());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_message_lists_commands() {
        let config = PlannerConfig::default();
        let ids = SequentialIds::new("s");
        let store = MemoryStore::default();
        let reply = Copilot::new(&config, &ids)
            .handle(&store, &request("make me a quiz"), now())
            .unwrap();
        assert!(reply.reply.contains("/plan"));
    }
}
