//! # Studyplan Core Library
//!
//! This library provides the core logic for the Studyplan student planner.
//! It follows a CLI-first layout: every operation is available through the
//! standalone `studyplan` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Planner**: Pure slot allocator. Computes free hourly slots against a
//!   busy-interval snapshot and selects study blocks spread over a horizon
//! - **Copilot**: Rule-based command router that turns messages into planner
//!   calls and stores the results as pending suggestions
//! - **Storage**: SQLite for obligations, events and suggestions, and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`plan_study_blocks`]: Full-horizon planning
//! - [`reschedule`]: Alternatives for one window or block
//! - [`Copilot`]: Message routing and proposal persistence
//! - [`Database`]: Suggestion store with exactly-once decisions
//! - [`Config`]: Application configuration management

pub mod copilot;
pub mod error;
pub mod planner;
pub mod schedule;
pub mod storage;

pub use copilot::{
    Copilot, CopilotCommand, CopilotReply, CopilotRequest, IdGenerator, PlannerStore,
    ProposalSink, SequentialIds, UuidGenerator,
};
pub use error::{ConfigError, CoreError, DatabaseError, SuggestionError, ValidationError};
pub use planner::{
    plan_for_deadline, plan_study_blocks, planning_window, reschedule, BusyInterval,
    DeadlineRequest, Obligation, PlanOutcome, PlannerConfig, PlanningWindow, RescheduleTarget,
    RescheduleWindow, Slot, SlotGenerator, Spread, StudyBlockProposal,
};
pub use schedule::{
    BlockPayload, CalendarEvent, EventOrigin, ObligationRecord, ProposalRecord, Suggestion,
    SuggestionKind, SuggestionStatus,
};
pub use storage::{Config, Database};
