//! Suggestion review commands for CLI.

use clap::Subcommand;
use studyplan_core::{Database, SuggestionStatus, UuidGenerator};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SuggestionAction {
    /// List suggestions
    List {
        /// Filter by status: pending, accepted or rejected
        #[arg(long)]
        status: Option<String>,
    },
    /// Accept a suggestion and add its block to the calendar
    Accept {
        /// Suggestion ID
        id: String,
    },
    /// Reject a suggestion
    Reject {
        /// Suggestion ID
        id: String,
    },
}

pub fn run(action: SuggestionAction, ctx: &Context) -> CliResult {
    let db = Database::open()?;

    match action {
        SuggestionAction::List { status } => {
            let status = status
                .map(|s| {
                    SuggestionStatus::parse(&s).ok_or_else(|| {
                        format!("unknown status '{s}' (expected pending, accepted or rejected)")
                    })
                })
                .transpose()?;
            print_json(&db.list_suggestions(&ctx.user, status)?)
        }
        SuggestionAction::Accept { id } => {
            let event = db.accept_suggestion(&ctx.user, &id, ctx.now, &UuidGenerator)?;
            print_json(&event)
        }
        SuggestionAction::Reject { id } => {
            let suggestion = db.reject_suggestion(&ctx.user, &id, ctx.now)?;
            print_json(&suggestion)
        }
    }
}
