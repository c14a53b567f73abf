//! Obligation management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use studyplan_core::{Database, IdGenerator, ObligationRecord, UuidGenerator};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum ObligationAction {
    /// Add an obligation
    Add {
        /// Title
        title: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// List obligations, soonest due first
    List {
        /// Include completed obligations
        #[arg(long)]
        all: bool,
    },
    /// Mark an obligation completed
    Complete {
        /// Obligation ID
        id: String,
    },
}

pub fn run(action: ObligationAction, ctx: &Context) -> CliResult {
    let db = Database::open()?;

    match action {
        ObligationAction::Add { title, due } => {
            let due_date = due
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .map_err(|_| format!("invalid due date '{d}' (expected YYYY-MM-DD)"))
                })
                .transpose()?;
            let obligation = ObligationRecord {
                id: UuidGenerator.next_id(),
                user_id: ctx.user.clone(),
                title,
                due_date,
                completed: false,
                created_at: ctx.now,
            };
            db.add_obligation(&obligation)?;
            print_json(&obligation)
        }
        ObligationAction::List { all } => print_json(&db.list_obligations(&ctx.user, all)?),
        ObligationAction::Complete { id } => {
            if db.complete_obligation(&ctx.user, &id)? {
                println!("completed {id}");
                Ok(())
            } else {
                Err(format!("obligation not found: {id}").into())
            }
        }
    }
}
