//! Calendar event commands for CLI.

use chrono::Duration;
use clap::Subcommand;
use studyplan_core::{CalendarEvent, Database, EventOrigin, IdGenerator, UuidGenerator};

use super::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a busy calendar event
    Add {
        /// Event title
        title: String,
        /// Start (YYYY-MM-DDTHH:MM local, or RFC3339)
        #[arg(long)]
        start: String,
        /// End (YYYY-MM-DDTHH:MM local, or RFC3339)
        #[arg(long)]
        end: String,
    },
    /// List events in the coming days
    List {
        /// Number of days to show
        #[arg(long, default_value = "7")]
        days: i64,
    },
    /// Delete an event
    Delete {
        /// Event ID
        id: String,
    },
}

pub fn run(action: EventAction, ctx: &Context) -> CliResult {
    let db = Database::open()?;

    match action {
        EventAction::Add { title, start, end } => {
            let event = CalendarEvent::new(
                UuidGenerator.next_id(),
                ctx.user.clone(),
                title,
                ctx.parse_time(&start)?,
                ctx.parse_time(&end)?,
                EventOrigin::Manual,
            )?;
            db.create_event(&event)?;
            print_json(&event)
        }
        EventAction::List { days } => {
            let until = Duration::try_days(days)
                .and_then(|span| ctx.now.checked_add_signed(span))
                .ok_or_else(|| format!("--days {days} is out of range"))?;
            let events = db.list_events(&ctx.user, ctx.now, until)?;
            print_json(&events)
        }
        EventAction::Delete { id } => {
            if db.delete_event(&ctx.user, &id)? {
                println!("deleted {id}");
                Ok(())
            } else {
                Err(format!("event not found: {id}").into())
            }
        }
    }
}
