//! Planning commands: copilot messages, plans, reschedules and deadlines.

use chrono::NaiveDate;
use studyplan_core::{
    Copilot, CopilotRequest, Database, DeadlineRequest, RescheduleWindow, Spread, UuidGenerator,
};

use super::{print_json, CliResult, Context};

fn spread_or_default(ctx: &Context, spread: Option<&str>) -> Result<Spread, String> {
    match spread {
        Some(s) => s.parse(),
        None => Ok(ctx.config.planner.default_spread),
    }
}

pub fn ask(ctx: &Context, message: &str) -> CliResult {
    let db = Database::open()?;
    let ids = UuidGenerator;
    let request = CopilotRequest {
        user_id: Some(ctx.user.clone()),
        message: message.to_string(),
    };
    let reply = Copilot::new(&ctx.config.planner, &ids).handle(&db, &request, ctx.now)?;
    print_json(&reply)
}

pub fn plan(ctx: &Context, spread: Option<&str>) -> CliResult {
    let spread = spread_or_default(ctx, spread)?;
    let db = Database::open()?;
    let ids = UuidGenerator;
    let reply = Copilot::new(&ctx.config.planner, &ids).plan(&db, &ctx.user, spread, ctx.now)?;
    print_json(&reply)
}

pub fn reschedule(ctx: &Context, window: Option<&str>) -> CliResult {
    let db = Database::open()?;
    let ids = UuidGenerator;
    let copilot = Copilot::new(&ctx.config.planner, &ids);
    let reply = match window {
        Some(w) => {
            let window = RescheduleWindow::parse(w)?;
            copilot.reschedule_window(&db, &ctx.user, window, ctx.now)?
        }
        None => copilot.reschedule_next(&db, &ctx.user, ctx.now)?,
    };
    print_json(&reply)
}

pub fn deadline(ctx: &Context, date: &str, title: Option<String>, spread: Option<&str>) -> CliResult {
    let due_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{date}' (expected YYYY-MM-DD)"))?;
    let spread = spread_or_default(ctx, spread)?;
    let db = Database::open()?;
    let ids = UuidGenerator;
    let reply = Copilot::new(&ctx.config.planner, &ids).deadline(
        &db,
        &ctx.user,
        DeadlineRequest { due_date, title },
        spread,
        ctx.now,
    )?;
    print_json(&reply)
}
