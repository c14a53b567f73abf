pub mod config;
pub mod event;
pub mod obligation;
pub mod plan;
pub mod suggestion;

use chrono::{DateTime, NaiveDateTime, Utc};
use studyplan_core::Config;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Per-invocation settings shared by every command.
pub struct Context {
    pub user: String,
    pub config: Config,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn load(user: Option<String>, now: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load_or_default();
        let user = user.unwrap_or_else(|| config.user_id.clone());
        let now = match now {
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map_err(|e| format!("invalid --now '{s}': {e}"))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        tracing::debug!(user = %user, %now, "loaded cli context");
        Ok(Self { user, config, now })
    }

    /// Parse a timestamp given either as RFC3339 or as local `YYYY-MM-DDTHH:MM`.
    pub fn parse_time(&self, s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
            .map_err(|_| format!("invalid time '{s}' (expected YYYY-MM-DDTHH:MM or RFC3339)"))?;
        naive
            .and_local_timezone(self.config.planner.offset())
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| format!("ambiguous local time '{s}'"))
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
