//! Rule-based parsing of copilot messages.
//!
//! Slash commands are matched on their first word. Free text falls back to
//! keyword rules, so "can you plan my week, intensive" still routes to a plan.

use chrono::NaiveDate;

use crate::planner::{RescheduleWindow, Spread, WindowParseError};

pub const HELP_TEXT: &str = "Commands:\n  \
/plan [light|balanced|intensive]  propose study blocks across your upcoming due dates\n  \
/reschedule [YYYY-MM-DD HH:MM-HH:MM]  find alternatives for a window or your next study block\n  \
/deadline YYYY-MM-DD [title]  plan study blocks before one due date\n  \
/help  show this message";

/// A routed copilot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopilotCommand {
    Plan {
        spread: Option<Spread>,
    },
    Reschedule {
        window: Option<Result<RescheduleWindow, WindowParseError>>,
    },
    Deadline {
        due_date: Result<NaiveDate, String>,
        title: Option<String>,
    },
    Help,
    Unknown {
        text: String,
    },
}

impl CopilotCommand {
    pub fn parse(message: &str) -> Self {
        let message = message.trim();
        if let Some(rest) = message.strip_prefix('/') {
            let (word, args) = match rest.split_once(char::is_whitespace) {
                Some((word, args)) => (word, args.trim()),
                None => (rest, ""),
            };
            return match word.to_ascii_lowercase().as_str() {
                "plan" => Self::Plan {
                    spread: find_spread(args),
                },
                "reschedule" | "move" => Self::reschedule(args),
                "deadline" | "due" => Self::deadline(args),
                "help" => Self::Help,
                _ => Self::Unknown {
                    text: message.to_string(),
                },
            };
        }
        Self::from_keywords(message)
    }

    fn from_keywords(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        let has = |word: &str| lower.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == word);

        if has("reschedule") || has("move") {
            return Self::Reschedule { window: None };
        }
        if has("deadline") {
            let date = lower
                .split_whitespace()
                .find_map(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok());
            return Self::Deadline {
                due_date: date.ok_or_else(|| "no date given".to_string()),
                title: None,
            };
        }
        if has("plan") || has("schedule") || has("study") {
            return Self::Plan {
                spread: find_spread(&lower),
            };
        }
        if has("help") || lower.is_empty() {
            return Self::Help;
        }
        Self::Unknown {
            text: message.to_string(),
        }
    }

    fn reschedule(args: &str) -> Self {
        let window = if args.is_empty() {
            None
        } else {
            Some(RescheduleWindow::parse(args))
        };
        Self::Reschedule { window }
    }

    fn deadline(args: &str) -> Self {
        let (date, title) = match args.split_once(char::is_whitespace) {
            Some((date, title)) => (date, Some(title.trim().to_string())),
            None => (args, None),
        };
        let due_date = if date.is_empty() {
            Err("no date given".to_string())
        } else {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| format!("invalid date '{date}'"))
        };
        Self::Deadline {
            due_date,
            title: title.filter(|t| !t.is_empty()),
        }
    }
}

fn find_spread(text: &str) -> Option<Spread> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|w| w.parse::<Spread>().ok())
}
