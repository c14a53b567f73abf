use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "studyplan", version, about = "Studyplan CLI")]
struct Cli {
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,

    /// Override the current time (RFC3339), for reproducible plans
    #[arg(long, global = true, hide = true)]
    now: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to the copilot (e.g. "/plan light")
    Ask {
        /// Message text
        message: Vec<String>,
    },
    /// Propose study blocks across upcoming due dates
    Plan {
        /// light, balanced or intensive (default from config)
        #[arg(long)]
        spread: Option<String>,
    },
    /// Propose alternatives for a window or the next study block
    Reschedule {
        /// Window as "YYYY-MM-DD HH:MM-HH:MM"
        #[arg(long)]
        window: Option<String>,
    },
    /// Propose study blocks before one due date
    Deadline {
        /// Due date (YYYY-MM-DD)
        date: String,
        /// Topic for the blocks
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        spread: Option<String>,
    },
    /// Obligation (task/assignment) management
    Obligation {
        #[command(subcommand)]
        action: commands::obligation::ObligationAction,
    },
    /// Calendar event management
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Review pending suggestions
    Suggestion {
        #[command(subcommand)]
        action: commands::suggestion::SuggestionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = dispatch(cli);

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> commands::CliResult {
    let ctx = Context::load(cli.user, cli.now.as_deref())?;

    match cli.command {
        Commands::Ask { message } => commands::plan::ask(&ctx, &message.join(" ")),
        Commands::Plan { spread } => commands::plan::plan(&ctx, spread.as_deref()),
        Commands::Reschedule { window } => commands::plan::reschedule(&ctx, window.as_deref()),
        Commands::Deadline {
            date,
            title,
            spread,
        } => commands::plan::deadline(&ctx, &date, title, spread.as_deref()),
        Commands::Obligation { action } => commands::obligation::run(action, &ctx),
        Commands::Event { action } => commands::event::run(action, &ctx),
        Commands::Suggestion { action } => commands::suggestion::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action),
    }
}
