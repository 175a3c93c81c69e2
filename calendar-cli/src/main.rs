mod dates;

use anyhow::{Context, Result};
use bridge_traits::LogLevel;
use clap::{Parser, Subcommand};
use core_auth::StaticTokenSource;
use core_calendar::{CalendarError, CalendarEvent, EventInput};
use core_runtime::config::{CoreConfig, StoreSettings};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{bootstrap_desktop, CalendarCommands};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "calendar")]
#[command(about = "List, add, and remove events in the calendar stored on your OneDrive")]
struct Cli {
    /// OneDrive access token (Files.ReadWrite scope)
    #[arg(long, env = "ONEDRIVE_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// Log output format: pretty, json, or compact
    #[arg(long, env = "CALENDAR_LOG_FORMAT", default_value = "compact", value_parser = parse_log_format)]
    log_format: LogFormat,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all events, sorted by date
    List {
        /// Print the events as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an event
    Add {
        /// Event title
        title: String,

        /// Date or date-time (e.g. "2024-01-10", "2024-01-10T09:00", or RFC 3339)
        #[arg(short, long)]
        date: String,

        /// Event description
        #[arg(long)]
        description: Option<String>,

        /// Client-generated id; reuse it when retrying to avoid duplicates
        #[arg(long)]
        id: Option<String>,
    },
    /// Remove an event by id
    Remove {
        /// Event id as shown by `list`
        id: String,
    },
}

fn parse_log_format(raw: &str) -> std::result::Result<LogFormat, String> {
    LogFormat::parse(raw).ok_or_else(|| format!("unknown log format '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LogLevel::Warn,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(cli.log_format)
            .with_level(level)
            .with_spans(cli.verbose > 0),
    )
    .context("Failed to initialize logging")?;

    let settings = StoreSettings::from_env().context("Invalid calendar settings")?;
    let config = CoreConfig::builder()
        .store_settings(settings)
        .build()
        .context("Failed to configure the calendar core")?;
    let calendar = bootstrap_desktop(config, Arc::new(StaticTokenSource::new(cli.token)))?;

    let outcome = match cli.command {
        Commands::List { json } => cmd_list(&calendar, json).await,
        Commands::Add {
            title,
            date,
            description,
            id,
        } => cmd_add(&calendar, title, &date, description, id).await,
        Commands::Remove { id } => cmd_remove(&calendar, &id).await,
    };

    outcome.map_err(explain)
}

/// Prefix calendar errors with the copy meant for end users.
fn explain(error: anyhow::Error) -> anyhow::Error {
    match error.downcast_ref::<CalendarError>() {
        Some(calendar) => {
            let hint = calendar.user_message();
            error.context(hint)
        }
        None => error,
    }
}

async fn cmd_list(calendar: &dyn CalendarCommands, json: bool) -> Result<()> {
    let mut events = calendar.list_events().await?;
    events.sort_by(|a, b| a.date.cmp(&b.date));

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }

    for event in &events {
        println!("{}", render(event));
    }
    Ok(())
}

async fn cmd_add(
    calendar: &dyn CalendarCommands,
    title: String,
    date: &str,
    description: Option<String>,
    id: Option<String>,
) -> Result<()> {
    let date = dates::parse(date)?;

    let mut input = EventInput::new(title, date);
    if let Some(description) = description {
        input = input.with_description(description);
    }
    if let Some(id) = id {
        input = input.with_id(id);
    }

    let created = calendar.create_event(input).await?;
    println!("Added {}", render(&created));
    Ok(())
}

async fn cmd_remove(calendar: &dyn CalendarCommands, id: &str) -> Result<()> {
    calendar.delete_event(id).await?;
    println!("Removed {}", id);
    Ok(())
}

fn render(event: &CalendarEvent) -> String {
    let mut line = format!(
        "{}  {}  {}",
        event.date.instant().format("%Y-%m-%d %H:%M"),
        event.title,
        event.id
    );
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!("\n    {}", description));
    }
    line
}
