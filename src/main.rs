// plannercal command line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use plannercal::calendar::validate_ics_url_format;
use plannercal::config::{parse_timezone, AppConfig};
use plannercal::sync::{spawn_sync_loop, TASK_ID};
use plannercal::utils::logging;
use plannercal::{AppState, User, ViewWindow};

#[derive(Parser)]
#[command(name = "plannercal")]
#[command(about = "Unified calendar views and external ICS feed import")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass over all enabled external calendars
    Sync,

    /// Sync external calendars periodically until interrupted
    Daemon,

    /// Print a user's calendar view as JSON
    View {
        /// User id
        #[arg(short, long)]
        user: i64,

        /// First day of the view (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// Day after the last day of the view (YYYY-MM-DD)
        #[arg(short, long)]
        end: String,

        /// Time zone, defaults to PLANNERCAL_TIMEZONE
        #[arg(long)]
        tz: Option<String>,
    },

    /// Manage external calendar feeds
    Calendar {
        #[command(subcommand)]
        action: CalendarCommands,
    },
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Add an ICS feed
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        url: String,
    },

    /// List configured feeds
    List,

    /// Include a feed in syncs and views again
    Enable { id: i64 },

    /// Exclude a feed from syncs and views
    Disable { id: i64 },
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    match cli.command {
        Commands::Sync => {
            let summary = state.syncer.sync_calendars(&state.shutdown).await?;
            println!(
                "Synced {} calendars, {} events stored",
                summary.calendars_synced(),
                summary.events_stored()
            );
        }
        Commands::Daemon => {
            if let Some(last) = state.db.get_last_completion(TASK_ID).await? {
                info!("Last completed calendar sync: {}", last);
            }

            let handle = spawn_sync_loop(state.syncer.clone(), state.config.sync_interval, state.shutdown.clone());

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
            state.shutdown.cancel();
            handle.await.context("Sync loop panicked")?;
        }
        Commands::View { user, start, end, tz } => {
            let tz = match tz {
                Some(name) => parse_timezone(&name)?,
                None => state.config.timezone,
            };
            let window = ViewWindow::parse(&start, &end, tz, state.config.max_view_days)?;
            let view = state
                .view_builder()
                .build_window(&User::new(user, format!("user-{}", user)), &window)
                .await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Calendar { action } => match action {
            CalendarCommands::Add { name, url } => {
                validate_ics_url_format(&url)?;
                let id = state.db.add_external_calendar(&name, &url).await?;
                println!("Added calendar {} ({})", id, name);
            }
            CalendarCommands::List => {
                for calendar in state.db.get_external_calendars().await? {
                    let synced = calendar
                        .last_synced_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "{}\t{}\t{}\t{}\tlast synced {}",
                        calendar.id,
                        if calendar.enabled { "enabled" } else { "disabled" },
                        calendar.name,
                        calendar.url,
                        synced
                    );
                }
            }
            CalendarCommands::Enable { id } => {
                state.db.set_external_calendar_enabled(id, true).await?;
                println!("Enabled calendar {}", id);
            }
            CalendarCommands::Disable { id } => {
                state.db.set_external_calendar_enabled(id, false).await?;
                println!("Disabled calendar {}", id);
            }
        },
    }

    Ok(())
}
