use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    auth::AuthGoogleCommand,
    calendar::UpcomingCommand,
    schedule::{AppointmentCommand, ReminderCommand},
    Command, CommandContext,
};
use elderly_companion::{forms, Config};

#[derive(Parser)]
#[command(name = "elderly-companion")]
#[command(about = "Elderly Companion - appointments and medicine reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Load configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize access to Google Calendar and cache the token
    AuthGoogle,
    /// Schedule an appointment and invite the user
    Appointment {
        /// Address that receives the invite
        #[arg(long)]
        email: Option<String>,
        /// Appointment date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Appointment time (HH:MM)
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<NaiveTime>,
    },
    /// Set a medicine reminder and email it to the user
    Reminder {
        /// Name of the medicine to take
        #[arg(long)]
        medicine: Option<String>,
        /// Address the reminder is sent to
        #[arg(long)]
        email: Option<String>,
        /// Reminder date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Reminder time (HH:MM)
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<NaiveTime>,
    },
    /// List upcoming calendar events
    Upcoming,
    /// Print the location of the configuration file
    ConfigPath,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    forms::parse_date(raw).map_err(|e| e.to_string())
}

fn parse_time_arg(raw: &str) -> Result<NaiveTime, String> {
    forms::parse_time(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load_from(path).await,
        None => Config::load().await,
    }
    .context("Failed to load application configuration")?;

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("elderly_companion={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Elderly Companion starting up");

    let context = CommandContext::new(Arc::new(config), cli.debug);

    let mut command: Box<dyn Command> = match cli.command {
        Commands::AuthGoogle => Box::new(AuthGoogleCommand),
        Commands::Appointment { email, date, time } => {
            Box::new(AppointmentCommand { email, date, time })
        }
        Commands::Reminder {
            medicine,
            email,
            date,
            time,
        } => Box::new(ReminderCommand {
            medicine,
            email,
            date,
            time,
        }),
        Commands::Upcoming => Box::new(UpcomingCommand),
        Commands::ConfigPath => Box::new(ConfigPathCommand {
            explicit: cli.config.clone(),
        }),
    };

    command
        .execute(&context)
        .await
        .context("Failed to execute command")?;

    Ok(())
}

// Simple inline command for locating the config file
struct ConfigPathCommand {
    explicit: Option<PathBuf>,
}

#[async_trait::async_trait]
impl Command for ConfigPathCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        let path = match self.explicit.take() {
            Some(path) => path,
            None => Config::get_config_path()?,
        };
        println!("Config file: {}", path.display());
        println!("Client secret: {}", context.config.client_secret_path().display());
        println!("Token cache: {}", context.config.token_path().display());
        Ok(())
    }
}
