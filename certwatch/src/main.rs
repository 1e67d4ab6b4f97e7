use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod calendar_sync;
mod commands;
mod config;
mod errors;
mod event_store;
mod google_calendar;
mod http_utils;
mod notifier;
mod orchestrator;
mod profile_parser;
mod service_account;

#[cfg(test)]
mod test_support;

use commands::{config::ConfigCommand, run::RunCommand, Command, CommandContext};
use config::Config;

#[derive(Parser)]
#[command(name = "certwatch", version)]
#[command(about = "Track provisioning profile expirations in Google Calendar and Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan profiles, sync calendar reminders and send notifications (default)
    Run {
        /// Only parse and print; no calendar, chat or state changes
        #[arg(long)]
        dry_run: bool,
        /// Scan this directory instead of the configured one
        #[arg(long, value_name = "DIR")]
        profiles_dir: Option<PathBuf>,
    },
    /// Get configuration values
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Show all configuration values
    #[arg(long)]
    all: bool,
    /// Project name
    #[arg(long)]
    project_name: bool,
    /// Project version
    #[arg(long)]
    project_version: bool,
    /// Path of the app -> calendar event mapping
    #[arg(long)]
    calendar_file: bool,
    /// Path of the Google service account key
    #[arg(long)]
    google_creds_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .await
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
                .unwrap_or_else(|_| format!("certwatch={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("certwatch {} starting", env!("CARGO_PKG_VERSION"));

    let context = CommandContext::new(config);

    let mut command: Box<dyn Command> = match cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        profiles_dir: None,
    }) {
        Commands::Run {
            dry_run,
            profiles_dir,
        } => Box::new(RunCommand {
            dry_run,
            profiles_dir,
        }),
        Commands::Config(args) => Box::new(ConfigCommand {
            all: args.all,
            project_name: args.project_name,
            project_version: args.project_version,
            calendar_file: args.calendar_file,
            google_creds_file: args.google_creds_file,
        }),
    };

    command.execute(&context).await
}
