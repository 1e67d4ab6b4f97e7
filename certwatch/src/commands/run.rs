use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Command, CommandContext};
use crate::calendar_sync::CalendarSync;
use crate::config::Config;
use crate::event_store::EventStore;
use crate::google_calendar::GoogleCalendarService;
use crate::http_utils::build_client;
use crate::notifier::{ChatApi, Notifier, TelegramClient};
use crate::orchestrator::{discover_profiles, Orchestrator};
use crate::profile_parser::ProfileParser;
use crate::service_account::{ServiceAccountAuth, ServiceAccountKey, CALENDAR_SCOPE};

/// Command to scan profiles, sync calendar reminders and send notifications
#[derive(Debug, Default)]
pub struct RunCommand {
    /// Only parse and print, no calendar/chat/state changes
    pub dry_run: bool,
    pub profiles_dir: Option<PathBuf>,
}

#[async_trait]
impl Command for RunCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        let config = &context.config;
        let timezone = config.timezone()?;

        let profiles_dir = self
            .profiles_dir
            .clone()
            .unwrap_or_else(|| config.profiles_dir());
        let profiles = discover_profiles(&profiles_dir, &config.profiles.extension)
            .await
            .with_context(|| format!("Failed to list provisioning profiles in {:?}", profiles_dir))?;

        if profiles.is_empty() {
            println!("No provisioning profiles found in {}", profiles_dir.display());
            return Ok(());
        }
        info!("Checking {} provisioning profiles", profiles.len());

        let parser = ProfileParser::new(
            &config.profiles.identity_prefix,
            &config.profiles.excluded_keywords,
            timezone,
        )?;
        let store = EventStore::new(config.event_store_file());

        let orchestrator = if self.dry_run {
            info!("Dry run: calendar, chat and event store are left untouched");
            Orchestrator::new(parser, store, None, Notifier::new(None, timezone))
        } else {
            let http_client = build_client(config.general.http_timeout_seconds)?;
            let calendar = build_calendar_sync(config, http_client.clone())?;
            let chat = build_chat(config, http_client);
            Orchestrator::new(parser, store, Some(calendar), Notifier::new(chat, timezone))
        };

        let summary = orchestrator.run(&profiles).await;
        println!(
            "Done: {} synced, {} failed to sync, {} excluded, {} unreadable",
            summary.synced, summary.sync_failed, summary.excluded, summary.parse_failed
        );
        Ok(())
    }
}

fn build_calendar_sync(config: &Config, http_client: reqwest::Client) -> Result<CalendarSync> {
    let credentials_file = config.credentials_file();
    let key = ServiceAccountKey::from_file(&credentials_file).with_context(|| {
        format!(
            "Failed to load Google service account credentials from {:?}",
            credentials_file
        )
    })?;
    info!(
        "Using Google service account {} (project {})",
        key.client_email,
        key.project_id.as_deref().unwrap_or("unknown")
    );

    let auth = ServiceAccountAuth::new(key, CALENDAR_SCOPE, http_client.clone());
    let service = GoogleCalendarService::new(auth, http_client);
    Ok(CalendarSync::new(Arc::new(service), config.calendar_id()))
}

fn build_chat(config: &Config, http_client: reqwest::Client) -> Option<Arc<dyn ChatApi>> {
    if !config.telegram.enabled {
        info!("Telegram notifications disabled");
        return None;
    }

    match (config.telegram_token(), config.telegram_chat_id()) {
        (Some(token), Some(chat_id)) => Some(Arc::new(TelegramClient::new(
            http_client,
            &config.telegram.api_base,
            token,
            chat_id,
        ))),
        _ => {
            warn!("Telegram token or chat id missing, notifications will only be printed");
            None
        }
    }
}
