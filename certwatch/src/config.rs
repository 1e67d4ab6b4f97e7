use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::errors::{CertWatchError, CertWatchResult};

const APP_DIR: &str = "certwatch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub profiles: ProfilesConfig,
    pub calendar: CalendarConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Timezone used for display and for the all-day event date
    pub timezone: String,
    /// Log level
    pub log_level: String,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    /// Directory holding the provisioning profiles
    pub directory: String,
    pub extension: String,
    /// Text preceding the app name in the profile's Name entry
    pub identity_prefix: String,
    /// Apps whose name contains any of these (case-insensitive) are not tracked
    pub excluded_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub calendar_id: String,
    /// Google service account key (JSON)
    pub credentials_file: String,
    /// App name -> event id mapping
    pub event_store_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    /// Bot token (falls back to TELEGRAM_BOT_TOKEN)
    pub api_token: Option<String>,
    /// Target chat (falls back to TELEGRAM_CHAT_ID)
    pub chat_id: Option<String>,
    pub api_base: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Berlin".to_string(),
            log_level: "info".to_string(),
            http_timeout_seconds: 30,
        }
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            directory: "~/Library/Developer/Xcode/UserData/Provisioning Profiles".to_string(),
            extension: "mobileprovision".to_string(),
            identity_prefix: "XC mnalavadi ".to_string(),
            excluded_keywords: vec!["test".to_string(), "widget".to_string()],
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let data_dir = Config::get_data_dir();
        Self {
            calendar_id: "primary".to_string(),
            credentials_file: data_dir
                .join("google_application_credentials.json")
                .display()
                .to_string(),
            event_store_file: data_dir
                .join("app_calendar_events.json")
                .display()
                .to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location is created from defaults. A
    /// missing file at an explicit path is an error.
    pub async fn load(path: Option<&Path>) -> Result<Config> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::get_config_path()?, false),
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            debug!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else if explicit {
            Err(CertWatchError::config(format!(
                "config file {} does not exist",
                config_path.display()
            ))
            .into())
        } else {
            info!("Config file not found, creating default configuration");
            let default_config = Config::default();
            default_config.save_to(&config_path).await?;
            Ok(default_config)
        }
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, content)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }

    pub fn get_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Get timezone as parsed Tz object
    pub fn timezone(&self) -> CertWatchResult<chrono_tz::Tz> {
        self.general.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            CertWatchError::config(format!("unknown timezone '{}'", self.general.timezone))
        })
    }

    pub fn profiles_dir(&self) -> PathBuf {
        expand_home(&self.profiles.directory)
    }

    pub fn credentials_file(&self) -> PathBuf {
        expand_home(&self.calendar.credentials_file)
    }

    pub fn event_store_file(&self) -> PathBuf {
        expand_home(&self.calendar.event_store_file)
    }

    pub fn calendar_id(&self) -> String {
        std::env::var("CERTWATCH_CALENDAR_ID")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.calendar.calendar_id.clone())
    }

    /// Get the bot token from config or environment variable
    pub fn telegram_token(&self) -> Option<String> {
        non_empty(self.telegram.api_token.clone())
            .or_else(|| non_empty(std::env::var("TELEGRAM_BOT_TOKEN").ok()))
    }

    /// Get the chat id from config or environment variable
    pub fn telegram_chat_id(&self) -> Option<String> {
        non_empty(self.telegram.chat_id.clone())
            .or_else(|| non_empty(std::env::var("TELEGRAM_CHAT_ID").ok()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
