use anyhow::Result;
use async_trait::async_trait;

use super::{Command, CommandContext};
use crate::config::Config;
use crate::errors::{CertWatchError, CertWatchResult};

/// Command to print configuration values
#[derive(Debug, Default)]
pub struct ConfigCommand {
    pub all: bool,
    pub project_name: bool,
    pub project_version: bool,
    pub calendar_file: bool,
    pub google_creds_file: bool,
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        for line in self.lookup(&context.config)? {
            println!("{}", line);
        }
        Ok(())
    }
}

impl ConfigCommand {
    fn entries(config: &Config) -> [(&'static str, String); 4] {
        [
            ("project_name", env!("CARGO_PKG_NAME").to_string()),
            ("project_version", env!("CARGO_PKG_VERSION").to_string()),
            ("calendar_file", config.event_store_file().display().to_string()),
            ("google_creds_file", config.credentials_file().display().to_string()),
        ]
    }

    /// Resolve the requested values, one output line each
    pub fn lookup(&self, config: &Config) -> CertWatchResult<Vec<String>> {
        let entries = Self::entries(config);

        if self.all {
            return Ok(entries
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect());
        }

        let selected = [
            self.project_name,
            self.project_version,
            self.calendar_file,
            self.google_creds_file,
        ];
        let values: Vec<String> = entries
            .into_iter()
            .zip(selected)
            .filter(|(_, wanted)| *wanted)
            .map(|((_, value), _)| value)
            .collect();

        if values.is_empty() {
            return Err(CertWatchError::config(
                "No config key specified. Use --help to see available options.",
            ));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.calendar.event_store_file = "/state/app_calendar_events.json".to_string();
        config.calendar.credentials_file = "/state/creds.json".to_string();
        config
    }

    #[test]
    fn test_all() {
        let command = ConfigCommand {
            all: true,
            ..Default::default()
        };
        let lines = command.lookup(&config()).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("project_name={}", env!("CARGO_PKG_NAME")));
        assert_eq!(lines[2], "calendar_file=/state/app_calendar_events.json");
        assert_eq!(lines[3], "google_creds_file=/state/creds.json");
    }

    #[test]
    fn test_single_key() {
        let command = ConfigCommand {
            project_version: true,
            ..Default::default()
        };
        assert_eq!(command.lookup(&config()).unwrap(), vec![env!("CARGO_PKG_VERSION")]);
    }

    #[test]
    fn test_multiple_keys_keep_order() {
        let command = ConfigCommand {
            google_creds_file: true,
            calendar_file: true,
            ..Default::default()
        };
        assert_eq!(
            command.lookup(&config()).unwrap(),
            vec!["/state/app_calendar_events.json", "/state/creds.json"]
        );
    }

    #[test]
    fn test_no_key_is_config_error() {
        let err = ConfigCommand::default().lookup(&config()).unwrap_err();
        assert!(matches!(err, CertWatchError::Config { .. }));
        assert!(err.to_string().contains("No config key specified"));
    }
}
