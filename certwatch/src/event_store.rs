use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::errors::{CertWatchError, CertWatchResult};

/// App name -> calendar event id
pub type EventMapping = BTreeMap<String, String>;

/// JSON file remembering which calendar event belongs to which app
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the mapping; an absent file is an empty mapping
    pub async fn load(&self) -> CertWatchResult<EventMapping> {
        if !self.path.exists() {
            debug!("No event store at {:?}, starting empty", self.path);
            return Ok(EventMapping::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| CertWatchError::file_system("read event store", &self.path, e))?;
        let mapping: EventMapping = serde_json::from_str(&content)?;
        debug!("Loaded {} tracked events from {:?}", mapping.len(), self.path);
        Ok(mapping)
    }

    /// Overwrite the whole file with the given mapping
    pub async fn save(&self, mapping: &EventMapping) -> CertWatchResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CertWatchError::file_system("create directory", parent, e))?;
        }

        let json = serde_json::to_string_pretty(mapping)?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| CertWatchError::file_system("write event store", &self.path, e))?;
        debug!("Stored {} tracked events to {:?}", mapping.len(), self.path);
        Ok(())
    }
}
