//! Drives parse -> calendar sync -> persist -> notify, one profile at a time.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::calendar_sync::CalendarSync;
use crate::errors::{CertWatchError, CertWatchResult};
use crate::event_store::EventStore;
use crate::notifier::Notifier;
use crate::profile_parser::{AppCertInfo, ProfileParser};

/// Regular files in `dir` with the given extension, sorted by path.
/// A missing directory yields no profiles.
pub async fn discover_profiles(dir: &Path, extension: &str) -> CertWatchResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Profiles directory {:?} does not exist", dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(CertWatchError::file_system("list profiles", dir, e)),
    };

    let mut profiles = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches_extension && entry.file_type().await?.is_file() {
            profiles.push(path);
        }
    }

    profiles.sort();
    debug!("Found {} profiles in {:?}", profiles.len(), dir);
    Ok(profiles)
}

/// What happened to a single profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Excluded,
    ParseFailed,
    Synced,
    SyncFailed,
    /// Parsed and reported only
    Checked,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub excluded: usize,
    pub parse_failed: usize,
    pub synced: usize,
    pub sync_failed: usize,
    pub checked: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: FileOutcome) {
        self.scanned += 1;
        match outcome {
            FileOutcome::Excluded => self.excluded += 1,
            FileOutcome::ParseFailed => self.parse_failed += 1,
            FileOutcome::Synced => self.synced += 1,
            FileOutcome::SyncFailed => self.sync_failed += 1,
            FileOutcome::Checked => self.checked += 1,
        }
    }
}

pub struct Orchestrator {
    parser: ProfileParser,
    store: EventStore,
    /// `None` in dry-run mode
    calendar: Option<CalendarSync>,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(
        parser: ProfileParser,
        store: EventStore,
        calendar: Option<CalendarSync>,
        notifier: Notifier,
    ) -> Self {
        Self {
            parser,
            store,
            calendar,
            notifier,
        }
    }

    /// Process every profile in order. Failures stay contained to their file.
    pub async fn run(&self, profiles: &[PathBuf]) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in profiles {
            let outcome = self.process_file(path).await;
            debug!("{:?}: {:?}", path, outcome);
            summary.record(outcome);
        }

        info!(
            "Scanned {} profiles: {} synced, {} sync failures, {} excluded, {} unreadable",
            summary.scanned, summary.synced, summary.sync_failed, summary.excluded, summary.parse_failed
        );
        summary
    }

    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let app_info = match self.parser.parse_file(path).await {
            Ok(Some(info)) => info,
            Ok(None) => return FileOutcome::Excluded,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                return FileOutcome::ParseFailed;
            }
        };

        let outcome = match &self.calendar {
            Some(calendar) => self.sync_and_persist(calendar, &app_info).await,
            None => FileOutcome::Checked,
        };

        self.notifier
            .notify(&app_info.app_name, app_info.expiration)
            .await;
        outcome
    }

    async fn sync_and_persist(&self, calendar: &CalendarSync, app_info: &AppCertInfo) -> FileOutcome {
        let mut mapping = match self.store.load().await {
            Ok(mapping) => mapping,
            Err(e) => {
                error!("Cannot read event store {:?}: {}", self.store.path(), e);
                return FileOutcome::SyncFailed;
            }
        };

        let existing = mapping.get(&app_info.app_name).map(String::as_str);
        let event_id = match calendar.sync(app_info, existing).await {
            Ok(event_id) => event_id,
            Err(_) => return FileOutcome::SyncFailed,
        };

        mapping.insert(app_info.app_name.clone(), event_id);
        if let Err(e) = self.store.save(&mapping).await {
            error!("Failed to persist event id for {}: {}", app_info.app_name, e);
        }
        FileOutcome::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::EventMapping;
    use crate::test_support::{profile_text, CalendarCall, FakeCalendar, FakeChat};
    use std::sync::Arc;

    const PREFIX: &str = "XC mnalavadi ";

    struct Harness {
        dir: tempfile::TempDir,
        calendar: Arc<FakeCalendar>,
        chat: Arc<FakeChat>,
    }

    impl Harness {
        fn new(calendar: FakeCalendar) -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                calendar: Arc::new(calendar),
                chat: Arc::new(FakeChat::default()),
            }
        }

        fn store_path(&self) -> PathBuf {
            self.dir.path().join("app_calendar_events.json")
        }

        fn write_profile(&self, file: &str, app: &str) -> PathBuf {
            let path = self.dir.path().join(file);
            std::fs::write(
                &path,
                profile_text(PREFIX, app, "2024-03-01T10:00:00Z", "2099-03-01T10:00:00Z"),
            )
            .unwrap();
            path
        }

        fn orchestrator(&self, dry_run: bool) -> Orchestrator {
            let parser = ProfileParser::new(
                PREFIX,
                &["test".to_string(), "widget".to_string()],
                chrono_tz::Europe::Berlin,
            )
            .unwrap();
            let calendar = (!dry_run).then(|| CalendarSync::new(self.calendar.clone(), "primary"));
            let chat: Option<Arc<dyn crate::notifier::ChatApi>> =
                (!dry_run).then(|| self.chat.clone() as Arc<dyn crate::notifier::ChatApi>);
            Orchestrator::new(
                parser,
                EventStore::new(self.store_path()),
                calendar,
                Notifier::new(chat, chrono_tz::Europe::Berlin),
            )
        }

        async fn mapping(&self) -> EventMapping {
            EventStore::new(self.store_path()).load().await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mobileprovision", "a.mobileprovision", "notes.txt", "C.MOBILEPROVISION"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("dir.mobileprovision")).unwrap();

        let found = discover_profiles(dir.path(), "mobileprovision").await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["C.MOBILEPROVISION", "a.mobileprovision", "b.mobileprovision"]);
    }

    #[tokio::test]
    async fn test_discover_missing_dir_is_empty() {
        let found = discover_profiles(Path::new("/nonexistent/profiles"), "mobileprovision")
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_new_app_is_created_and_persisted() {
        let harness = Harness::new(FakeCalendar::default());
        let profile = harness.write_profile("a.mobileprovision", "MyApp");

        let summary = harness.orchestrator(false).run(&[profile]).await;

        assert_eq!(summary.synced, 1);
        match &harness.calendar.calls()[0] {
            CalendarCall::Insert { calendar_id, event } => {
                assert_eq!(calendar_id, "primary");
                assert_eq!(event.summary, "🔄 Rebuild MyApp");
            }
            other => panic!("expected an insert, got {:?}", other),
        }
        assert_eq!(
            harness.mapping().await.get("MyApp").map(String::as_str),
            Some("created-MyApp")
        );
        assert_eq!(harness.chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_known_app_is_updated() {
        let harness = Harness::new(FakeCalendar::default());
        let mut mapping = EventMapping::new();
        mapping.insert("MyApp".to_string(), "evt123".to_string());
        EventStore::new(harness.store_path()).save(&mapping).await.unwrap();
        let profile = harness.write_profile("a.mobileprovision", "MyApp");

        harness.orchestrator(false).run(&[profile]).await;

        let calls = harness.calendar.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            CalendarCall::Update {
                calendar_id,
                event_id,
                event,
            } => {
                assert_eq!(calendar_id, "primary");
                assert_eq!(event_id, "evt123");
                assert_eq!(event.summary, "🔄 Rebuild MyApp");
            }
            other => panic!("expected an update, got {:?}", other),
        }
        assert_eq!(harness.mapping().await, mapping);
    }

    #[tokio::test]
    async fn test_excluded_and_broken_files_are_skipped() {
        let harness = Harness::new(FakeCalendar::default());
        let excluded = harness.write_profile("1.mobileprovision", "MyAppTest");
        let broken = harness.dir.path().join("2.mobileprovision");
        std::fs::write(&broken, "garbage").unwrap();
        let good = harness.write_profile("3.mobileprovision", "Good");

        let summary = harness.orchestrator(false).run(&[excluded, broken, good]).await;

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.parse_failed, 1);
        assert_eq!(summary.synced, 1);
        assert_eq!(harness.calendar.calls().len(), 1);
        assert_eq!(harness.chat.messages().len(), 1);
        assert!(harness.chat.messages()[0].starts_with("Good\n"));
    }

    #[tokio::test]
    async fn test_sync_failure_still_notifies_and_keeps_store() {
        let harness = Harness::new(FakeCalendar::failing());
        let mut mapping = EventMapping::new();
        mapping.insert("Other".to_string(), "evt9".to_string());
        EventStore::new(harness.store_path()).save(&mapping).await.unwrap();
        let first = harness.write_profile("a.mobileprovision", "MyApp");
        let second = harness.write_profile("b.mobileprovision", "Second");

        let summary = harness.orchestrator(false).run(&[first, second]).await;

        assert_eq!(summary.sync_failed, 2);
        assert_eq!(harness.chat.messages().len(), 2);
        assert_eq!(harness.mapping().await, mapping);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let harness = Harness::new(FakeCalendar::default());
        let profile = harness.write_profile("a.mobileprovision", "MyApp");

        let summary = harness.orchestrator(true).run(&[profile]).await;

        assert_eq!(summary.checked, 1);
        assert!(harness.calendar.calls().is_empty());
        assert!(harness.chat.messages().is_empty());
        assert!(!harness.store_path().exists());
    }
}
