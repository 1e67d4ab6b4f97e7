//! In-memory collaborators and fixtures shared by unit tests

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::errors::{CertWatchError, CertWatchResult};
use crate::google_calendar::{CalendarApi, GoogleEvent};
use crate::notifier::ChatApi;
use crate::profile_parser::AppCertInfo;

pub fn app_info(name: &str, utc_expiration: &str) -> AppCertInfo {
    let naive = NaiveDateTime::parse_from_str(utc_expiration, "%Y-%m-%dT%H:%M:%SZ").unwrap();
    AppCertInfo {
        app_name: name.to_string(),
        expiration: Utc
            .from_utc_datetime(&naive)
            .with_timezone(&chrono_tz::Europe::Berlin),
        cert_path: format!("/profiles/{}.mobileprovision", name),
    }
}

/// Provisioning-profile text with the name on line 5 and two dates
pub fn profile_text(prefix: &str, app_name: &str, created: &str, expires: &str) -> String {
    [
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string(),
        "<plist version=\"1.0\">".to_string(),
        "<dict>".to_string(),
        "\t<key>AppIDName</key>".to_string(),
        "\t<key>Name</key>".to_string(),
        format!("\t<string>{}{}</string>", prefix, app_name),
        "\t<key>CreationDate</key>".to_string(),
        format!("\t<date>{}</date>", created),
        "\t<key>ExpirationDate</key>".to_string(),
        format!("\t<date>{}</date>", expires),
        "</dict>".to_string(),
        "</plist>".to_string(),
    ]
    .join("\n")
}

#[derive(Debug, Clone)]
pub enum CalendarCall {
    Insert {
        calendar_id: String,
        event: GoogleEvent,
    },
    Update {
        calendar_id: String,
        event_id: String,
        event: GoogleEvent,
    },
}

#[derive(Default)]
pub struct FakeCalendar {
    calls: Mutex<Vec<CalendarCall>>,
    fail: bool,
}

impl FakeCalendar {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().clone()
    }

    fn result(&self, id: String) -> CertWatchResult<String> {
        if self.fail {
            Err(CertWatchError::Api {
                service: "Google Calendar".to_string(),
                status: 404,
                message: "Not Found".to_string(),
            })
        } else {
            Ok(id)
        }
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn insert_event(&self, calendar_id: &str, event: &GoogleEvent) -> CertWatchResult<String> {
        self.calls.lock().push(CalendarCall::Insert {
            calendar_id: calendar_id.to_string(),
            event: event.clone(),
        });
        let app = event.summary.trim_start_matches("🔄 Rebuild ");
        self.result(format!("created-{}", app))
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> CertWatchResult<String> {
        self.calls.lock().push(CalendarCall::Update {
            calendar_id: calendar_id.to_string(),
            event_id: event_id.to_string(),
            event: event.clone(),
        });
        self.result(event_id.to_string())
    }
}

#[derive(Default)]
pub struct FakeChat {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeChat {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send_message(&self, text: &str) -> CertWatchResult<()> {
        self.messages.lock().push(text.to_string());
        if self.fail {
            return Err(CertWatchError::Notify {
                message: "Telegram returned 500".to_string(),
            });
        }
        Ok(())
    }
}
