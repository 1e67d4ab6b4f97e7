use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::{CertWatchError, CertWatchResult};
use crate::google_calendar::{
    CalendarApi, GoogleEvent, GoogleEventDate, GoogleReminderOverride, GoogleReminders,
};
use crate::profile_parser::AppCertInfo;

/// "Tomato" in the Google Calendar palette
const REMINDER_COLOR_ID: &str = "11";
/// Popup reminders: one day and one hour before the event
const REMINDER_MINUTES: [u32; 2] = [1440, 60];

/// Build the all-day reminder event for the day before expiration
pub fn build_event(app_info: &AppCertInfo) -> GoogleEvent {
    let event_date = app_info.expiration.date_naive() - Duration::days(1);
    // all-day events need an exclusive end date
    let end_date = event_date + Duration::days(1);
    let time_zone = app_info.expiration.timezone().name().to_string();

    GoogleEvent {
        summary: format!("🔄 Rebuild {}", app_info.app_name),
        description: format!(
            "Certificate for {} expires tomorrow!\n\nCertificate Path: {}\nExpiration: {}",
            app_info.app_name,
            app_info.cert_path,
            app_info.expiration.format("%Y-%m-%d %H:%M:%S %Z"),
        ),
        start: GoogleEventDate {
            date: event_date.format("%Y-%m-%d").to_string(),
            time_zone: time_zone.clone(),
        },
        end: GoogleEventDate {
            date: end_date.format("%Y-%m-%d").to_string(),
            time_zone,
        },
        color_id: REMINDER_COLOR_ID.to_string(),
        reminders: GoogleReminders {
            use_default: false,
            overrides: REMINDER_MINUTES
                .iter()
                .map(|minutes| GoogleReminderOverride {
                    method: "popup".to_string(),
                    minutes: *minutes,
                })
                .collect(),
        },
    }
}

/// Keeps one calendar event per app in the configured calendar
pub struct CalendarSync {
    client: Arc<dyn CalendarApi>,
    calendar_id: String,
}

impl CalendarSync {
    pub fn new(client: Arc<dyn CalendarApi>, calendar_id: impl Into<String>) -> Self {
        Self {
            client,
            calendar_id: calendar_id.into(),
        }
    }

    /// Create the event, or update `existing_event_id`, returning the event id to track
    pub async fn sync(
        &self,
        app_info: &AppCertInfo,
        existing_event_id: Option<&str>,
    ) -> CertWatchResult<String> {
        let event = build_event(app_info);

        let result = match existing_event_id {
            Some(event_id) => self
                .client
                .update_event(&self.calendar_id, event_id, &event)
                .await
                .map(|id| (id, "Updated")),
            None => self
                .client
                .insert_event(&self.calendar_id, &event)
                .await
                .map(|id| (id, "Created")),
        };

        match result {
            Ok((event_id, action)) => {
                println!("  ✓ {} calendar event", action);
                info!("{} calendar event {} for {}", action, event_id, app_info.app_name);
                Ok(event_id)
            }
            Err(e) => {
                println!("  ✗ Failed to sync calendar event: {}", e);
                error!("Failed to sync calendar event for {}: {}", app_info.app_name, e);
                Err(CertWatchError::Sync {
                    message: format!("{}: {}", app_info.app_name, e),
                })
            }
        }
    }
}
