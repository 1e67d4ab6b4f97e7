use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CertWatchResult;
use crate::http_utils::{handle_api_response, parse_json_response};
use crate::service_account::ServiceAccountAuth;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Event body as accepted by the Calendar v3 events endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub summary: String,
    pub description: String,
    pub start: GoogleEventDate,
    pub end: GoogleEventDate,
    pub color_id: String,
    pub reminders: GoogleReminders,
}

/// All-day date; `dateTime` is never sent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventDate {
    pub date: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleReminders {
    pub use_default: bool,
    pub overrides: Vec<GoogleReminderOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Deserialize)]
struct GoogleEventResponse {
    id: String,
}

/// Remote calendar capability: create or update one event, returning its id
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(&self, calendar_id: &str, event: &GoogleEvent) -> CertWatchResult<String>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> CertWatchResult<String>;
}

/// Google Calendar REST client authenticated as a service account
pub struct GoogleCalendarService {
    auth: ServiceAccountAuth,
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarService {
    pub fn new(auth: ServiceAccountAuth, http_client: reqwest::Client) -> Self {
        Self {
            auth,
            http_client,
            api_base: CALENDAR_API_BASE.to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarService {
    async fn insert_event(&self, calendar_id: &str, event: &GoogleEvent) -> CertWatchResult<String> {
        let token = self.auth.access_token().await?;
        debug!("Inserting event '{}' into calendar {}", event.summary, calendar_id);

        let response = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;

        let response = handle_api_response("Google Calendar", response).await?;
        let created: GoogleEventResponse =
            parse_json_response(response, "Google Calendar insert response").await?;
        Ok(created.id)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> CertWatchResult<String> {
        let token = self.auth.access_token().await?;
        debug!("Updating event {} in calendar {}", event_id, calendar_id);

        let response = self
            .http_client
            .put(self.event_url(calendar_id, event_id))
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;

        let response = handle_api_response("Google Calendar", response).await?;
        let updated: GoogleEventResponse =
            parse_json_response(response, "Google Calendar update response").await?;
        Ok(updated.id)
    }
}
