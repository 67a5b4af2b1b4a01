//! Remote calendar client.
//!
//! The engine only ever talks to the [`CalendarClient`] trait; the Google
//! Calendar implementation below is the production collaborator. Token
//! acquisition and refresh are not handled here -- a [`TokenSource`]
//! injected by the caller owns that flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

use crate::sync::event_codec::parse_remote_event;
use crate::sync::types::{RemoteEvent, SyncError};

const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Result cap per list call, matching the service's page maximum.
const MAX_RESULTS: u32 = 2500;

/// Supplies a bearer token for calendar calls.
///
/// The OAuth dance (authorization, storage, refresh) lives behind this
/// seam and is out of the engine's scope.
pub trait TokenSource: Send + Sync {
    /// Whether credentials are present at all.
    fn is_authenticated(&self) -> bool;

    /// A currently valid access token.
    fn access_token(&self) -> Result<String, SyncError>;
}

/// Operations the sync engine needs from the remote calendar service.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Fetch all events in the window, cancelled ones included, with
    /// recurring events expanded to single occurrences.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, SyncError>;

    /// Insert an event, returning the id assigned by the service.
    async fn create_event(&self, payload: &Value) -> Result<String, SyncError>;

    async fn update_event(&self, event_id: &str, payload: &Value) -> Result<(), SyncError>;

    async fn delete_event(&self, event_id: &str) -> Result<(), SyncError>;
}

/// Google Calendar v3 REST client.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Client against the production API and the given calendar.
    pub fn new(tokens: Arc<dyn TokenSource>, calendar_id: impl Into<String>) -> Self {
        Self::with_base_url(tokens, calendar_id, GOOGLE_API_BASE)
    }

    /// Client against an alternate endpoint (tests).
    pub fn with_base_url(
        tokens: Arc<dyn TokenSource>,
        calendar_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url: base_url.into(),
            calendar_id: calendar_id.into(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    fn check_status(status: StatusCode) -> Result<(), SyncError> {
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SyncError::AuthenticationRequired)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimited),
            s => Err(SyncError::CalendarApi(format!("HTTP {s}"))),
        }
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }

    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, SyncError> {
        let token = self.tokens.access_token()?;

        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(&token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("showDeleted", "true".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
            ])
            .send()
            .await?;
        Self::check_status(response.status())?;
        let body: Value = response.json().await?;

        let items = body["items"].as_array().cloned().unwrap_or_default();
        let mut events = Vec::with_capacity(items.len());
        for item in &items {
            events.push(parse_remote_event(item)?);
        }
        Ok(events)
    }

    async fn create_event(&self, payload: &Value) -> Result<String, SyncError> {
        let token = self.tokens.access_token()?;

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .json(payload)
            .send()
            .await?;
        Self::check_status(response.status())?;
        let body: Value = response.json().await?;

        body["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SyncError::CalendarApi("create response missing event id".into()))
    }

    async fn update_event(&self, event_id: &str, payload: &Value) -> Result<(), SyncError> {
        let token = self.tokens.access_token()?;

        let response = self
            .http
            .put(self.event_url(event_id))
            .bearer_auth(&token)
            .json(payload)
            .send()
            .await?;
        Self::check_status(response.status())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), SyncError> {
        let token = self.tokens.access_token()?;

        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(&token)
            .send()
            .await?;

        // Deleting an already-gone event is not a failure.
        if response.status() == StatusCode::GONE || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_status(response.status())
    }
}
