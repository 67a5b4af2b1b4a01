//! In-memory calendar fake shared by the sync tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::sync::calendar_client::CalendarClient;
use crate::sync::event_codec::parse_remote_event;
use crate::sync::types::{RemoteEvent, SyncError};

/// A fake remote calendar: stores events in memory and mirrors the
/// service's observable behavior (created events get ids, updates bump
/// the `updated` stamp). Failure injection is keyed by event summary for
/// creates and by event id for updates/deletes.
#[derive(Default)]
pub struct FakeCalendar {
    pub authenticated: bool,
    pub events: Mutex<Vec<RemoteEvent>>,
    pub fail_create_summaries: Mutex<HashSet<String>>,
    pub fail_update_ids: Mutex<HashSet<String>>,
    pub fail_delete_ids: Mutex<HashSet<String>>,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self {
            authenticated: true,
            ..Default::default()
        }
    }

    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Seed the fake with an event built from a raw payload.
    pub fn seed(&self, id: &str, mut payload: Value, updated: DateTime<Utc>) {
        payload["id"] = serde_json::json!(id);
        payload["updated"] = serde_json::json!(updated.to_rfc3339());
        let event = parse_remote_event(&payload).expect("seed payload must parse");
        self.events.lock().unwrap().push(event);
    }

    pub fn event(&self, id: &str) -> Option<RemoteEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn transient(what: &str) -> SyncError {
        SyncError::CalendarApi(format!("HTTP 503 ({what})"))
    }
}

#[async_trait]
impl CalendarClient for FakeCalendar {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn list_events(
        &self,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, SyncError> {
        if !self.authenticated {
            return Err(SyncError::AuthenticationRequired);
        }
        Ok(self.events.lock().unwrap().clone())
    }

    async fn create_event(&self, payload: &Value) -> Result<String, SyncError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if !self.authenticated {
            return Err(SyncError::AuthenticationRequired);
        }
        let summary = payload["summary"].as_str().unwrap_or_default();
        if self.fail_create_summaries.lock().unwrap().contains(summary) {
            return Err(Self::transient("create"));
        }

        let id = format!("fake-ev-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut raw = payload.clone();
        raw["id"] = serde_json::json!(id);
        raw["updated"] = serde_json::json!(Utc::now().to_rfc3339());
        let event = parse_remote_event(&raw).map_err(|e| SyncError::CalendarApi(e.to_string()))?;
        self.events.lock().unwrap().push(event);
        Ok(id)
    }

    async fn update_event(&self, event_id: &str, payload: &Value) -> Result<(), SyncError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if !self.authenticated {
            return Err(SyncError::AuthenticationRequired);
        }
        if self.fail_update_ids.lock().unwrap().contains(event_id) {
            return Err(Self::transient("update"));
        }

        let mut raw = payload.clone();
        raw["id"] = serde_json::json!(event_id);
        raw["updated"] = serde_json::json!(Utc::now().to_rfc3339());
        let event = parse_remote_event(&raw).map_err(|e| SyncError::CalendarApi(e.to_string()))?;

        let mut events = self.events.lock().unwrap();
        match events.iter_mut().find(|e| e.id == event_id) {
            Some(existing) => *existing = event,
            None => return Err(SyncError::CalendarApi("HTTP 404 (update)".into())),
        }
        Ok(())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), SyncError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if !self.authenticated {
            return Err(SyncError::AuthenticationRequired);
        }
        if self.fail_delete_ids.lock().unwrap().contains(event_id) {
            return Err(Self::transient("delete"));
        }
        self.events.lock().unwrap().retain(|e| e.id != event_id);
        Ok(())
    }
}
