//! Core types for calendar synchronization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata bag key carrying the application marker.
pub const META_APP: &str = "app";
/// Marker value identifying events created by this application.
pub const APP_MARKER: &str = "taskmirror";
/// Metadata bag key carrying the originating task id.
pub const META_TASK_ID: &str = "task_id";
pub const META_COMPLETED: &str = "completed";
pub const META_PRIORITY: &str = "priority";
pub const META_TAGS: &str = "tags";
pub const META_RECURRENCE: &str = "recurrence";
pub const META_ESTIMATE: &str = "estimate";
pub const META_CATEGORY: &str = "category";

/// Remote event status as reported by the calendar service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Cancelled,
}

/// Start or end of a remote event.
///
/// The calendar service reports either a date-only value (all-day events,
/// exclusive end) or a zoned timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    AllDay(NaiveDate),
    Timed {
        date_time: DateTime<Utc>,
        /// IANA timezone name as sent by the service.
        time_zone: Option<String>,
    },
}

impl EventTime {
    /// Calendar date of this boundary, in UTC for timed events.
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::AllDay(date) => *date,
            EventTime::Timed { date_time, .. } => date_time.date_naive(),
        }
    }

    /// Timestamp for timed boundaries, None for all-day ones.
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::AllDay(_) => None,
            EventTime::Timed { date_time, .. } => Some(*date_time),
        }
    }
}

/// A calendar event as fetched from the remote service.
///
/// Instances are ephemeral: a fresh window is fetched on every sync pass
/// and nothing here is cached across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
    /// Last server-side update timestamp.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    pub status: EventStatus,
    /// Visual hint (color id) assigned by the mapper.
    #[serde(default)]
    pub color_id: Option<String>,
    /// Private extended properties. Only events whose bag carries the
    /// application marker are ever imported or mutated.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RemoteEvent {
    /// Whether this event was created by this application.
    pub fn is_app_event(&self) -> bool {
        self.metadata.get(META_APP).map(String::as_str) == Some(APP_MARKER)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }
}

/// Why a task/event pair could not be reconciled automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum Conflict {
    /// Local edits and a newer remote update since the last sync.
    BothModified { task_id: String, event: RemoteEvent },
    /// Remote event cancelled while the local copy has unsynced edits.
    DeletedRemotelyModifiedLocally { task_id: String, event: RemoteEvent },
}

impl Conflict {
    pub fn task_id(&self) -> &str {
        match self {
            Conflict::BothModified { task_id, .. } => task_id,
            Conflict::DeletedRemotelyModifiedLocally { task_id, .. } => task_id,
        }
    }

    pub fn event(&self) -> &RemoteEvent {
        match self {
            Conflict::BothModified { event, .. } => event,
            Conflict::DeletedRemotelyModifiedLocally { event, .. } => event,
        }
    }
}

/// Classified outcome of one reconciliation pass.
///
/// A task id appears in at most one of {create, update, merge, conflict};
/// a remote event appears in at most one of {delete, import, conflict}.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Tasks needing a new remote event.
    pub to_create: Vec<String>,
    /// Tasks whose remote event must be updated from local state.
    pub to_update: Vec<String>,
    /// Remote event ids to delete.
    pub to_delete: Vec<String>,
    /// Remote events to import as new local tasks.
    pub to_import: Vec<RemoteEvent>,
    /// Tasks to overwrite from their (newer) remote event.
    pub to_merge: Vec<(String, RemoteEvent)>,
    /// Divergences requiring an external decision.
    pub conflicts: Vec<Conflict>,
}

impl ChangeSet {
    /// True when the pass produced no work at all.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.to_import.is_empty()
            && self.to_merge.is_empty()
            && self.conflicts.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// A deferred remote mutation, retried on the next pass.
///
/// Lives only for the current process; there is no durable queue.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    Create { task_id: String },
    Update { task_id: String },
    Delete { event_id: String },
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last successful sync timestamp.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Number of pending changes queued for retry.
    pub pending_count: usize,
    /// Whether a sync is currently in progress.
    pub in_progress: bool,
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Calendar API error: {0}")]
    CalendarApi(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Rate limited")]
    RateLimited,

    #[error("Sync already in progress")]
    SyncInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Errors that invalidate the whole session rather than one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::AuthenticationRequired | SyncError::SyncInProgress)
    }
}

/// Snapshot handed back to the caller after a pass.
#[derive(Debug)]
pub enum SyncOutcome {
    /// All scheduled changes applied (possibly with items deferred to
    /// the pending queue).
    Applied(ApplyReport),
    /// Divergent edits found; nothing was mutated. The caller must
    /// resolve every conflict and re-run the session.
    ConflictsPending(Vec<Conflict>),
}

/// Per-category counts from one apply pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub imported: usize,
    pub merged: usize,
    /// Items deferred to the pending queue after a transient failure.
    pub deferred: usize,
}
