//! Calendar synchronization layer.
//!
//! Bidirectional reconciliation between the local task collection and a
//! remote calendar. Tasks marked for sync are mirrored as events carrying
//! an application marker in their private metadata; foreign events are
//! left untouched.

pub mod applicator;
pub mod calendar_client;
pub mod classifier;
pub mod conflict_resolver;
pub mod event_codec;
pub mod pending;
pub mod session;
pub mod types;

#[cfg(test)]
mod testutil;

#[cfg(test)]
mod session_tests;

pub use calendar_client::{CalendarClient, GoogleCalendarClient, TokenSource};
pub use classifier::{classify, has_local_changes};
pub use conflict_resolver::{resolve, Resolution, ResolutionAction};
pub use event_codec::{
    merge_event_into_task, parse_remote_event, task_from_event, task_to_event_payload,
};
pub use pending::PendingQueue;
pub use session::{SyncSession, SyncState};
pub use types::{
    ApplyReport, ChangeSet, Conflict, EventStatus, EventTime, PendingChange, RemoteEvent,
    SyncError, SyncOutcome, SyncStatus,
};
