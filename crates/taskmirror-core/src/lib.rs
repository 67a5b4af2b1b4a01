//! # Taskmirror Core Library
//!
//! Core business logic for Taskmirror: a local task list mirrored into a
//! remote calendar. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Task model**: the authoritative local record, including the sync
//!   link fields (`synced`, `remote_event_id`, `last_modified`)
//! - **Sync engine**: bidirectional reconciliation against the remote
//!   calendar -- change classification, conflict resolution, resilient
//!   application with a per-process retry queue
//! - **Storage**: JSON task store and TOML configuration
//!
//! ## Key Components
//!
//! - [`Task`]: local to-do record
//! - [`SyncSession`]: orchestrates one synchronization pass
//! - [`CalendarClient`]: seam to the remote calendar service
//! - [`TaskStore`] / [`Config`]: persistence around the engine

pub mod error;
pub mod storage;
pub mod sync;
pub mod task;

pub use error::{ConfigError, CoreError, StoreError};
pub use storage::{Config, TaskStore};
pub use sync::{
    CalendarClient, ChangeSet, Conflict, GoogleCalendarClient, RemoteEvent, Resolution,
    SyncError, SyncOutcome, SyncSession, SyncStatus, TokenSource,
};
pub use task::{Priority, Recurrence, Task};
