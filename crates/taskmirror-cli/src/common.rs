//! Shared plumbing for CLI commands.

use std::sync::Arc;

use taskmirror_core::sync::SyncError;
use taskmirror_core::{Config, GoogleCalendarClient, SyncSession, TaskStore, TokenSource};

/// Environment variable holding the calendar access token.
///
/// Token acquisition is out of scope for the CLI; scripted callers are
/// expected to obtain a token (e.g. via `gcloud auth` or an OAuth helper)
/// and export it here.
pub const TOKEN_ENV: &str = "TASKMIRROR_ACCESS_TOKEN";

/// Token source backed by the process environment.
pub struct EnvTokenSource;

impl TokenSource for EnvTokenSource {
    fn is_authenticated(&self) -> bool {
        std::env::var(TOKEN_ENV).map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn access_token(&self) -> Result<String, SyncError> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(SyncError::AuthenticationRequired)
    }
}

/// Build a session against the configured calendar, seeded with the
/// store's persisted last-sync timestamp.
pub fn session(config: &Config, store: &TaskStore) -> SyncSession {
    let client =
        GoogleCalendarClient::new(Arc::new(EnvTokenSource), config.sync.calendar_id.as_str());
    SyncSession::with_last_sync(Arc::new(client), store.last_sync_at)
        .with_window(config.sync.window_months_back, config.sync.window_months_ahead)
}

pub fn runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
