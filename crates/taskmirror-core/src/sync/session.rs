//! Sync session orchestration.
//!
//! One [`SyncSession`] drives a whole pass: fetch the remote window,
//! classify, surface conflicts, apply, record the sync time. Sessions are
//! single-flight; a second synchronize call while one is running is
//! rejected, not queued. The caller owns the task collection and must not
//! mutate it while a pass is in progress.

use chrono::{DateTime, Months, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::sync::applicator::{apply, retry_pending};
use crate::sync::calendar_client::CalendarClient;
use crate::sync::classifier::classify;
use crate::sync::conflict_resolver::{resolve, Resolution, ResolutionAction};
use crate::sync::event_codec::task_to_event_payload;
use crate::sync::pending::PendingQueue;
use crate::sync::types::{
    Conflict, PendingChange, SyncError, SyncOutcome, SyncStatus,
};
use crate::task::Task;

/// Months of history included in the fetch window.
const WINDOW_MONTHS_BACK: u32 = 3;
/// Months of future included in the fetch window.
const WINDOW_MONTHS_AHEAD: u32 = 12;

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Running,
    /// Conflicts were surfaced; the session waits for every one of them
    /// to be resolved before any change is applied.
    AwaitingConflictResolution,
}

/// Orchestrates synchronization passes against one calendar.
pub struct SyncSession {
    client: Arc<dyn CalendarClient>,
    state: Mutex<SyncState>,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
    pending: Mutex<PendingQueue>,
    window_months: (u32, u32),
}

impl SyncSession {
    pub fn new(client: Arc<dyn CalendarClient>) -> Self {
        Self {
            client,
            state: Mutex::new(SyncState::Idle),
            last_sync_at: Mutex::new(None),
            pending: Mutex::new(PendingQueue::new()),
            window_months: (WINDOW_MONTHS_BACK, WINDOW_MONTHS_AHEAD),
        }
    }

    /// Seed the last-sync timestamp from externally persisted metadata.
    pub fn with_last_sync(client: Arc<dyn CalendarClient>, last_sync_at: Option<DateTime<Utc>>) -> Self {
        let session = Self::new(client);
        *session.last_sync_at.lock().unwrap() = last_sync_at;
        session
    }

    /// Override the fetch window (months back, months ahead).
    pub fn with_window(mut self, months_back: u32, months_ahead: u32) -> Self {
        self.window_months = (months_back, months_ahead);
        self
    }

    /// Run one synchronization pass over the task collection.
    ///
    /// Returns [`SyncOutcome::ConflictsPending`] without applying anything
    /// when divergent edits are found; the caller resolves them through
    /// [`resolve_conflicts`](Self::resolve_conflicts), which re-runs the
    /// pass. Authentication failure aborts before any remote mutation.
    pub async fn synchronize(&self, tasks: &mut Vec<Task>) -> Result<SyncOutcome, SyncError> {
        self.begin()?;
        let result = self.run_pass(tasks).await;

        let mut state = self.state.lock().unwrap();
        *state = match &result {
            Ok(SyncOutcome::ConflictsPending(_)) => SyncState::AwaitingConflictResolution,
            _ => SyncState::Idle,
        };
        result
    }

    /// Apply the caller's decision for every surfaced conflict, then
    /// re-run the whole session from scratch.
    ///
    /// Re-running matters: a resolution may invalidate whatever state the
    /// previous classification assumed.
    pub async fn resolve_conflicts(
        &self,
        tasks: &mut Vec<Task>,
        resolutions: Vec<(Conflict, Resolution)>,
    ) -> Result<SyncOutcome, SyncError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state == SyncState::Running {
                return Err(SyncError::SyncInProgress);
            }
            *state = SyncState::Running;
        }

        let result = self.apply_resolutions(tasks, resolutions).await;
        *self.state.lock().unwrap() = SyncState::Idle;
        result?;

        self.synchronize(tasks).await
    }

    /// Current sync status snapshot.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            last_sync_at: *self.last_sync_at.lock().unwrap(),
            pending_count: self.pending.lock().unwrap().len(),
            in_progress: *self.state.lock().unwrap() == SyncState::Running,
        }
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync_at.lock().unwrap()
    }

    fn begin(&self) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if *state == SyncState::Running {
            return Err(SyncError::SyncInProgress);
        }
        *state = SyncState::Running;
        Ok(())
    }

    async fn run_pass(&self, tasks: &mut Vec<Task>) -> Result<SyncOutcome, SyncError> {
        if !self.client.is_authenticated() {
            return Err(SyncError::AuthenticationRequired);
        }

        let now = Utc::now();
        let (months_back, months_ahead) = self.window_months;
        let time_min = now
            .checked_sub_months(Months::new(months_back))
            .unwrap_or(now);
        let time_max = now
            .checked_add_months(Months::new(months_ahead))
            .unwrap_or(now);

        let events = self.client.list_events(time_min, time_max).await?;
        debug!(count = events.len(), "fetched remote event window");

        let changes = classify(tasks, events);
        if changes.has_conflicts() {
            return Ok(SyncOutcome::ConflictsPending(changes.conflicts));
        }

        // Retry earlier failures first so this pass's ordering stays
        // create -> update -> delete for the fresh items. retry_pending
        // only errors fatally; transient re-failures stay queued.
        let mut pending = std::mem::take(&mut *self.pending.lock().unwrap());
        if let Err(err) = retry_pending(tasks, self.client.as_ref(), &mut pending).await {
            warn!(error = %err, "pending retry aborted");
            *self.pending.lock().unwrap() = pending;
            return Err(err);
        }

        let applied = apply(tasks, changes, self.client.as_ref(), &mut pending).await;
        *self.pending.lock().unwrap() = pending;
        let report = applied?;

        *self.last_sync_at.lock().unwrap() = Some(Utc::now());
        Ok(SyncOutcome::Applied(report))
    }

    async fn apply_resolutions(
        &self,
        tasks: &mut Vec<Task>,
        resolutions: Vec<(Conflict, Resolution)>,
    ) -> Result<(), SyncError> {
        let mut pending = std::mem::take(&mut *self.pending.lock().unwrap());

        for (conflict, choice) in resolutions {
            let Some(index) = tasks.iter().position(|t| t.id == conflict.task_id()) else {
                warn!(task_id = %conflict.task_id(), "conflicting task vanished, skipping");
                continue;
            };

            let action = resolve(&mut tasks[index], &conflict, choice);
            let result = match &action {
                ResolutionAction::PushUpdate { task_id } => {
                    self.push_update(tasks, task_id).await
                }
                ResolutionAction::Recreate { task_id } => self.recreate(tasks, task_id).await,
                ResolutionAction::None => Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    *self.pending.lock().unwrap() = pending;
                    return Err(err);
                }
                Err(err) => {
                    warn!(error = %err, "deferring failed conflict follow-up");
                    match action {
                        ResolutionAction::PushUpdate { task_id } => {
                            pending.enqueue(PendingChange::Update { task_id });
                        }
                        ResolutionAction::Recreate { task_id } => {
                            pending.enqueue(PendingChange::Create { task_id });
                        }
                        ResolutionAction::None => {}
                    }
                }
            }
        }

        *self.pending.lock().unwrap() = pending;
        Ok(())
    }

    async fn push_update(&self, tasks: &mut [Task], task_id: &str) -> Result<(), SyncError> {
        let Some(task) = tasks.iter().find(|t| t.id == task_id) else {
            return Ok(());
        };
        let Some(event_id) = task.remote_event_id.clone() else {
            return Ok(());
        };
        let payload = task_to_event_payload(task);
        self.client.update_event(&event_id, &payload).await
    }

    async fn recreate(&self, tasks: &mut [Task], task_id: &str) -> Result<(), SyncError> {
        let Some(index) = tasks.iter().position(|t| t.id == task_id) else {
            return Ok(());
        };
        let payload = task_to_event_payload(&tasks[index]);
        let event_id = self.client.create_event(&payload).await?;
        tasks[index].remote_event_id = Some(event_id);
        tasks[index].synced = true;
        Ok(())
    }
}
