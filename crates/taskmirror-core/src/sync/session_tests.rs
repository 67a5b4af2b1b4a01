//! Tests for session orchestration.

#[cfg(test)]
mod tests {
    use super::super::session::SyncSession;
    use super::super::testutil::FakeCalendar;
    use crate::sync::calendar_client::CalendarClient;
    use crate::sync::conflict_resolver::Resolution;
    use crate::sync::event_codec::task_to_event_payload;
    use crate::sync::types::{Conflict, RemoteEvent, SyncError, SyncOutcome};
    use crate::task::Task;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn sync_task(id: &str, title: &str) -> Task {
        let mut task = Task::new(id, title);
        task.synced = true;
        task
    }

    /// A task linked to a seeded remote event whose content has diverged
    /// on both sides. Returns the task collection ready for a session.
    fn diverged_pair(calendar: &FakeCalendar) -> Vec<Task> {
        let mut task = sync_task("t-1", "local title");
        task.remote_event_id = Some("ev-1".to_string());

        let mut remote_state = task.clone();
        remote_state.title = "remote title".to_string();
        calendar.seed(
            "ev-1",
            task_to_event_payload(&remote_state),
            Utc::now() + Duration::hours(1),
        );
        vec![task]
    }

    #[tokio::test]
    async fn clean_pass_applies_and_records_sync_time() {
        let calendar = Arc::new(FakeCalendar::new());
        let session = SyncSession::new(calendar.clone());
        let mut tasks = vec![sync_task("t-1", "one")];

        let outcome = session.synchronize(&mut tasks).await.unwrap();
        match outcome {
            SyncOutcome::Applied(report) => assert_eq!(report.created, 1),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert!(tasks[0].remote_event_id.is_some());
        assert!(session.last_sync_at().is_some());
        assert!(!session.status().in_progress);
    }

    #[tokio::test]
    async fn auth_failure_mutates_nothing() {
        let calendar = Arc::new(FakeCalendar::unauthenticated());
        let session = SyncSession::new(calendar.clone());
        let mut tasks = vec![sync_task("t-1", "one")];
        let before = tasks.clone();

        let result = session.synchronize(&mut tasks).await;
        assert!(matches!(result, Err(SyncError::AuthenticationRequired)));
        assert_eq!(tasks, before);
        assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
        assert!(session.last_sync_at().is_none());
    }

    #[tokio::test]
    async fn conflicts_suspend_every_application() {
        let calendar = Arc::new(FakeCalendar::new());
        let mut tasks = diverged_pair(&calendar);
        // Unrelated pending work must also wait for the resolution.
        tasks.push(sync_task("t-2", "wants creating"));
        let session = SyncSession::new(calendar.clone());

        let outcome = session.synchronize(&mut tasks).await.unwrap();
        let conflicts = match outcome {
            SyncOutcome::ConflictsPending(conflicts) => conflicts,
            other => panic!("expected ConflictsPending, got {other:?}"),
        };
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(conflicts[0], Conflict::BothModified { .. }));

        assert_eq!(calendar.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
        assert!(tasks[1].remote_event_id.is_none());
        assert!(session.last_sync_at().is_none());
    }

    #[tokio::test]
    async fn keep_local_resolution_pushes_and_converges() {
        let calendar = Arc::new(FakeCalendar::new());
        let mut tasks = diverged_pair(&calendar);
        let session = SyncSession::new(calendar.clone());

        let conflicts = match session.synchronize(&mut tasks).await.unwrap() {
            SyncOutcome::ConflictsPending(conflicts) => conflicts,
            other => panic!("expected ConflictsPending, got {other:?}"),
        };

        let resolutions = conflicts
            .into_iter()
            .map(|c| (c, Resolution::KeepLocal))
            .collect();
        let outcome = session
            .resolve_conflicts(&mut tasks, resolutions)
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Applied(_)));
        assert_eq!(tasks[0].title, "local title");
        let event = calendar.event("ev-1").unwrap();
        assert_eq!(event.summary, "local title");
        assert!(session.last_sync_at().is_some());
    }

    #[tokio::test]
    async fn keep_remote_resolution_adopts_event_state() {
        let calendar = Arc::new(FakeCalendar::new());
        let mut tasks = diverged_pair(&calendar);
        let session = SyncSession::new(calendar.clone());

        let conflicts = match session.synchronize(&mut tasks).await.unwrap() {
            SyncOutcome::ConflictsPending(conflicts) => conflicts,
            other => panic!("expected ConflictsPending, got {other:?}"),
        };

        let resolutions = conflicts
            .into_iter()
            .map(|c| (c, Resolution::KeepRemote))
            .collect();
        let outcome = session
            .resolve_conflicts(&mut tasks, resolutions)
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Applied(_)));
        assert_eq!(tasks[0].title, "remote title");
        // No push happened; the remote copy is already authoritative.
        assert_eq!(calendar.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deferred_work_is_retried_on_the_next_pass() {
        let calendar = Arc::new(FakeCalendar::new());
        calendar
            .fail_create_summaries
            .lock()
            .unwrap()
            .insert("flaky".to_string());
        let session = SyncSession::new(calendar.clone());
        let mut tasks = vec![sync_task("t-1", "flaky")];

        let outcome = session.synchronize(&mut tasks).await.unwrap();
        match outcome {
            SyncOutcome::Applied(report) => assert_eq!(report.deferred, 1),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(session.status().pending_count, 1);
        assert!(tasks[0].remote_event_id.is_none());

        // The outage clears; the parked create goes through next pass.
        calendar.fail_create_summaries.lock().unwrap().clear();
        session.synchronize(&mut tasks).await.unwrap();
        assert_eq!(session.status().pending_count, 0);
        assert!(tasks[0].remote_event_id.is_some());
    }

    /// Blocks inside `list_events` until released, so a second session
    /// entry can be attempted while the first is provably in flight.
    struct GatedCalendar {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    impl GatedCalendar {
        fn new() -> Self {
            Self {
                entered: tokio::sync::Notify::new(),
                release: tokio::sync::Notify::new(),
            }
        }
    }

    #[async_trait]
    impl CalendarClient for GatedCalendar {
        fn is_authenticated(&self) -> bool {
            true
        }

        async fn list_events(
            &self,
            _time_min: DateTime<Utc>,
            _time_max: DateTime<Utc>,
        ) -> Result<Vec<RemoteEvent>, SyncError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![])
        }

        async fn create_event(&self, _payload: &Value) -> Result<String, SyncError> {
            Ok("unused".to_string())
        }

        async fn update_event(&self, _event_id: &str, _payload: &Value) -> Result<(), SyncError> {
            Ok(())
        }

        async fn delete_event(&self, _event_id: &str) -> Result<(), SyncError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_synchronize_is_rejected_not_queued() {
        let calendar = Arc::new(GatedCalendar::new());
        let session = Arc::new(SyncSession::new(calendar.clone()));

        let background = {
            let session = session.clone();
            tokio::spawn(async move {
                let mut tasks: Vec<Task> = vec![];
                session.synchronize(&mut tasks).await
            })
        };
        calendar.entered.notified().await;

        let mut tasks: Vec<Task> = vec![];
        let second = session.synchronize(&mut tasks).await;
        assert!(matches!(second, Err(SyncError::SyncInProgress)));
        assert!(session.status().in_progress);

        calendar.release.notify_one();
        let first = background.await.unwrap();
        assert!(matches!(first, Ok(SyncOutcome::Applied(_))));
        assert!(!session.status().in_progress);
    }
}
