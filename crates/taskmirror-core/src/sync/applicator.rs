//! Applies a classified change set against the remote calendar.
//!
//! Remote calls run sequentially per category (create, update, delete)
//! to keep ordering predictable and stay inside the service's rate
//! limits. A transient failure on one item parks it in the pending queue
//! and the batch moves on; only authentication failures abort the pass.

use serde_json::Value;
use tracing::warn;

use crate::sync::calendar_client::CalendarClient;
use crate::sync::event_codec::{merge_event_into_task, task_from_event, task_to_event_payload};
use crate::sync::pending::PendingQueue;
use crate::sync::types::{ApplyReport, ChangeSet, PendingChange, SyncError};
use crate::task::Task;

/// Apply every non-conflicting change in the set.
///
/// The caller must have routed conflicts elsewhere; any still present are
/// ignored here. On return, every task whose create or update succeeded
/// carries an up-to-date `remote_event_id`, and a deleted link is cleared
/// only if the remote delete actually went through.
pub async fn apply(
    tasks: &mut Vec<Task>,
    changes: ChangeSet,
    client: &dyn CalendarClient,
    pending: &mut PendingQueue,
) -> Result<ApplyReport, SyncError> {
    let mut report = ApplyReport::default();

    for task_id in changes.to_create {
        match create_one(tasks, &task_id, client).await {
            Ok(true) => report.created += 1,
            Ok(false) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "deferring failed create");
                pending.enqueue(PendingChange::Create { task_id });
                report.deferred += 1;
            }
        }
    }

    for task_id in changes.to_update {
        match update_one(tasks, &task_id, client).await {
            Ok(true) => report.updated += 1,
            Ok(false) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "deferring failed update");
                pending.enqueue(PendingChange::Update { task_id });
                report.deferred += 1;
            }
        }
    }

    for event_id in changes.to_delete {
        match client.delete_event(&event_id).await {
            Ok(()) => {
                // Only now is it safe to forget the link.
                if let Some(task) = tasks.iter_mut().find(|t| {
                    t.remote_event_id.as_deref() == Some(event_id.as_str())
                }) {
                    task.remote_event_id = None;
                }
                report.deleted += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(event_id = %event_id, error = %err, "deferring failed delete");
                pending.enqueue(PendingChange::Delete { event_id });
                report.deferred += 1;
            }
        }
    }

    // Imports and merges are local-only; nothing below talks to the
    // network, so nothing below can end up in the pending queue.
    for event in changes.to_import {
        let mut imported = task_from_event(&event);
        if tasks.iter().any(|t| t.id == imported.id) {
            // Originating id already taken locally; keep both records.
            imported.id = uuid::Uuid::new_v4().to_string();
        }
        tasks.push(imported);
        report.imported += 1;
    }

    for (task_id, event) in changes.to_merge {
        match tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                merge_event_into_task(task, &event);
                report.merged += 1;
            }
            None => warn!(task_id = %task_id, "skipping merge for vanished task"),
        }
    }

    Ok(report)
}

/// Retry every queued change once. Changes that fail again go back in
/// the queue for a later pass.
pub async fn retry_pending(
    tasks: &mut Vec<Task>,
    client: &dyn CalendarClient,
    pending: &mut PendingQueue,
) -> Result<usize, SyncError> {
    let mut retried = 0;

    for change in pending.drain() {
        let result = match &change {
            // Whether a parked task needs a create or an update depends on
            // its link state now, not on what failed originally.
            PendingChange::Create { task_id } | PendingChange::Update { task_id } => {
                let linked = tasks
                    .iter()
                    .find(|t| t.id == *task_id)
                    .map(|t| t.remote_event_id.is_some());
                match linked {
                    Some(true) => update_one(tasks, task_id, client).await,
                    Some(false) => create_one(tasks, task_id, client).await,
                    None => Ok(false), // task deleted locally in the meantime
                }
            }
            PendingChange::Delete { event_id } => {
                client.delete_event(event_id).await.map(|_| true)
            }
        };

        match result {
            Ok(true) => retried += 1,
            Ok(false) => {}
            Err(err) if err.is_fatal() => {
                pending.enqueue(change);
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, "retry failed, re-deferring");
                pending.enqueue(change);
            }
        }
    }

    Ok(retried)
}

/// Create the remote event for one task. Returns false when the task is
/// gone from the collection (skipped, not an error).
async fn create_one(
    tasks: &mut [Task],
    task_id: &str,
    client: &dyn CalendarClient,
) -> Result<bool, SyncError> {
    let Some(index) = tasks.iter().position(|t| t.id == task_id) else {
        warn!(task_id = %task_id, "skipping create for vanished task");
        return Ok(false);
    };
    if tasks[index].remote_event_id.is_some() {
        // Already linked; a retry of an earlier deferred create got here
        // first. Creating again would leave a duplicate event behind.
        return Ok(false);
    }
    let payload: Value = task_to_event_payload(&tasks[index]);
    let event_id = client.create_event(&payload).await?;
    tasks[index].remote_event_id = Some(event_id);
    tasks[index].synced = true;
    Ok(true)
}

/// Push one task's state over its existing remote event.
async fn update_one(
    tasks: &mut [Task],
    task_id: &str,
    client: &dyn CalendarClient,
) -> Result<bool, SyncError> {
    let Some(task) = tasks.iter().find(|t| t.id == task_id) else {
        warn!(task_id = %task_id, "skipping update for vanished task");
        return Ok(false);
    };
    let Some(event_id) = task.remote_event_id.clone() else {
        warn!(task_id = %task_id, "skipping update for unlinked task");
        return Ok(false);
    };
    let payload = task_to_event_payload(task);
    client.update_event(&event_id, &payload).await?;
    Ok(true)
}
