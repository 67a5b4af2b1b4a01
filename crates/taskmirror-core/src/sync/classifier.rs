//! Change classification for one reconciliation pass.
//!
//! Given the full local task collection and the full fetched event window,
//! produces a [`ChangeSet`]. Classification is synchronous and touches no
//! network; the only in-place mutation is unsyncing tasks whose remote
//! event was cancelled with no divergent local edits.

use std::collections::HashMap;

use crate::sync::event_codec::task_from_event;
use crate::sync::types::{ChangeSet, Conflict, RemoteEvent};
use crate::task::Task;

/// Classify local tasks against the fetched remote event window.
///
/// Conflict detection takes precedence: whenever both sides diverged the
/// pair lands in `conflicts`, never in `to_merge` or `to_update`, and a
/// cancelled event with local edits is a conflict, never a silent delete.
pub fn classify(tasks: &mut [Task], events: Vec<RemoteEvent>) -> ChangeSet {
    let mut changes = ChangeSet::default();

    // Index by remote id; matched entries are removed so whatever remains
    // is remote-only.
    let mut remaining: HashMap<String, RemoteEvent> =
        events.into_iter().map(|e| (e.id.clone(), e)).collect();

    for task in tasks.iter_mut() {
        if task.synced {
            let Some(event_id) = task.remote_event_id.clone() else {
                // Marked for sync but never mirrored.
                changes.to_create.push(task.id.clone());
                continue;
            };
            let Some(event) = remaining.remove(&event_id) else {
                // Link lost on the remote side; recreate.
                changes.to_create.push(task.id.clone());
                continue;
            };

            if event.is_cancelled() {
                if has_local_changes(task, &event) {
                    changes.conflicts.push(Conflict::DeletedRemotelyModifiedLocally {
                        task_id: task.id.clone(),
                        event,
                    });
                } else {
                    task.unsync();
                }
            } else if is_event_updated(&event, task) {
                if has_local_changes(task, &event) {
                    changes.conflicts.push(Conflict::BothModified {
                        task_id: task.id.clone(),
                        event,
                    });
                } else {
                    changes.to_merge.push((task.id.clone(), event));
                }
            } else if has_local_changes(task, &event) {
                changes.to_update.push(task.id.clone());
            }
        } else if let Some(event_id) = task.remote_event_id.clone() {
            // No longer marked for sync; the mirrored event must go. The
            // link is cleared by the applicator once the delete succeeds.
            remaining.remove(&event_id);
            changes.to_delete.push(event_id);
        }
    }

    // Remote-only events: import ours, leave foreign and cancelled ones.
    for (_, event) in remaining {
        if !event.is_cancelled() && event.is_app_event() {
            changes.to_import.push(event);
        }
    }

    changes
}

/// Whether the remote event was updated after the task's last known state.
///
/// Strictly greater: equal timestamps (clock ties within serialization
/// resolution) count as not updated, so the local side wins.
pub fn is_event_updated(event: &RemoteEvent, task: &Task) -> bool {
    match event.updated {
        Some(updated) => updated > task.last_modified,
        None => false,
    }
}

/// Whether the task diverges from what the remote event currently holds.
///
/// Field comparison, not a dirty bit: title, description, due date (plus
/// time of day when the task carries one), completion flag and priority.
pub fn has_local_changes(task: &Task, event: &RemoteEvent) -> bool {
    if task.title != event.summary {
        return true;
    }
    if task.description != event.description {
        return true;
    }

    match (task.due_date, &event.start) {
        (Some(due_date), Some(start)) => {
            if start.date() != due_date {
                return true;
            }
            if let Some(due_time) = task.due_time {
                match start.date_time() {
                    Some(start) if start.time() == due_time => {}
                    _ => return true,
                }
            }
        }
        (Some(_), None) | (None, Some(_)) => return true,
        (None, None) => {}
    }

    // Completion and priority live in the metadata bag; compare against
    // the event's decoded view so color-derived priority also counts.
    let remote = task_from_event(event);
    if task.completed != remote.completed {
        return true;
    }
    if task.priority != remote.priority {
        return true;
    }

    false
}
