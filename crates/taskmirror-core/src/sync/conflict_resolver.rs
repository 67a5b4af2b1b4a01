//! Conflict resolution for diverged task/event pairs.
//!
//! The resolver knows nothing about how the choice is made; a UI or a
//! policy supplies a [`Resolution`] per conflict and gets back the remote
//! follow-up action to schedule. All local mutation happens here, all
//! remote mutation is left to the applicator.

use crate::sync::event_codec::merge_event_into_task;
use crate::sync::types::Conflict;
use crate::task::Task;

/// The external decision for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepLocal,
    KeepRemote,
}

/// Remote follow-up required after resolving a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAction {
    /// Push the task's current state over the existing remote event.
    PushUpdate { task_id: String },
    /// The remote event no longer exists; create a fresh one.
    Recreate { task_id: String },
    /// Local-only resolution, nothing to send.
    None,
}

/// Apply a resolution choice to the conflicting task.
///
/// `KeepLocal` on a cancelled event clears the stale `remote_event_id`
/// so the follow-up is a create, not an update against a dead id.
/// `KeepRemote` on a cancelled event unsyncs the task; on a live event it
/// merges the remote state in, identical to a non-conflicting merge.
pub fn resolve(task: &mut Task, conflict: &Conflict, choice: Resolution) -> ResolutionAction {
    match (choice, conflict) {
        (Resolution::KeepLocal, Conflict::BothModified { .. }) => ResolutionAction::PushUpdate {
            task_id: task.id.clone(),
        },
        (Resolution::KeepLocal, Conflict::DeletedRemotelyModifiedLocally { .. }) => {
            task.remote_event_id = None;
            ResolutionAction::Recreate {
                task_id: task.id.clone(),
            }
        }
        (Resolution::KeepRemote, Conflict::BothModified { event, .. }) => {
            merge_event_into_task(task, event);
            ResolutionAction::None
        }
        (Resolution::KeepRemote, Conflict::DeletedRemotelyModifiedLocally { .. }) => {
            task.unsync();
            ResolutionAction::None
        }
    }
}
