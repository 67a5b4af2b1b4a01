//! In-memory queue of deferred remote mutations.
//!
//! When an individual create/update/delete fails transiently, the item is
//! parked here instead of failing the pass. The queue lives only for the
//! current process; a change that keeps failing is simply re-deferred on
//! the next pass.

use crate::sync::types::PendingChange;

/// Queue of changes awaiting a retry pass.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: Vec<PendingChange>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Park a failed change for the next pass. A change for the same
    /// target replaces the older entry so a retry never double-fires.
    pub fn enqueue(&mut self, change: PendingChange) {
        self.items.retain(|existing| !same_target(existing, &change));
        self.items.push(change);
    }

    /// Take every queued change, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn same_target(a: &PendingChange, b: &PendingChange) -> bool {
    use PendingChange::*;
    match (a, b) {
        (Create { task_id: x }, Create { task_id: y })
        | (Create { task_id: x }, Update { task_id: y })
        | (Update { task_id: x }, Create { task_id: y })
        | (Update { task_id: x }, Update { task_id: y }) => x == y,
        (Delete { event_id: x }, Delete { event_id: y }) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_and_drain() {
        let mut queue = PendingQueue::new();
        assert!(queue.is_empty());

        queue.enqueue(PendingChange::Create {
            task_id: "t-1".to_string(),
        });
        queue.enqueue(PendingChange::Delete {
            event_id: "ev-9".to_string(),
        });
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn same_task_deduplicates() {
        let mut queue = PendingQueue::new();
        queue.enqueue(PendingChange::Create {
            task_id: "t-1".to_string(),
        });
        // A later update for the same task supersedes the create.
        queue.enqueue(PendingChange::Update {
            task_id: "t-1".to_string(),
        });
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.drain(),
            vec![PendingChange::Update {
                task_id: "t-1".to_string()
            }]
        );
    }

    #[test]
    fn deletes_keyed_by_event_id() {
        let mut queue = PendingQueue::new();
        queue.enqueue(PendingChange::Delete {
            event_id: "ev-1".to_string(),
        });
        queue.enqueue(PendingChange::Delete {
            event_id: "ev-1".to_string(),
        });
        queue.enqueue(PendingChange::Delete {
            event_id: "ev-2".to_string(),
        });
        assert_eq!(queue.len(), 2);
    }
}
