//! Deferred unit-of-work queue.
//!
//! External layers (the renderer, mostly) use tasks to sequence one-shot
//! side effects relative to flush cycles: a task enqueued during a turn runs
//! after the reactive queue has settled, in enqueue order. Tasks may
//! schedule further reactive work; the scheduler flushes that work before
//! returning to the host.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A one-shot deferred unit of work.
pub(crate) type Task = Box<dyn FnOnce() + Send>;

/// FIFO queue of deferred tasks, drained by the scheduler once the reactive
/// queue settles.
#[derive(Default)]
pub(crate) struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn push(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }

    /// Take every task currently queued, leaving the queue empty.
    pub fn drain(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.tasks.lock())
    }

    pub fn clear(&self) {
        self.tasks.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn tasks_drain_in_enqueue_order() {
        let queue = TaskQueue::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            queue.push(Box::new(move || order.lock().push(label)));
        }

        for task in queue.drain() {
            task();
        }

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_discards_pending_tasks() {
        let queue = TaskQueue::default();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        queue.push(Box::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        }));

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
