//! The batching scheduler.
//!
//! # Algorithm
//!
//! 1. A node whose state changed calls `enqueue` with a weak handle to its
//!    dispatch routine (at most once per turn; the node's own pending flag
//!    makes `invalidate` idempotent).
//! 2. `flush` swaps the pending queue for an empty one and dispatches the
//!    swapped-out nodes in the order they were first scheduled.
//! 3. Dispatch may schedule more nodes; those land in the fresh queue and
//!    form the next pass.
//! 4. Passes repeat until the queue settles. 100 consecutive passes that
//!    each leave new work behind abort the flush with a fatal error.
//!
//! Everything here assumes a single-threaded cooperative host: `flush` is
//! never raced against itself, and reentrant scheduling from inside a
//! dispatch is handled by the queue swap, not by lock ordering.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{error, trace};

use super::task::TaskQueue;
use crate::error::FlushError;

/// Number of consecutive cascading passes after which a flush is assumed to
/// be cycling and is aborted.
pub const MAX_CASCADE_PASSES: usize = 100;

/// A node the scheduler can dispatch.
///
/// Implemented by every reactive node variant. `dispatch` runs the node's
/// deferred notification; `abandon` resets its pending bookkeeping when the
/// scheduler discards queued work after a cycle abort.
pub(crate) trait Schedulable: Send + Sync {
    fn dispatch(&self);
    fn abandon(&self);
}

struct SchedulerInner {
    /// Nodes awaiting dispatch, in first-scheduled order. Swapped out
    /// wholesale at the start of each pass.
    queue: Mutex<Vec<Weak<dyn Schedulable>>>,

    /// Deferred one-shot tasks, run once the reactive queue settles.
    tasks: TaskQueue,

    /// True while a flush is draining; reentrant flush calls fold into the
    /// in-flight one.
    flushing: AtomicBool,

    /// Consecutive passes that left new work behind.
    nested_passes: AtomicUsize,
}

/// Handle to a scheduler. Cloning is cheap and every clone refers to the
/// same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue: Mutex::new(Vec::new()),
                tasks: TaskQueue::default(),
                flushing: AtomicBool::new(false),
                nested_passes: AtomicUsize::new(0),
            }),
        }
    }

    /// Append a node to the pending queue.
    ///
    /// Callers guarantee per-node idempotence within a turn via their
    /// pending flag; the queue itself accepts whatever it is handed.
    pub(crate) fn enqueue(&self, node: Weak<dyn Schedulable>) {
        self.inner.queue.lock().push(node);
    }

    /// Enqueue a one-shot unit of work to run after the reactive queue has
    /// settled in the next flush.
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.tasks.push(Box::new(task));
    }

    /// Whether any node or task is awaiting a flush.
    pub fn has_pending(&self) -> bool {
        !self.inner.queue.lock().is_empty() || !self.inner.tasks.is_empty()
    }

    /// Number of nodes currently queued for the next pass.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Drain the pending queue, dispatching nodes in first-scheduled order.
    ///
    /// Runs repeated passes until no new work is produced, then runs any
    /// deferred tasks (and flushes whatever those scheduled). Reentrant
    /// calls from inside an observer are no-ops; the in-flight flush picks
    /// up the new work as its next pass.
    ///
    /// Returns [`FlushError::TooManyNestedUpdates`] if cascading passes fail
    /// to settle; all queued work is discarded in that case and subsequent
    /// independent writes behave normally.
    pub fn flush(&self) -> Result<(), FlushError> {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.drain();
        self.inner.flushing.store(false, Ordering::SeqCst);
        result
    }

    fn drain(&self) -> Result<(), FlushError> {
        loop {
            let pass = std::mem::take(&mut *self.inner.queue.lock());

            if pass.is_empty() {
                self.inner.nested_passes.store(0, Ordering::SeqCst);
                let tasks = self.inner.tasks.drain();
                if tasks.is_empty() {
                    return Ok(());
                }
                for task in tasks {
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
                        error!(
                            panic = %panic_message(&panic),
                            "deferred task panicked; continuing with remaining tasks"
                        );
                    }
                }
                continue;
            }

            trace!(nodes = pass.len(), "dispatching flush pass");
            for weak in &pass {
                let Some(node) = weak.upgrade() else { continue };
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| node.dispatch())) {
                    // One failing observer must not block the rest of the
                    // pass.
                    error!(
                        panic = %panic_message(&panic),
                        "dispatch panicked; continuing with remaining nodes"
                    );
                }
            }

            if self.inner.queue.lock().is_empty() {
                self.inner.nested_passes.store(0, Ordering::SeqCst);
            } else {
                let nested = self.inner.nested_passes.fetch_add(1, Ordering::SeqCst) + 1;
                if nested >= MAX_CASCADE_PASSES {
                    error!(passes = nested, "too many nested updates; aborting flush");
                    self.abort_pending();
                    return Err(FlushError::TooManyNestedUpdates { passes: nested });
                }
            }
        }
    }

    /// Discard all queued work after a cycle abort, resetting each
    /// abandoned node's pending flag so later writes propagate again.
    fn abort_pending(&self) {
        let abandoned = std::mem::take(&mut *self.inner.queue.lock());
        for weak in abandoned {
            if let Some(node) = weak.upgrade() {
                node.abandon();
            }
        }
        self.inner.tasks.clear();
        self.inner.nested_passes.store(0, Ordering::SeqCst);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending_len())
            .field("flushing", &self.inner.flushing.load(Ordering::SeqCst))
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
