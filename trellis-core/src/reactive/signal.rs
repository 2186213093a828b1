//! Signal implementation.
//!
//! A Signal is the mutable root of a reactive graph: a value that is
//! assigned directly rather than derived. Writes are synchronous and
//! immediately visible to synchronous reads, while dependent notification
//! is deferred to the scheduler's next flush.
//!
//! Every assignment counts as a change. There is deliberately no equality
//! check on the default write path; callers that want suppression opt in
//! via [`Signal::set_if_changed`].

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::schedule::{Schedulable, Scheduler};

use super::node::{Dependent, NodeId, NodeKind, NodeState, Observable, Registration};

/// A reactive signal holding a value of type `T`.
///
/// Cloning a `Signal` yields another handle to the same underlying state.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Scheduler::new();
/// let count = Signal::new(&scheduler, 0);
///
/// count.set(5);          // visible immediately...
/// assert_eq!(count.get(), 5);
/// scheduler.flush()?;    // ...dependents hear about it here
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    node: NodeState,
    weak: Weak<SignalInner<T>>,
    value: RwLock<T>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value, bound to
    /// `scheduler` for deferred notification.
    pub fn new(scheduler: &Scheduler, value: T) -> Self {
        Self {
            inner: Arc::new_cyclic(|weak| SignalInner {
                node: NodeState::new(NodeKind::Source, scheduler.clone()),
                weak: weak.clone(),
                value: RwLock::new(value),
            }),
        }
    }

    /// Get the current value. No side effects.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Store a new value and schedule deferred notification of dependents.
    ///
    /// The store is unconditional: assigning a value equal to the current
    /// one still propagates. The write is visible to any subsequent
    /// synchronous [`get`](Self::get) before the flush runs.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.inner.node.invalidate(self.inner.weak.clone());
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.read();
            f(&current)
        };
        self.set(next);
    }

    /// Opt-in equality suppression: store and propagate only if the new
    /// value differs from the current one. Returns whether a change was
    /// propagated.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if *self.inner.value.read() == value {
            return false;
        }
        self.set(value);
        true
    }

    /// Number of currently registered dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.node.dependent_count()
    }
}

impl<T> Observable for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        Signal::get(self)
    }

    fn id(&self) -> NodeId {
        self.inner.node.id()
    }

    fn kind(&self) -> NodeKind {
        self.inner.node.kind()
    }

    fn scheduler(&self) -> Scheduler {
        self.inner.node.scheduler().clone()
    }

    fn register_dependent(&self, dependent: Weak<dyn Dependent>) -> Registration {
        self.inner.node.register_dependent(dependent)
    }
}

impl<T> Schedulable for SignalInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dispatch(&self) {
        self.node.clear_pending();
        self.node.notify_dependents();
    }

    fn abandon(&self) {
        self.node.clear_pending();
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.node.id())
            .field("value", &self.get())
            .field("pending", &self.inner.node.is_pending())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
