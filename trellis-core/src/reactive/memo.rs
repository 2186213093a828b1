//! Memo implementation.
//!
//! A Memo is a memoized value derived from one or more upstream reactive
//! nodes through a pure function. It registers itself as a dependent of
//! every upstream at construction and recomputes *lazily*: an upstream
//! change only marks the memo dirty, and the actual recompute happens on
//! the next read. Multiple dirtying events before a read collapse into a
//! single recompute.
//!
//! Per-instance state machine: `Clean` (cache valid) → upstream dispatch →
//! `Dirty` (cache stale) → read → `Clean`.
//!
//! A panicking compute function propagates to whoever triggered the read;
//! the memo stays dirty, so a later read retries.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::schedule::{Schedulable, Scheduler};

use super::node::{Dependent, NodeId, NodeKind, NodeState, Observable, Registration};
use super::upstream::Upstreams;

/// A memoized derived value.
///
/// Cloning a `Memo` yields another handle to the same underlying state.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Scheduler::new();
/// let width = Signal::new(&scheduler, 4);
/// let height = Signal::new(&scheduler, 3);
/// let area = Memo::new((width.clone(), height.clone()), |(w, h)| w * h);
///
/// assert_eq!(area.get(), 12);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

struct MemoInner<T> {
    node: NodeState,
    weak: Weak<MemoInner<T>>,

    /// Reads every upstream and applies the pure transform.
    compute: Box<dyn Fn() -> T + Send + Sync>,

    /// Cached value; `None` only before the first computation.
    value: Mutex<Option<T>>,

    /// True when the cache is stale and the next read must recompute.
    dirty: AtomicBool,

    /// Keeps the upstream registrations alive for the memo's lifetime;
    /// dropping the last handle revokes them.
    _upstream_links: Vec<Registration>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a memo over an ordered tuple of upstream nodes and a pure
    /// compute function receiving their values positionally.
    ///
    /// The memo starts dirty, so the first read always computes. The
    /// scheduler is inherited from the upstreams.
    pub fn new<U, F>(upstreams: U, compute: F) -> Self
    where
        U: Upstreams,
        F: Fn(U::Values) -> T + Send + Sync + 'static,
    {
        let scheduler = upstreams.scheduler();
        let inner = Arc::new_cyclic(|weak: &Weak<MemoInner<T>>| {
            let dependent: Weak<dyn Dependent> = weak.clone();
            let upstream_links = upstreams.register(&dependent);
            MemoInner {
                node: NodeState::new(NodeKind::Derived, scheduler),
                weak: weak.clone(),
                compute: Box::new(move || compute(upstreams.values())),
                value: Mutex::new(None),
                dirty: AtomicBool::new(true),
                _upstream_links: upstream_links,
            }
        });
        Self { inner }
    }

    /// Get the current value, recomputing first if an upstream change has
    /// marked this memo dirty. Recomputation happens at most once between
    /// two dirtying events no matter how often the memo is read.
    pub fn get(&self) -> T {
        if !self.inner.dirty.load(Ordering::SeqCst) {
            if let Some(value) = self.inner.value.lock().clone() {
                return value;
            }
        }
        self.inner.recompute()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Whether the memo has ever computed a value.
    pub fn has_value(&self) -> bool {
        self.inner.value.lock().is_some()
    }

    /// Number of currently registered dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.node.dependent_count()
    }
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(&self) -> T {
        // Reading upstream values may itself recurse through other dirty
        // memos. The cache and dirty flag are only touched after the
        // compute returns, so a panic leaves this memo dirty.
        let value = (self.compute)();
        *self.value.lock() = Some(value.clone());
        self.dirty.store(false, Ordering::SeqCst);
        value
    }
}

impl<T> Dependent for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_dependency_updated(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        // Propagation to this memo's own dependents goes through the
        // scheduler's next pass, never synchronously.
        self.node.invalidate(self.weak.clone());
    }
}

impl<T> Schedulable for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dispatch(&self) {
        self.node.clear_pending();
        // No recompute here: dispatch only fans the dirtiness out.
        self.node.notify_dependents();
    }

    fn abandon(&self) {
        self.node.clear_pending();
    }
}

impl<T> Observable for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        Memo::get(self)
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

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.node.id())
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
