//! Reactive node bookkeeping.
//!
//! Every reactive value, whether a mutable [`Signal`](super::Signal) or a
//! derived [`Memo`](super::Memo), shares the same dependent-tracking
//! machinery: a registry of weak back-references to whoever wants update
//! notifications, and a pending flag that coalesces many invalidations in
//! one turn into a single scheduled dispatch. That machinery lives in
//! [`NodeState`], which the concrete node types hold by composition.
//!
//! Back-references are weak on purpose. A node never owns its dependents'
//! lifetimes; the registry exists purely for notification fan-out, and dead
//! entries are pruned lazily during the next fan-out.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::schedule::{Schedulable, Scheduler};

use super::memo::Memo;
use super::subscription::Subscription;

/// Unique identifier for a reactive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The kind of reactive node.
///
/// External layers use this to tell writable sources apart from read-only
/// derived values (two-way binding needs a `Source`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A mutable root value. No upstreams, only dependents.
    Source,

    /// A memoized derived value. Has upstreams and may have dependents.
    Derived,

    /// An observer record. Has upstreams but no dependents; it produces
    /// side effects, not values.
    Observer,
}

impl NodeKind {
    pub fn is_writable(&self) -> bool {
        matches!(self, NodeKind::Source)
    }
}

/// Hook invoked on a dependent when one of its upstreams has dispatched a
/// change notification.
pub trait Dependent: Send + Sync {
    fn on_dependency_updated(&self);
}

type DependentMap = IndexMap<u64, Weak<dyn Dependent>>;

/// Revocable record of a single dependent registration.
///
/// Removing is idempotent: calling [`unsubscribe`](Self::unsubscribe) more
/// than once, or after the node is gone, is a no-op. Dropping the
/// registration also removes it (guard style).
pub struct Registration {
    entries: Weak<Mutex<DependentMap>>,
    id: u64,
}

impl Registration {
    /// Remove exactly this entry from the node's dependent registry.
    pub fn unsubscribe(&self) {
        if let Some(entries) = self.entries.upgrade() {
            entries.lock().shift_remove(&self.id);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

/// Shared per-node bookkeeping, held by composition in each node variant.
pub(crate) struct NodeState {
    id: NodeId,
    kind: NodeKind,
    scheduler: Scheduler,
    dependents: Arc<Mutex<DependentMap>>,
    next_registration: AtomicU64,
    /// True between "marked dirty" and "flushed"; makes invalidation
    /// idempotent within a turn.
    pending: AtomicBool,
}

impl NodeState {
    pub fn new(kind: NodeKind, scheduler: Scheduler) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            scheduler,
            dependents: Arc::new(Mutex::new(IndexMap::new())),
            next_registration: AtomicU64::new(0),
            pending: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Record a back-reference to `dependent` under a freshly issued local
    /// id and hand back the capability to revoke it.
    pub fn register_dependent(&self, dependent: Weak<dyn Dependent>) -> Registration {
        let id = self.next_registration.fetch_add(1, Ordering::Relaxed);
        self.dependents.lock().insert(id, dependent);
        Registration {
            entries: Arc::downgrade(&self.dependents),
            id,
        }
    }

    /// Invoke every live dependent's update hook.
    ///
    /// Iterates over a snapshot so dependents may unsubscribe themselves or
    /// others mid-iteration. Entries whose dependent has been dropped are
    /// pruned afterwards.
    pub fn notify_dependents(&self) {
        let snapshot: SmallVec<[(u64, Weak<dyn Dependent>); 8]> = self
            .dependents
            .lock()
            .iter()
            .map(|(id, weak)| (*id, weak.clone()))
            .collect();

        let mut dead: SmallVec<[u64; 4]> = SmallVec::new();
        for (id, weak) in snapshot {
            match weak.upgrade() {
                Some(dependent) => dependent.on_dependency_updated(),
                None => dead.push(id),
            }
        }

        if !dead.is_empty() {
            let mut entries = self.dependents.lock();
            for id in dead {
                entries.shift_remove(&id);
            }
        }
    }

    /// Mark this node pending and hand its dispatch handle to the
    /// scheduler. No-op while already pending: many upstream changes within
    /// one turn produce exactly one scheduled dispatch.
    pub fn invalidate(&self, node: Weak<dyn Schedulable>) {
        if !self.pending.swap(true, Ordering::SeqCst) {
            self.scheduler.enqueue(node);
        }
    }

    pub fn clear_pending(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.lock().len()
    }
}

/// The read capability shared by every reactive value.
///
/// Implemented by [`Signal`](super::Signal) (writable source) and
/// [`Memo`](super::Memo) (read-only derived value). Handles are cheap
/// clones of shared state, so the trait requires `Clone`.
pub trait Observable: Clone + Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Current value. Sources return stored state; memos lazily recompute
    /// first if they have been invalidated.
    fn get(&self) -> Self::Value;

    fn id(&self) -> NodeId;

    fn kind(&self) -> NodeKind;

    /// The scheduler this node was built against. Derived nodes and
    /// subscriptions inherit it from their upstreams.
    fn scheduler(&self) -> Scheduler;

    /// Register `dependent` for update notifications from this node.
    fn register_dependent(&self, dependent: Weak<dyn Dependent>) -> Registration;

    /// Whether this node accepts writes (i.e. is a `Source`).
    fn is_writable(&self) -> bool {
        self.kind().is_writable()
    }

    /// Build a memoized derived value whose sole upstream is this node.
    fn map<U, F>(&self, transform: F) -> Memo<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(Self::Value) -> U + Send + Sync + 'static,
    {
        Memo::new((self.clone(),), move |(value,)| transform(value))
    }

    /// Observe this node, invoking `observer` with the latest value once
    /// per flush cycle in which it changed.
    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: FnMut(Self::Value) + Send + 'static,
    {
        let mut observer = observer;
        Subscription::new((self.clone(),), move |(value,)| observer(value))
    }
}
