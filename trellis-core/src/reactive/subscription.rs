//! Subscription implementation.
//!
//! A Subscription is an observer record bound to one or more reactive
//! nodes. However many of its upstreams change within one flush cycle, the
//! observer fires once, with the latest value of every upstream. This is
//! the glitch-free guarantee that makes diamond-shaped graphs safe to
//! consume.
//!
//! Upstream registries hold only weak back-references, so a subscription
//! lives exactly as long as its last handle: dropping it (or calling
//! [`unsubscribe`](Subscription::unsubscribe)) ends delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::schedule::Schedulable;

use super::node::{Dependent, NodeKind, NodeState};
use super::upstream::Upstreams;

/// Handle to an observer bound to a tuple of reactive nodes.
///
/// Cloning yields another handle to the same record; the record stays alive
/// while any handle does.
///
/// # Example
///
/// ```rust,ignore
/// let sub = Subscription::new((first.clone(), last.clone()), |(first, last)| {
///     println!("{first} {last}");
/// });
/// ```
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    node: NodeState,
    weak: Weak<SubscriptionInner>,

    /// Upstream changes seen since the last dispatch. Only the zero/nonzero
    /// transition matters for scheduling; the count is kept for tracing.
    pending_updates: AtomicUsize,

    /// Reads all upstream values and invokes the observer with them.
    observer: Mutex<Box<dyn FnMut() + Send>>,

    /// One registration per upstream; drained on unsubscribe.
    registrations: Mutex<Vec<super::node::Registration>>,
}

impl Subscription {
    /// Bind `observer` to an ordered tuple of upstream nodes. The observer
    /// receives all upstream values positionally, once per flush cycle in
    /// which any of them changed.
    pub fn new<U, F>(upstreams: U, observer: F) -> Self
    where
        U: Upstreams,
        F: FnMut(U::Values) + Send + 'static,
    {
        let scheduler = upstreams.scheduler();
        let mut observer = observer;
        let inner = Arc::new_cyclic(|weak: &Weak<SubscriptionInner>| {
            let dependent: Weak<dyn Dependent> = weak.clone();
            let registrations = upstreams.register(&dependent);
            SubscriptionInner {
                node: NodeState::new(NodeKind::Observer, scheduler),
                weak: weak.clone(),
                pending_updates: AtomicUsize::new(0),
                observer: Mutex::new(Box::new(move || observer(upstreams.values()))),
                registrations: Mutex::new(registrations),
            }
        });
        Self { inner }
    }

    /// Revoke every upstream registration. Subsequent upstream changes no
    /// longer reach this subscription. Idempotent, and safe to call from
    /// within the observer callback itself.
    pub fn unsubscribe(&self) {
        self.inner.registrations.lock().clear();
    }

    /// Whether any upstream registration is still in place.
    pub fn is_active(&self) -> bool {
        !self.inner.registrations.lock().is_empty()
    }
}

impl Dependent for SubscriptionInner {
    fn on_dependency_updated(&self) {
        self.pending_updates.fetch_add(1, Ordering::SeqCst);
        // One scheduled dispatch per flush cycle, no matter how many
        // upstreams changed.
        self.node.invalidate(self.weak.clone());
    }
}

impl Schedulable for SubscriptionInner {
    fn dispatch(&self) {
        self.node.clear_pending();
        let updates = self.pending_updates.swap(0, Ordering::SeqCst);

        // Unsubscribed between scheduling and dispatch.
        if self.registrations.lock().is_empty() {
            return;
        }

        tracing::trace!(updates, "delivering coalesced subscription update");
        let mut observer = self.observer.lock();
        (observer)();
    }

    fn abandon(&self) {
        self.node.clear_pending();
        self.pending_updates.store(0, Ordering::SeqCst);
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.node.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Observable, Signal};
    use crate::schedule::Scheduler;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn single_source_forwards_latest_value() {
        let scheduler = Scheduler::new();
        let signal = Signal::new(&scheduler, 0);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = signal.subscribe(move |v| seen_clone.lock().push(v));

        signal.set(1);
        signal.set(2);
        scheduler.flush().unwrap();

        // One delivery per turn, carrying the value present at flush time.
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn multi_source_coalesces_into_one_invocation() {
        let scheduler = Scheduler::new();
        let a = Signal::new(&scheduler, 1);
        let b = Signal::new(&scheduler, 2);
        let c = Signal::new(&scheduler, 3);

        let calls = Arc::new(AtomicI32::new(0));
        let seen = Arc::new(Mutex::new((0, 0, 0)));
        let calls_clone = calls.clone();
        let seen_clone = seen.clone();
        let _sub = Subscription::new(
            (a.clone(), b.clone(), c.clone()),
            move |(a, b, c)| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                *seen_clone.lock() = (a, b, c);
            },
        );

        a.set(10);
        b.set(20);
        c.set(30);
        scheduler.flush().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), (10, 20, 30));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let scheduler = Scheduler::new();
        let signal = Signal::new(&scheduler, 0);

        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let sub = signal.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        scheduler.flush().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(signal.dependent_count(), 0);

        signal.set(2);
        scheduler.flush().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let scheduler = Scheduler::new();
        let signal = Signal::new(&scheduler, 0);

        let sub = signal.subscribe(|_| {});
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn unsubscribe_between_write_and_flush_suppresses_delivery() {
        let scheduler = Scheduler::new();
        let signal = Signal::new(&scheduler, 0);

        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let sub = signal.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        scheduler.flush().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        signal.set(2);
        sub.unsubscribe();
        scheduler.flush().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_last_handle_ends_delivery() {
        let scheduler = Scheduler::new();
        let signal = Signal::new(&scheduler, 0);

        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let sub = signal.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);

        signal.set(1);
        scheduler.flush().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_over_memos_reads_fresh_values() {
        let scheduler = Scheduler::new();
        let base = Signal::new(&scheduler, 2);
        let squared = base.map(|v| v * v);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = squared.subscribe(move |v| seen_clone.lock().push(v));

        base.set(5);
        scheduler.flush().unwrap();

        assert_eq!(*seen.lock(), vec![25]);
    }
}
