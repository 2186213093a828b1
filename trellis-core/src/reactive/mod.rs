//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and
//! subscriptions. These primitives form the foundation of Trellis's
//! fine-grained, glitch-free state propagation.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for mutable state and the root of every
//! reactive graph. Writing a signal is synchronous and immediately visible
//! to synchronous reads, but dependents are notified in a deferred batch at
//! the end of the turn.
//!
//! ## Memos
//!
//! A [`Memo`] is a derived value computed from an ordered tuple of upstream
//! nodes by a pure function. It caches its result and recomputes lazily,
//! at most once between two upstream changes, however often it is read.
//!
//! ## Subscriptions
//!
//! A [`Subscription`] binds an observer to one or more reactive nodes.
//! When several of its upstreams change in the same turn, the observer
//! still fires exactly once, with the latest value of each.
//!
//! # Implementation Notes
//!
//! Dependencies are declared explicitly as upstream tuples rather than
//! discovered by tracking reads. That keeps propagation fully predictable:
//! a write marks its direct dependents dirty through the scheduler, and
//! dirtiness fans out one flush pass per graph layer until observers fire
//! with settled values. Dependent links are weak back-references keyed by
//! registration id, so node lifetimes are governed entirely by the handles
//! consumers hold.

mod memo;
mod node;
mod signal;
mod subscription;
mod upstream;

pub use memo::Memo;
pub use node::{Dependent, NodeId, NodeKind, Observable, Registration};
pub use signal::Signal;
pub use subscription::Subscription;
pub use upstream::Upstreams;
