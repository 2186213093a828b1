//! Update Scheduling
//!
//! This module implements the batching scheduler that gives Trellis its
//! deferred, coalesced change propagation.
//!
//! # Overview
//!
//! Writes to reactive values never notify their dependents synchronously.
//! Instead, a changed node marks itself pending and hands the scheduler a
//! handle to its dispatch routine. The host (a render loop or a test
//! harness) calls [`Scheduler::flush`] once at the end of its synchronous
//! turn; the scheduler then drains the queue in first-scheduled order.
//!
//! # Design Decisions
//!
//! 1. The scheduler is an explicit, cheaply cloneable handle rather than a
//!    process-wide singleton. Every `Signal` takes one at construction and
//!    derived nodes inherit it from their upstreams. Tests get isolated
//!    scheduler state by simply creating a fresh instance.
//!
//! 2. Work scheduled *during* a flush pass goes into a fresh queue that is
//!    processed as the next pass, never appended to the in-flight one. This
//!    queue-swap discipline is the only reentrancy mechanism needed in a
//!    single-threaded cooperative model.
//!
//! 3. A graph that keeps producing new work for 100 consecutive cascading
//!    passes is assumed to contain an update cycle; the flush aborts with a
//!    fatal error instead of starving the host.

mod scheduler;
mod task;

pub use scheduler::{Scheduler, MAX_CASCADE_PASSES};

pub(crate) use scheduler::Schedulable;
