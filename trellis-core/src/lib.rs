//! Trellis Core
//!
//! This crate provides the core reactive runtime for the Trellis UI
//! framework. It implements:
//!
//! - Reactive primitives (signals, memos, subscriptions)
//! - Deferred, coalesced change propagation with cycle detection
//!
//! Rendering, component lifecycle, and transport layers live in their own
//! crates and consume this one through `subscribe`/`map` and synchronous
//! `get` reads.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: signals, memos, subscriptions, and the dependent-tracking
//!   node machinery they share
//! - `schedule`: the batching scheduler that defers notification to the end
//!   of the current turn and breaks runaway update cycles
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::reactive::{Observable, Signal};
//! use trellis_core::schedule::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let count = Signal::new(&scheduler, 0);
//! let doubled = count.map(|v| v * 2);
//!
//! let _sub = doubled.subscribe(|v| println!("doubled: {v}"));
//!
//! count.set(3);
//! scheduler.flush()?;   // prints: "doubled: 6"
//! ```

pub mod error;
pub mod reactive;
pub mod schedule;
