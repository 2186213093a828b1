//! Crate error types.

use thiserror::Error;

/// Fatal conditions surfaced by [`Scheduler::flush`](crate::schedule::Scheduler::flush).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlushError {
    /// Cascading update passes failed to settle. This surfaces a programming
    /// bug in the reactive graph (typically a compute function or observer
    /// that writes back to one of its own upstreams); the queued work has
    /// been discarded and is not retried.
    #[error("too many nested updates ({passes} cascading passes without settling)")]
    TooManyNestedUpdates { passes: usize },
}
