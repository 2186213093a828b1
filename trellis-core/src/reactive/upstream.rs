//! Upstream tuples.
//!
//! Derived values and subscriptions are constructed over an *ordered tuple*
//! of reactive nodes: `(a,)`, `(a, b)`, `(a, b, c)`, ... Their compute
//! functions and observers receive the upstream values positionally, as a
//! matching tuple. [`Upstreams`] abstracts over the arities (1 through 8)
//! so construction code is written once.

use std::sync::Weak;

use crate::schedule::Scheduler;

use super::node::{Dependent, Observable, Registration};

/// An ordered tuple of reactive nodes usable as the upstream set of a
/// [`Memo`](super::Memo) or [`Subscription`](super::Subscription).
pub trait Upstreams: Clone + Send + Sync + 'static {
    /// Tuple of the upstream value types, in upstream order.
    type Values;

    /// Register `dependent` with every upstream, in order.
    fn register(&self, dependent: &Weak<dyn Dependent>) -> Vec<Registration>;

    /// Read the current value of every upstream, in order. Reading a dirty
    /// memo upstream triggers its lazy recompute.
    fn values(&self) -> Self::Values;

    /// The scheduler shared by the upstream set. All nodes in one reactive
    /// graph are built against the same scheduler; the first upstream's is
    /// taken as authoritative.
    fn scheduler(&self) -> Scheduler;
}

macro_rules! impl_upstreams {
    ($head:ident $(, $tail:ident)*) => {
        #[allow(non_snake_case)]
        impl<$head: Observable $(, $tail: Observable)*> Upstreams for ($head, $($tail,)*) {
            type Values = ($head::Value, $($tail::Value,)*);

            fn register(&self, dependent: &Weak<dyn Dependent>) -> Vec<Registration> {
                let ($head, $($tail,)*) = self;
                vec![
                    $head.register_dependent(dependent.clone())
                    $(, $tail.register_dependent(dependent.clone()))*
                ]
            }

            fn values(&self) -> Self::Values {
                let ($head, $($tail,)*) = self;
                ($head.get(), $($tail.get(),)*)
            }

            fn scheduler(&self) -> Scheduler {
                let ($head, $($tail,)*) = self;
                $(let _ = $tail;)*
                Observable::scheduler($head)
            }
        }
    };
}

impl_upstreams!(A);
impl_upstreams!(A, B);
impl_upstreams!(A, B, C);
impl_upstreams!(A, B, C, D);
impl_upstreams!(A, B, C, D, E);
impl_upstreams!(A, B, C, D, E, F);
impl_upstreams!(A, B, C, D, E, F, G);
impl_upstreams!(A, B, C, D, E, F, G, H);
