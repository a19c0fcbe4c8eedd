//! # Router Module
//!
//! Two halves live here:
//!
//! - the **registry** ([`Router`]): a fluent, ownership-passing builder that
//!   collects [`RouteDescriptor`]s. [`Router::register`] drains it into a
//!   [`RouteGroup`] that an [`App`](crate::app::App) mounts under a prefix;
//! - the **route table** ([`RouteTable`]): the radix tree of bound
//!   [`ValidationGate`](crate::gate::ValidationGate)s consulted on every request.
//!
//! Templates mark parameters with `:name`. Matching tries static segments before
//! parameters, and when two routes bind the same method and template the first
//! one registered is kept. Declaration order only matters for documentation.

mod core;
mod radix;
mod registry;

pub use core::{ParamVec, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
pub use radix::RadixRouter;
pub use registry::{BoundRoute, RouteDescriptor, RouteGroup, RouteSchemas, Router};
