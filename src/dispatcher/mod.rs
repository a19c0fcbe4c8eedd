//! # Dispatcher Module
//!
//! The dispatcher is the bound, read-only routing table produced by
//! [`App::finalize`](crate::app::App::finalize). It is shared behind an `Arc` by every
//! connection coroutine and never mutated after binding.
//!
//! ## Request Flow
//!
//! 1. Global middleware `before` hooks run in registration order; the first one
//!    returning a response short-circuits the rest (metrics, docs, health)
//! 2. The radix table matches method and path, binding `:param` segments
//! 3. The route's [`ValidationGate`](crate::gate::ValidationGate) validates and runs
//!    the handler
//! 4. Unmatched requests get `404 {message: "Unknown URL", path}`
//! 5. Global middleware `after` hooks observe the final response
//!
//! ## Error Handling
//!
//! Gates translate their own failures. A panic that escapes a gate (for example
//! from middleware) is caught by the dispatcher and answered by the global error
//! handler, [`backstop_response`].

mod core;

pub use core::{
    backstop_response, generate_request_id, not_found_response, Dispatcher, HandlerResponse,
    HeaderVec, MAX_INLINE_HEADERS, REQUEST_ID_HEADER,
};
