//! # Validation Gate
//!
//! Every bound route is wrapped in a [`ValidationGate`]. The gate turns an
//! [`InboundRequest`] into a validated [`RequestContext`], runs the handler and
//! shapes the outcome into the uniform JSON envelope:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | handler `Ok` | `statusCode` or 200 | `{success: true, message: "Request successful", ...}` |
//! | schema rejection | 400 | `{success: false, message, details: [{path, message}]}` |
//! | `ApiError::Declared` | declared status | `{success: false, message}` |
//! | `ApiError::NotFound` | 404 | `{success: false, message}` |
//! | `ApiError::Unhandled` / panic | 500 | `{success: false, message: "Internal server error", traceStack?}` |
//!
//! `traceStack` is only attached in [`ExecutionMode::Development`].

mod context;
mod core;
mod error;
mod handler;
mod response;

pub use context::{InboundRequest, RequestContext};
pub use core::{ExecutionMode, GateConfig, GateSchemas, ValidationGate};
pub(crate) use core::panic_message;
pub use error::ApiError;
pub use handler::{Handler, HandlerResult, Sourced};
pub use response::{error_envelope, validation_envelope, BaseResponse};
