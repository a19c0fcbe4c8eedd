//! Dispatcher core module - hot path for request dispatch.
//!
//! Header storage stays on the stack for typical requests; allocations happen
//! for the envelope body and on the error paths.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use tracing::{debug, error, info};

use crate::gate::{error_envelope, panic_message, ApiError, ExecutionMode, InboundRequest};
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::RouteTable;

/// Maximum inline headers before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>`: they repeat across requests and clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Name of the correlation header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate a unique request ID for tracing (ULID string)
#[must_use]
pub fn generate_request_id() -> String {
    RequestId::new().to_string()
}

/// Response produced by a gate, a middleware or the dispatcher itself.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body. Strings are written as text, everything else as JSON.
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response with the given status, headers, and body
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a text response with an explicit content type.
    #[must_use]
    pub fn text(status: u16, content_type: &str, body: String) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self {
            status,
            headers,
            body: Value::String(body),
        }
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Fallback for requests no route matches.
#[must_use]
pub fn not_found_response(path: &str) -> HandlerResponse {
    HandlerResponse::json(404, json!({ "message": "Unknown URL", "path": path }))
}

/// Last-resort translation of a panic that escaped every gate.
///
/// A panic carrying an [`ApiError`] keeps its status and public message; any other
/// payload becomes a 500 whose message wraps the payload text.
#[must_use]
pub fn backstop_response(payload: Box<dyn Any + Send>, mode: ExecutionMode) -> HandlerResponse {
    let (status, message) = match payload.downcast::<ApiError>() {
        Ok(err) => (err.status(), err.public_message()),
        Err(other) => {
            let text = panic_message(other.as_ref())
                .unwrap_or_else(|| "Box<dyn Any>".to_string());
            (500, format!("An unknown error occurred, {text}"))
        }
    };
    let trace = mode
        .is_development()
        .then(|| std::backtrace::Backtrace::force_capture().to_string());
    HandlerResponse::json(status, error_envelope(&message, trace))
}

/// Immutable routing table bound at `App::finalize`.
///
/// Dispatch runs the global middleware chain, looks the request up in the radix
/// table and hands it to the route's gate. Anything that panics past a gate is
/// caught here and answered by [`backstop_response`].
pub struct Dispatcher {
    table: RouteTable,
    middlewares: Vec<Arc<dyn Middleware>>,
    mode: ExecutionMode,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        table: RouteTable,
        middlewares: Vec<Arc<dyn Middleware>>,
        mode: ExecutionMode,
    ) -> Self {
        info!(
            routes = table.len(),
            middleware_count = middlewares.len(),
            "Dispatcher bound"
        );
        Dispatcher {
            table,
            middlewares,
            mode,
        }
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Dispatch one request. Always produces a response.
    pub fn dispatch(&self, mut req: InboundRequest) -> HandlerResponse {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(&mut req)));
        match outcome {
            Ok(resp) => resp,
            Err(payload) => {
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    "Request escaped its gate - global error handler"
                );
                let mut resp = backstop_response(payload, self.mode);
                resp.set_header(REQUEST_ID_HEADER, req.request_id.to_string());
                resp
            }
        }
    }

    fn run(&self, req: &mut InboundRequest) -> HandlerResponse {
        let start = Instant::now();

        let mut early: Option<HandlerResponse> = None;
        for (idx, mw) in self.middlewares.iter().enumerate() {
            if early.is_none() {
                early = mw.before(req);
                if early.is_some() {
                    debug!(
                        request_id = %req.request_id,
                        middleware_idx = idx,
                        middleware_name = std::any::type_name_of_val(mw.as_ref()),
                        "Middleware returned early response"
                    );
                }
            }
        }

        let mut resp = match early {
            Some(resp) => resp,
            None => match self.table.lookup(&req.method, &req.path) {
                Some(route_match) => {
                    req.path_params = route_match.path_params;
                    route_match.gate.handle(req)
                }
                None => {
                    info!(
                        request_id = %req.request_id,
                        method = %req.method,
                        path = %req.path,
                        "No route matched"
                    );
                    not_found_response(&req.path)
                }
            },
        };

        let latency: Duration = start.elapsed();
        for mw in &self.middlewares {
            mw.after(req, &mut resp, latency);
        }
        resp.set_header(REQUEST_ID_HEADER, req.request_id.to_string());
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_echoes_path() {
        let resp = not_found_response("/nope");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, json!({ "message": "Unknown URL", "path": "/nope" }));
    }

    #[test]
    fn test_backstop_wraps_unknown_payload() {
        let resp = backstop_response(Box::new("socket exploded"), ExecutionMode::Production);
        assert_eq!(resp.status, 500);
        assert_eq!(
            resp.body["message"],
            "An unknown error occurred, socket exploded"
        );
        assert!(resp.body.get("traceStack").is_none());
    }

    #[test]
    fn test_backstop_keeps_api_error_status() {
        let resp = backstop_response(
            Box::new(ApiError::declared(403, "forbidden")),
            ExecutionMode::Development,
        );
        assert_eq!(resp.status, 403);
        assert_eq!(resp.body["message"], "forbidden");
        assert!(resp.body.get("traceStack").is_some());
    }

    #[test]
    fn test_set_header_replaces() {
        let mut resp = HandlerResponse::json(200, json!({}));
        resp.set_header("Content-Type", "text/plain".to_string());
        assert_eq!(resp.get_header("content-type"), Some("text/plain"));
        assert_eq!(resp.headers.len(), 1);
    }
}
