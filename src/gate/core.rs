use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::context::{InboundRequest, RequestContext};
use super::error::ApiError;
use super::handler::Handler;
use super::response::{error_envelope, validation_envelope};
use crate::dispatcher::HandlerResponse;
use crate::middleware::Middleware;
use crate::path_params::{default_params_schema, extract_path_params};
use crate::schema::{Schema, ValidationError};

/// Whether error bodies may carry stack traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Development,
    #[default]
    Production,
}

impl ExecutionMode {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == ExecutionMode::Development
    }
}

/// Per-gate behaviour switches, shared by every route of an app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub mode: ExecutionMode,
    /// Treat a declared error whose message mentions "not found" as a 404,
    /// whatever status it declared.
    ///
    /// Off by default, so declared statuses are kept as they are. Turn it on with
    /// `gate.not_found_message_override: true` in the config file.
    pub not_found_message_override: bool,
}

/// Schemas enforced by one gate. Absent schemas accept anything.
#[derive(Debug, Clone, Default)]
pub struct GateSchemas {
    pub params: Option<Arc<Schema>>,
    pub body: Option<Arc<Schema>>,
    pub query: Option<Arc<Schema>>,
}

/// Validation and error-translation wrapper around one route handler.
///
/// Each request moves through `validating -> executing -> responded`, short-circuiting
/// to a 400 on the first schema rejection (params, then body, then query) and to an
/// error envelope when the handler fails or panics.
pub struct ValidationGate {
    method: Method,
    template: String,
    params: Option<Arc<Schema>>,
    body: Option<Arc<Schema>>,
    query: Option<Arc<Schema>>,
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
    config: GateConfig,
}

impl ValidationGate {
    /// Build a gate. Without an explicit params schema, every `:name` segment of
    /// `template` becomes a required string.
    pub fn new(
        method: Method,
        template: impl Into<String>,
        schemas: GateSchemas,
        handler: Arc<dyn Handler>,
        config: GateConfig,
    ) -> Self {
        let template = template.into();
        let params = schemas.params.or_else(|| {
            default_params_schema(&extract_path_params(&template)).map(Arc::new)
        });
        ValidationGate {
            method,
            template,
            params,
            body: schemas.body,
            query: schemas.query,
            handler,
            middleware: Vec::new(),
            config,
        }
    }

    /// Route-level middleware, run around validation and execution.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.middleware = middleware;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Run the full pipeline for one request.
    pub fn handle(&self, req: &InboundRequest) -> HandlerResponse {
        let start = Instant::now();
        let mut early = None;
        for mw in &self.middleware {
            if early.is_none() {
                early = mw.before(req);
            }
        }

        let mut resp = match early {
            Some(resp) => resp,
            None => match self.validate(req) {
                Ok(ctx) => self.execute(ctx),
                Err(err) => {
                    warn!(
                        request_id = %req.request_id,
                        method = %self.method,
                        route = %self.template,
                        issues = err.issues.len(),
                        error = %err,
                        "Request validation failed"
                    );
                    HandlerResponse::json(400, validation_envelope(&err))
                }
            },
        };

        let latency = start.elapsed();
        for mw in &self.middleware {
            mw.after(req, &mut resp, latency);
        }
        resp
    }

    /// `validating`: params, body, query, in that order. The first rejection wins.
    pub fn validate(&self, req: &InboundRequest) -> Result<RequestContext, ValidationError> {
        let params = check(self.params.as_deref(), req.params_object(), true)?;
        let body = check(self.body.as_deref(), req.json_body()?, false)?;
        let query = check(
            self.query.as_deref(),
            Value::Object(req.query.clone()),
            true,
        )?;

        debug!(
            request_id = %req.request_id,
            route = %self.template,
            "Request validated"
        );

        Ok(RequestContext {
            request_id: req.request_id,
            method: req.method.clone(),
            path: req.path.clone(),
            params,
            body,
            query,
            headers: req.headers.clone(),
        })
    }

    /// `executing`: run the handler and translate its outcome.
    pub fn execute(&self, ctx: RequestContext) -> HandlerResponse {
        let request_id = ctx.request_id;
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.handler.call(ctx)));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(resp)) => {
                let status = resp.http_status();
                info!(
                    request_id = %request_id,
                    method = %self.method,
                    route = %self.template,
                    status,
                    execution_time_ms = elapsed_ms,
                    "Handler responded"
                );
                HandlerResponse::json(status, resp.into_envelope())
            }
            Ok(Err(err)) => {
                let resp = self.error_response(&err);
                if resp.status >= 500 {
                    error!(
                        request_id = %request_id,
                        route = %self.template,
                        error = %err,
                        "Handler error"
                    );
                } else {
                    info!(
                        request_id = %request_id,
                        route = %self.template,
                        status = resp.status,
                        error = %err,
                        "Handler declined request"
                    );
                }
                resp
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref())
                    .unwrap_or_else(|| "handler panicked".to_string());
                error!(
                    request_id = %request_id,
                    route = %self.template,
                    panic_message = %message,
                    "Handler panicked"
                );
                let trace = self.config.mode.is_development().then(|| {
                    format!("{message}\n{}", std::backtrace::Backtrace::force_capture())
                });
                HandlerResponse::json(500, error_envelope("Internal server error", trace))
            }
        }
    }

    /// Translate a handler error into its response.
    #[must_use]
    pub fn error_response(&self, err: &ApiError) -> HandlerResponse {
        match err {
            ApiError::Validation(e) => HandlerResponse::json(400, validation_envelope(e)),
            ApiError::Declared { status, message } => {
                let status = if self.config.not_found_message_override
                    && message.to_ascii_lowercase().contains("not found")
                {
                    404
                } else {
                    *status
                };
                HandlerResponse::json(status, error_envelope(message, None))
            }
            ApiError::NotFound(message) => {
                HandlerResponse::json(404, error_envelope(message, None))
            }
            ApiError::Unhandled(e) => {
                let trace = self.config.mode.is_development().then(|| format!("{e:?}"));
                HandlerResponse::json(500, error_envelope("Internal server error", trace))
            }
        }
    }
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("params", &self.params.is_some())
            .field("body", &self.body.is_some())
            .field("query", &self.query.is_some())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

fn check(schema: Option<&Schema>, value: Value, coerce: bool) -> Result<Value, ValidationError> {
    match schema {
        None => Ok(value),
        Some(s) if coerce => s.parse_coerced(&value),
        Some(s) => s.parse(&value),
    }
}

/// Text carried by a panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{BaseResponse, HandlerResult};
    use serde_json::json;

    fn gate<H: Handler>(
        method: Method,
        template: &str,
        schemas: GateSchemas,
        h: H,
    ) -> ValidationGate {
        ValidationGate::new(method, template, schemas, Arc::new(h), GateConfig::default())
    }

    fn echo(ctx: RequestContext) -> HandlerResult {
        Ok(BaseResponse::ok().with_data(json!({ "params": ctx.params, "body": ctx.body })))
    }

    #[test]
    fn test_params_checked_before_body() {
        let g = gate(
            Method::POST,
            "/items/:id",
            GateSchemas {
                body: Some(Arc::new(Schema::object([("content", Schema::string())]))),
                ..GateSchemas::default()
            },
            echo,
        );
        let err = g
            .validate(&InboundRequest::new(Method::POST, "/items/1"))
            .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "id");
    }

    #[test]
    fn test_handler_panic_becomes_500() {
        let g = gate(
            Method::GET,
            "/boom",
            GateSchemas::default(),
            |_ctx: RequestContext| -> HandlerResult { panic!("kaboom") },
        );
        let resp = g.handle(&InboundRequest::new(Method::GET, "/boom"));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["message"], "Internal server error");
        assert!(resp.body.get("traceStack").is_none());
    }

    #[test]
    fn test_development_mode_attaches_trace() {
        let g = ValidationGate::new(
            Method::GET,
            "/fail",
            GateSchemas::default(),
            Arc::new(|_ctx: RequestContext| -> HandlerResult {
                Err(anyhow::anyhow!("database unavailable").into())
            }),
            GateConfig {
                mode: ExecutionMode::Development,
                not_found_message_override: false,
            },
        );
        let resp = g.handle(&InboundRequest::new(Method::GET, "/fail"));
        assert_eq!(resp.status, 500);
        assert!(resp.body["traceStack"]
            .as_str()
            .unwrap()
            .contains("database unavailable"));
    }

    #[test]
    fn test_not_found_override_is_opt_in() {
        let err = ApiError::declared(400, "profile not found");
        let plain = gate(Method::GET, "/p", GateSchemas::default(), echo);
        assert_eq!(plain.error_response(&err).status, 400);

        let overriding = ValidationGate::new(
            Method::GET,
            "/p",
            GateSchemas::default(),
            Arc::new(echo),
            GateConfig {
                mode: ExecutionMode::Production,
                not_found_message_override: true,
            },
        );
        let resp = overriding.error_response(&err);
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["message"], "profile not found");
    }

    #[test]
    fn test_panic_message_from_payload() {
        let payload: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(payload.as_ref()).as_deref(), Some("static text"));
        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert!(panic_message(payload.as_ref()).is_none());
    }
}
