use super::context::RequestContext;
use super::error::ApiError;
use super::response::BaseResponse;

/// Result every handler returns.
pub type HandlerResult = Result<BaseResponse, ApiError>;

/// A route handler.
///
/// Implemented for every `Fn(RequestContext) -> HandlerResult` closure. Handlers run
/// inside the connection coroutine, so blocking I/O through `may` primitives yields
/// instead of stalling the worker thread.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> HandlerResult;

    /// Source text of the handler body, used for response-shape inference.
    fn source(&self) -> Option<&str> {
        None
    }
}

impl<F> Handler for F
where
    F: Fn(RequestContext) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerResult {
        self(ctx)
    }
}

/// A handler paired with its own source text.
///
/// ```
/// use routegate::gate::{BaseResponse, RequestContext, HandlerResult, Sourced};
/// use routegate::handler;
///
/// #[handler]
/// fn hello(_ctx: RequestContext) -> HandlerResult {
///     Ok(BaseResponse::ok().with_data(serde_json::json!({ "greeting": "hi" })))
/// }
///
/// let h = Sourced::new(hello, HELLO_SOURCE);
/// # let _ = h;
/// ```
pub struct Sourced<F> {
    handler: F,
    source: &'static str,
}

impl<F> Sourced<F> {
    pub fn new(handler: F, source: &'static str) -> Self {
        Sourced { handler, source }
    }
}

impl<F> Handler for Sourced<F>
where
    F: Fn(RequestContext) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerResult {
        (self.handler)(ctx)
    }

    fn source(&self) -> Option<&str> {
        Some(self.source)
    }
}
