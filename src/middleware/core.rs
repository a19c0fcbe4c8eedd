use std::time::Duration;

use crate::dispatcher::HandlerResponse;
use crate::docs::DocsMiddleware;
use crate::gate::InboundRequest;

/// Hooks run around request handling.
///
/// Global middleware wraps route lookup; route and group middleware wrap a single
/// gate. `before` may answer the request itself by returning a response, in which
/// case later `before` hooks and the handler are skipped; `after` hooks always run.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &InboundRequest) -> Option<HandlerResponse> {
        None
    }

    fn after(&self, _req: &InboundRequest, _res: &mut HandlerResponse, _latency: Duration) {}

    /// Documentation trigger: when a middleware in the app stack returns
    /// `Some`, `App::finalize` assembles the OpenAPI document and installs it here.
    fn docs_trigger(&self) -> Option<&DocsMiddleware> {
        None
    }
}
