use std::io;
use std::sync::Arc;

use may_minihttp::{HttpService, HttpServiceFactory, Request, Response};
use serde_json::json;
use tracing::warn;

use super::request::parse_request;
use super::response::write_handler_response;
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::lifecycle::{Connection, ConnectionGuard, ConnectionSet};
use crate::middleware::MetricsMiddleware;

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

/// `GET` paths answered by the service itself; routes on them are never reached.
pub const BUILTIN_PATHS: [&str; 2] = [HEALTH_PATH, METRICS_PATH];

/// Per-connection HTTP service.
///
/// `/health` and `/metrics` are answered here; everything else goes through the
/// dispatcher. The service holds its connection's [`ConnectionGuard`], so the
/// connection leaves the set when the connection coroutine drops the service.
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<MetricsMiddleware>,
    _guard: Option<ConnectionGuard>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, metrics: Arc<MetricsMiddleware>) -> Self {
        AppService {
            dispatcher,
            metrics,
            _guard: None,
        }
    }

    /// Built-in endpoints answered without the dispatcher.
    #[must_use]
    pub fn respond(&self, method: &http::Method, path: &str) -> Option<HandlerResponse> {
        if *method != http::Method::GET {
            return None;
        }
        let resp = match path {
            HEALTH_PATH => health_response(),
            METRICS_PATH => metrics_response(&self.metrics),
            _ => return None,
        };
        self.metrics.inc_top_level_request();
        Some(resp)
    }
}

/// Basic health check response, `{ "status": "ok" }`.
#[must_use]
pub fn health_response() -> HandlerResponse {
    HandlerResponse::json(200, json!({ "status": "ok" }))
}

/// Prometheus text exposition of the request metrics.
#[must_use]
pub fn metrics_response(metrics: &MetricsMiddleware) -> HandlerResponse {
    HandlerResponse::text(200, "text/plain", metrics.render_prometheus())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let inbound = match parse_request(req) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, "Rejected unparseable request");
                let resp = HandlerResponse::json(
                    400,
                    json!({ "success": false, "message": e.to_string() }),
                );
                write_handler_response(res, resp);
                return Ok(());
            }
        };

        let resp = match self.respond(&inbound.method, &inbound.path) {
            Some(resp) => resp,
            None => self.dispatcher.dispatch(inbound),
        };
        write_handler_response(res, resp);
        Ok(())
    }
}

/// Builds one [`AppService`] per accepted connection and registers the
/// connection in the shared [`ConnectionSet`].
#[derive(Clone)]
pub struct AppServiceFactory {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<MetricsMiddleware>,
    connections: ConnectionSet,
}

impl AppServiceFactory {
    #[must_use]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        metrics: Arc<MetricsMiddleware>,
        connections: ConnectionSet,
    ) -> Self {
        AppServiceFactory {
            dispatcher,
            metrics,
            connections,
        }
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }
}

#[cfg(unix)]
fn connection_for(id: usize) -> Option<Arc<dyn Connection>> {
    let fd = i32::try_from(id).ok()?;
    Some(Arc::new(crate::lifecycle::SocketConnection::new(fd)))
}

#[cfg(not(unix))]
fn connection_for(_id: usize) -> Option<Arc<dyn Connection>> {
    None
}

impl HttpServiceFactory for AppServiceFactory {
    type Service = AppService;

    /// `id` is the accepted socket's descriptor.
    fn new_service(&self, id: usize) -> AppService {
        let mut service = AppService::new(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.metrics),
        );
        service._guard = connection_for(id).map(|conn| self.connections.register(conn));
        service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteTable;
    use http::Method;

    fn service() -> AppService {
        let dispatcher = Arc::new(Dispatcher::new(
            RouteTable::default(),
            Vec::new(),
            Default::default(),
        ));
        AppService::new(dispatcher, Arc::new(MetricsMiddleware::new()))
    }

    #[test]
    fn test_builtin_endpoints() {
        let svc = service();
        let health = svc.respond(&Method::GET, "/health").unwrap();
        assert_eq!(health.body, json!({ "status": "ok" }));

        let metrics = svc.respond(&Method::GET, "/metrics").unwrap();
        assert!(metrics
            .body
            .as_str()
            .unwrap()
            .contains("routegate_requests_total"));

        assert!(svc.respond(&Method::POST, "/health").is_none());
        assert!(svc.respond(&Method::GET, "/profile").is_none());
    }
}
