use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::docs::{AppSwaggerEntry, DocDetail};
use crate::gate::{GateConfig, GateSchemas, Handler, ValidationGate};
use crate::infer::InferenceMode;
use crate::middleware::Middleware;
use crate::path_params::join_paths;
use crate::schema::Schema;

/// Optional schemas, middleware and documentation attached to a route.
///
/// Schemas are shared through `Arc`, so one schema value can back many routes.
#[derive(Clone, Default)]
pub struct RouteSchemas {
    pub params: Option<Arc<Schema>>,
    pub body: Option<Arc<Schema>>,
    pub query: Option<Arc<Schema>>,
    /// Documents the `data` of successful responses; not enforced at runtime.
    pub response: Option<Arc<Schema>>,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub detail: Option<DocDetail>,
}

impl RouteSchemas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn params(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.params = Some(schema.into());
        self
    }

    #[must_use]
    pub fn body(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.body = Some(schema.into());
        self
    }

    #[must_use]
    pub fn query(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.query = Some(schema.into());
        self
    }

    #[must_use]
    pub fn response(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.response = Some(schema.into());
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: DocDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl std::fmt::Debug for RouteSchemas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSchemas")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("response", &self.response)
            .field("middleware", &self.middleware.len())
            .field("detail", &self.detail)
            .finish()
    }
}

/// A declared route, owned by its [`Router`] until the router is registered.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Template relative to the router's mount point, `:param` syntax.
    pub path: String,
    pub handler: Arc<dyn Handler>,
    pub schemas: RouteSchemas,
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("schemas", &self.schemas)
            .finish_non_exhaustive()
    }
}

/// Route registry with a fluent, ownership-passing builder API.
///
/// ```
/// use routegate::gate::{BaseResponse, RequestContext, HandlerResult};
/// use routegate::router::{Router, RouteSchemas};
/// use routegate::schema::Schema;
///
/// fn show(_ctx: RequestContext) -> HandlerResult { Ok(BaseResponse::ok()) }
///
/// let mut router = Router::new()
///     .get("/profile", show, RouteSchemas::new())
///     .post(
///         "/profile",
///         show,
///         RouteSchemas::new().body(Schema::object([("content", Schema::string())])),
///     );
/// assert_eq!(router.routes().len(), 2);
///
/// let group = router.register();
/// assert_eq!(group.len(), 2);
/// assert!(router.routes().is_empty());
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<RouteDescriptor>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> Self {
        self.route(Method::GET, path, handler, schemas)
    }

    #[must_use]
    pub fn post(self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> Self {
        self.route(Method::POST, path, handler, schemas)
    }

    #[must_use]
    pub fn put(self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> Self {
        self.route(Method::PUT, path, handler, schemas)
    }

    #[must_use]
    pub fn patch(self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> Self {
        self.route(Method::PATCH, path, handler, schemas)
    }

    #[must_use]
    pub fn delete(self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> Self {
        self.route(Method::DELETE, path, handler, schemas)
    }

    /// Declare a route for any method.
    #[must_use]
    pub fn route(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        schemas: RouteSchemas,
    ) -> Self {
        self.push(method, path, Arc::new(handler), schemas);
        self
    }

    /// Non-consuming form of [`Router::route`], for routes declared in a loop.
    pub fn push(
        &mut self,
        method: Method,
        path: &str,
        handler: Arc<dyn Handler>,
        schemas: RouteSchemas,
    ) -> &mut Self {
        debug!(method = %method, route = %path, "Route declared");
        self.routes.push(RouteDescriptor {
            method,
            path: path.to_string(),
            handler,
            schemas,
        });
        self
    }

    /// Declared routes, in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Documentation entries for every declared route as mounted under `prefix`.
    #[must_use]
    pub fn swagger_entries(&self, prefix: &str, inference: InferenceMode) -> Vec<AppSwaggerEntry> {
        self.routes
            .iter()
            .map(|route| AppSwaggerEntry::describe(prefix, route, inference))
            .collect()
    }

    /// Drain every declared route into a mountable group. The router is empty
    /// afterwards and may be reused.
    pub fn register(&mut self) -> RouteGroup {
        let routes: Vec<BoundRoute> = self.routes.drain(..).map(BoundRoute::from).collect();
        debug!(routes = routes.len(), "Router registered");
        RouteGroup { routes }
    }
}

/// A route whose schemas have been split into what its gate enforces.
#[derive(Clone)]
pub struct BoundRoute {
    pub method: Method,
    pub path: String,
    pub handler: Arc<dyn Handler>,
    pub schemas: GateSchemas,
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl From<RouteDescriptor> for BoundRoute {
    fn from(route: RouteDescriptor) -> Self {
        BoundRoute {
            method: route.method,
            path: route.path,
            handler: route.handler,
            schemas: GateSchemas {
                params: route.schemas.params,
                body: route.schemas.body,
                query: route.schemas.query,
            },
            middleware: route.schemas.middleware,
        }
    }
}

impl BoundRoute {
    /// Wrap the route in its gate. Group middleware runs before route middleware.
    #[must_use]
    pub fn into_gate(
        self,
        prefix: &str,
        group_middleware: &[Arc<dyn Middleware>],
        config: GateConfig,
    ) -> ValidationGate {
        let template = join_paths(prefix, &self.path);
        let mut middleware: Vec<Arc<dyn Middleware>> = group_middleware.to_vec();
        middleware.extend(self.middleware);
        ValidationGate::new(self.method, template, self.schemas, self.handler, config)
            .with_middleware(middleware)
    }
}

/// Mountable unit produced by [`Router::register`].
#[derive(Clone, Default)]
pub struct RouteGroup {
    routes: Vec<BoundRoute>,
}

impl RouteGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build one gate per route under `prefix`.
    #[must_use]
    pub fn into_gates(
        self,
        prefix: &str,
        group_middleware: &[Arc<dyn Middleware>],
        config: GateConfig,
    ) -> Vec<ValidationGate> {
        self.routes
            .into_iter()
            .map(|route| route.into_gate(prefix, group_middleware, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{BaseResponse, HandlerResult, RequestContext};

    fn ok(_ctx: RequestContext) -> HandlerResult {
        Ok(BaseResponse::ok())
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let router = Router::new()
            .get("/b", ok, RouteSchemas::new())
            .post("/a", ok, RouteSchemas::new())
            .delete("/c/:id", ok, RouteSchemas::new());
        let declared: Vec<(&Method, &str)> = router
            .routes()
            .iter()
            .map(|r| (&r.method, r.path.as_str()))
            .collect();
        assert_eq!(
            declared,
            vec![
                (&Method::GET, "/b"),
                (&Method::POST, "/a"),
                (&Method::DELETE, "/c/:id")
            ]
        );
    }

    #[test]
    fn test_register_drains() {
        let mut router = Router::new().put("/x", ok, RouteSchemas::new());
        let group = router.register();
        assert_eq!(group.len(), 1);
        assert!(router.routes().is_empty());
        assert!(router.register().is_empty());
    }

    #[test]
    fn test_gates_carry_prefixed_templates() {
        let mut router = Router::new().patch("/items/:id", ok, RouteSchemas::new());
        let gates = router
            .register()
            .into_gates("/api", &[], GateConfig::default());
        assert_eq!(gates[0].template(), "/api/items/:id");
        assert_eq!(gates[0].method(), &Method::PATCH);
    }

    #[test]
    fn test_swagger_entries_follow_declarations() {
        let router = Router::new()
            .get("/profile", ok, RouteSchemas::new())
            .post("/profile", ok, RouteSchemas::new());
        let entries = router.swagger_entries("/api", InferenceMode::Off);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/api/profile");
        assert_eq!(entries[1].method, Method::POST);
    }
}
