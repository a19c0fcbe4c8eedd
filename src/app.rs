//! # App
//!
//! Registration-phase server. Routes are declared directly on the [`App`] or on
//! [`Router`]s mounted under a prefix; middleware is added with
//! [`App::use_middleware`]. [`App::finalize`] consumes the app and binds everything
//! into an immutable [`Dispatcher`], and [`App::listen`] serves it until a
//! termination signal arrives.
//!
//! ```no_run
//! use std::sync::Arc;
//! use routegate::app::App;
//! use routegate::config::AppConfig;
//! use routegate::docs::{DocsConfig, DocsMiddleware};
//! use routegate::gate::{BaseResponse, HandlerResult, RequestContext};
//! use routegate::router::{RouteSchemas, Router};
//!
//! fn profile(_ctx: RequestContext) -> HandlerResult {
//!     Ok(BaseResponse::ok().with_data(serde_json::json!({ "name": "Ada" })))
//! }
//!
//! let mut app = App::new(AppConfig::default());
//! let mut api = Router::new().get("/profile", profile, RouteSchemas::new());
//! app.router("/api", &mut api, Vec::new());
//! app.use_middleware(Arc::new(DocsMiddleware::new(DocsConfig::default())));
//!
//! let status = app.listen("0.0.0.0:8080", || println!("bye")).unwrap();
//! std::process::exit(status);
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::Context;
use http::Method;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::docs::{assemble, AppSwaggerEntry, OpenApiDocument};
use crate::gate::Handler;
use crate::lifecycle::{wait_for_termination, ConnectionSet, ShutdownOutcome, Supervisor};
use crate::middleware::{MetricsMiddleware, Middleware, TracingMiddleware};
use crate::router::{RouteGroup, RouteSchemas, RouteTable, Router};
use crate::server::{AppServiceFactory, HttpServer, ServerHandle, BUILTIN_PATHS};

struct Mount {
    prefix: String,
    group: RouteGroup,
    middleware: Vec<Arc<dyn Middleware>>,
}

pub struct App {
    config: AppConfig,
    mounts: Vec<Mount>,
    middlewares: Vec<Arc<dyn Middleware>>,
    entries: Vec<AppSwaggerEntry>,
    metrics: Arc<MetricsMiddleware>,
}

impl Default for App {
    fn default() -> Self {
        App::new(AppConfig::default())
    }
}

impl App {
    /// New app with the metrics and tracing middleware already installed.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let metrics = Arc::new(MetricsMiddleware::new());
        App {
            config,
            mounts: Vec::new(),
            middlewares: vec![
                Arc::clone(&metrics) as Arc<dyn Middleware>,
                Arc::new(TracingMiddleware),
            ],
            entries: Vec::new(),
            metrics,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn get(&mut self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> &mut Self {
        self.route(Method::GET, path, handler, schemas)
    }

    pub fn post(&mut self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> &mut Self {
        self.route(Method::POST, path, handler, schemas)
    }

    pub fn put(&mut self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> &mut Self {
        self.route(Method::PUT, path, handler, schemas)
    }

    pub fn patch(&mut self, path: &str, handler: impl Handler, schemas: RouteSchemas) -> &mut Self {
        self.route(Method::PATCH, path, handler, schemas)
    }

    pub fn delete(
        &mut self,
        path: &str,
        handler: impl Handler,
        schemas: RouteSchemas,
    ) -> &mut Self {
        self.route(Method::DELETE, path, handler, schemas)
    }

    /// Declare a route at the root of the app.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        schemas: RouteSchemas,
    ) -> &mut Self {
        let mut single = Router::new().route(method, path, handler, schemas);
        self.router("", &mut single, Vec::new())
    }

    /// Mount every route declared on `router` under `prefix`, wrapped by
    /// `middleware`. The router is drained and may be reused.
    pub fn router(
        &mut self,
        prefix: &str,
        router: &mut Router,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> &mut Self {
        self.entries
            .extend(router.swagger_entries(prefix, self.config.docs.inference));
        let group = router.register();
        debug!(prefix = %prefix, routes = group.len(), "Router mounted");
        self.mounts.push(Mount {
            prefix: prefix.to_string(),
            group,
            middleware,
        });
        self
    }

    /// Add global middleware. It runs around route lookup, after the built-in
    /// metrics and tracing middleware, in the order added.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Documentation entries of every mounted route, in registration order.
    #[must_use]
    pub fn entries(&self) -> &[AppSwaggerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsMiddleware> {
        Arc::clone(&self.metrics)
    }

    /// Bind every mounted route and, when a docs middleware is installed,
    /// assemble the OpenAPI document and hand it over.
    #[must_use]
    pub fn finalize(self) -> BoundApp {
        for path in shadowed_builtins(&self.entries) {
            warn!(
                path = %path,
                "Route is shadowed by the built-in endpoint and will never be reached"
            );
        }
        let gate_config = self.config.gate_config();
        let mut table = RouteTable::default();
        for mount in self.mounts {
            for gate in mount
                .group
                .into_gates(&mount.prefix, &mount.middleware, gate_config)
            {
                table.insert(gate);
            }
        }
        table.log_summary();

        let mut document = None;
        for mw in &self.middlewares {
            if let Some(docs) = mw.docs_trigger() {
                let doc = document
                    .get_or_insert_with(|| Arc::new(assemble(&self.entries, docs.config())));
                docs.install(Arc::clone(doc));
            }
        }

        BoundApp {
            dispatcher: Arc::new(Dispatcher::new(table, self.middlewares, self.config.mode)),
            document,
            metrics: self.metrics,
            config: self.config,
        }
    }

    /// Serve until SIGINT/SIGTERM, then shut down and return the exit status.
    pub fn listen<A: ToSocketAddrs>(
        self,
        addr: A,
        on_close: impl FnOnce() + Send + 'static,
    ) -> anyhow::Result<i32> {
        let running = self.finalize().serve(addr)?;
        wait_for_termination()?;
        Ok(running.shutdown(on_close).exit_code())
    }
}

/// `GET` routes whose path is answered by the server before dispatch.
fn shadowed_builtins(entries: &[AppSwaggerEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| e.method == Method::GET && BUILTIN_PATHS.contains(&e.path.as_str()))
        .map(|e| e.path.as_str())
        .collect()
}

/// A finalized app: immutable routing plus the optional document.
pub struct BoundApp {
    pub dispatcher: Arc<Dispatcher>,
    pub document: Option<Arc<OpenApiDocument>>,
    pub metrics: Arc<MetricsMiddleware>,
    pub config: AppConfig,
}

impl BoundApp {
    /// Start the HTTP server on `addr`.
    pub fn serve<A: ToSocketAddrs>(self, addr: A) -> anyhow::Result<RunningApp> {
        may::config().set_stack_size(self.config.server.stack_size);
        let connections = ConnectionSet::new();
        let factory = AppServiceFactory::new(
            self.dispatcher,
            self.metrics,
            connections.clone(),
        );
        let handle = HttpServer(factory)
            .start(addr)
            .context("failed to start HTTP server")?;
        handle
            .wait_ready()
            .context("HTTP server did not become ready")?;
        info!(
            addr = %handle.addr(),
            mode = ?self.config.mode,
            stack_size = self.config.server.stack_size,
            docs = self.document.is_some(),
            "Server listening"
        );
        Ok(RunningApp {
            handle,
            connections,
            config: self.config,
        })
    }
}

/// A serving app, ready to be shut down.
pub struct RunningApp {
    handle: ServerHandle,
    connections: ConnectionSet,
    config: AppConfig,
}

impl RunningApp {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.handle.addr()
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    /// Stop accepting, drain within the grace period, run `on_close`.
    pub fn shutdown(self, on_close: impl FnOnce() + Send + 'static) -> ShutdownOutcome {
        let handle = self.handle;
        Supervisor::new(self.connections, self.config.shutdown)
            .on_close(on_close)
            .shutdown(move || handle.stop())
    }
}
