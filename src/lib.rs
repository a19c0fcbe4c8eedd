//! # routegate
//!
//! **routegate** is a typed request router for the `may` coroutine runtime. Routes
//! are declared with optional params, body and query schemas; every request passes
//! a validation gate before its handler runs, every response leaves in one JSON
//! envelope, and an OpenAPI 3.0 document is derived from the declarations
//! themselves.
//!
//! ## Overview
//!
//! ```text
//!   Router::get/post/...      App::router(prefix, ..)       App::finalize
//!   ──────────────────► RouteDescriptor ──────► RouteGroup ─────────► Dispatcher
//!                             │                                  │
//!                             └─► AppSwaggerEntry ──► assemble ──┴─► OpenApiDocument
//! ```
//!
//! Per request: global middleware, radix lookup, then the route's
//! [`ValidationGate`](gate::ValidationGate): params, body and query are parsed in
//! that order, the first rejection answers `400`, handler errors become error
//! envelopes and panics are caught.
//!
//! ## Modules
//!
//! - **[`schema`]** - schema sum type, validation, examples and documentation shapes
//! - **[`path_params`]** - `:name` template parameters
//! - **[`router`]** - fluent route registry and the radix route table
//! - **[`gate`]** - validation gate, handler trait, response envelope, errors
//! - **[`infer`]** - response-shape inference from handler source or a sample call
//! - **[`docs`]** - OpenAPI assembly, auxiliary sources, Swagger UI middleware
//! - **[`dispatcher`]** - bound routing with the 404 fallback and error backstop
//! - **[`middleware`]** - middleware trait, metrics, tracing
//! - **[`server`]** - `may_minihttp` transport
//! - **[`lifecycle`]** - connection tracking and graceful shutdown
//! - **[`app`]** - registration phase, `finalize`, `listen`
//! - **[`config`]**, **[`otel`]** - configuration and logging
//!
//! ## Example
//!
//! ```
//! use routegate::app::App;
//! use routegate::gate::{BaseResponse, HandlerResult, InboundRequest, RequestContext};
//! use routegate::router::{RouteSchemas, Router};
//! use routegate::schema::Schema;
//! use http::Method;
//!
//! fn show(ctx: RequestContext) -> HandlerResult {
//!     Ok(BaseResponse::ok().with_data(serde_json::json!({ "id": ctx.params["id"] })))
//! }
//!
//! let mut items = Router::new().get(
//!     "/items/:id",
//!     show,
//!     RouteSchemas::new().params(Schema::object([("id", Schema::integer())])),
//! );
//! let mut app = App::default();
//! app.router("/api", &mut items, Vec::new());
//! let bound = app.finalize();
//!
//! let ok = bound.dispatcher.dispatch(InboundRequest::new(Method::GET, "/api/items/7"));
//! assert_eq!(ok.status, 200);
//! assert_eq!(ok.body["data"]["id"], 7);
//!
//! let bad = bound.dispatcher.dispatch(InboundRequest::new(Method::GET, "/api/items/x"));
//! assert_eq!(bad.status, 400);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod docs;
pub mod gate;
pub mod ids;
pub mod infer;
pub mod lifecycle;
pub mod middleware;
pub mod otel;
pub mod path_params;
pub mod router;
pub mod schema;
pub mod server;

pub use app::App;
pub use gate::{ApiError, BaseResponse, HandlerResult, RequestContext};
pub use router::{RouteSchemas, Router};
pub use routegate_macros::handler;
pub use schema::Schema;
