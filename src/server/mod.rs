//! # Server Module
//!
//! HTTP transport over `may_minihttp`. Every accepted connection gets its own
//! [`AppService`] running in its own coroutine; the factory registers the connection
//! in a [`ConnectionSet`](crate::lifecycle::ConnectionSet) for the shutdown supervisor.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, split_target, RequestParseError};
pub use response::write_handler_response;
pub use service::{
    health_response, metrics_response, AppService, AppServiceFactory, BUILTIN_PATHS, HEALTH_PATH,
    METRICS_PATH,
};
