//! # CLI Module
//!
//! The `routegate-demo` binary mounts a small blog API to show the crate end to end.
//!
//! ```bash
//! # serve on :8080, docs at /docs, metrics at /metrics
//! routegate-demo serve --addr 0.0.0.0:8080
//!
//! # print the OpenAPI document derived from the route declarations
//! routegate-demo openapi --inference sample_invocation --source 'docs/*.yaml'
//! ```

mod commands;
mod demo;

#[cfg(test)]
mod tests;

pub use commands::{load_config, run_cli, Cli, Commands};
pub use demo::demo_app;
