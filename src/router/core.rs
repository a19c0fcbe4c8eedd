//! Router core module - hot path for request routing.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{info, warn};

use super::radix::RadixRouter;
use crate::gate::ValidationGate;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the route tree; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request to a bound route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub gate: Arc<ValidationGate>,
    /// Path parameters in path order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a name repeats in the template.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Method + path lookup over every bound gate.
#[derive(Default)]
pub struct RouteTable {
    tree: RadixRouter<ValidationGate>,
    summary: Vec<String>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a gate under its own method and template.
    ///
    /// A second gate for the same method and template is ignored with a warning;
    /// the first registration keeps serving.
    pub fn insert(&mut self, gate: ValidationGate) {
        let method = gate.method().clone();
        let template = gate.template().to_string();
        if self.tree.insert(method.clone(), &template, gate) {
            self.summary.push(format!("{method} {template}"));
        } else {
            warn!(
                method = %method,
                route = %template,
                "Duplicate route ignored - first registration wins"
            );
        }
    }

    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let (gate, path_params) = self.tree.route(method, path)?;
        Some(RouteMatch { gate, path_params })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// `METHOD template` for every bound route, in binding order.
    #[must_use]
    pub fn routes(&self) -> &[String] {
        &self.summary
    }

    pub fn log_summary(&self) {
        let preview: Vec<&String> = self.summary.iter().take(10).collect();
        info!(
            routes_count = self.len(),
            routes_summary = ?preview,
            routing_algorithm = "radix_tree",
            "Routing table loaded"
        );
    }
}
