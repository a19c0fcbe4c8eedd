//! Radix tree for HTTP route matching
//!
//! Lookup cost is proportional to the number of path segments, not the number of
//! routes:
//!
//! - Each node represents a path segment
//! - Static segments (e.g. `users`) match exactly and are tried first
//! - Parameter segments (e.g. `:id`) match any single segment
//! - Payloads are stored at terminal nodes, keyed by HTTP method
//!
//! ```rust,ignore
//! let mut tree = RadixRouter::new();
//! tree.insert(Method::GET, "/users/:id", "get_user");
//! let (handler, params) = tree.route(&Method::GET, "/users/123").unwrap();
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use super::core::ParamVec;
use crate::path_params::PARAM_MARKER;

/// Node in the radix tree. Each node is one path segment.
#[derive(Clone)]
struct RadixNode<T> {
    /// The path segment this node represents (without leading /)
    segment: Cow<'static, str>,
    /// Payload per HTTP method when a route ends at this node
    routes: HashMap<Method, Arc<T>>,
    /// Parameter name if this segment is a path parameter (`:id` -> `id`)
    param_name: Option<Arc<str>>,
    /// Static children
    children: Vec<RadixNode<T>>,
    /// Parameter children. Routes may use different names at the same position
    /// (`/users/:id/posts` and `/users/:user_id/comments`), so there can be several.
    param_children: Vec<RadixNode<T>>,
}

impl<T> RadixNode<T> {
    fn new(segment: Cow<'static, str>) -> Self {
        Self {
            segment,
            routes: HashMap::new(),
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn new_param(param_name: &str) -> Self {
        Self {
            segment: Cow::Borrowed(""),
            routes: HashMap::new(),
            param_name: Some(Arc::from(param_name)),
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Insert a payload. Returns `false` when the method was already bound at this
    /// path; the first registration is kept.
    fn insert(&mut self, segments: &[&str], method: Method, payload: Arc<T>) -> bool {
        let Some((segment, remaining)) = segments.split_first() else {
            if self.routes.contains_key(&method) {
                return false;
            }
            self.routes.insert(method, payload);
            return true;
        };

        if let Some(param_name) = segment.strip_prefix(PARAM_MARKER) {
            for param_child in &mut self.param_children {
                if param_child.param_name.as_deref() == Some(param_name) {
                    return param_child.insert(remaining, method, payload);
                }
            }
            let mut child = RadixNode::new_param(param_name);
            let inserted = child.insert(remaining, method, payload);
            self.param_children.push(child);
            return inserted;
        }

        for child in &mut self.children {
            if child.segment == *segment {
                return child.insert(remaining, method, payload);
            }
        }

        let mut child = RadixNode::new(Cow::Owned((*segment).to_string()));
        let inserted = child.insert(remaining, method, payload);
        self.children.push(child);
        inserted
    }

    fn search(&self, segments: &[&str], method: &Method, params: &mut ParamVec) -> Option<Arc<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.get(method).cloned();
        };

        for child in &self.children {
            if child.segment == *segment {
                if let Some(found) = child.search(remaining, method, params) {
                    return Some(found);
                }
            }
        }

        for param_child in &self.param_children {
            if let Some(name) = &param_child.param_name {
                params.push((Arc::clone(name), (*segment).to_string()));
                if let Some(found) = param_child.search(remaining, method, params) {
                    return Some(found);
                }
                // Backtrack
                params.pop();
            }
        }

        None
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Radix tree keyed by method and `:param` path template.
#[derive(Clone)]
pub struct RadixRouter<T> {
    root: RadixNode<T>,
    len: usize,
}

impl<T> Default for RadixRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RadixRouter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RadixNode::new(Cow::Borrowed("")),
            len: 0,
        }
    }

    /// Bind `payload` to `method template`. Returns `false` for a duplicate, in
    /// which case the earlier binding stays.
    pub fn insert(&mut self, method: Method, template: &str, payload: T) -> bool {
        let segments = split_segments(template);
        let inserted = self.root.insert(&segments, method, Arc::new(payload));
        if inserted {
            self.len += 1;
        }
        inserted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Match a request path, returning the payload and the bound parameters in
    /// path order.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<(Arc<T>, ParamVec)> {
        let segments = split_segments(path);
        let mut params = ParamVec::new();
        let found = self.root.search(&segments, method, &mut params)?;
        Some((found, params))
    }
}
