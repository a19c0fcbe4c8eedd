//! # Path Parameter Extraction
//!
//! Route templates mark dynamic segments with a leading `:` (e.g. `/users/:id/posts/:post_id`).
//! This module pulls the parameter names out of a template, builds the default params
//! schema used when a route does not declare one, and rewrites templates into the
//! `{name}` form the OpenAPI document uses.

use crate::schema::Schema;

/// Marker character that starts a dynamic segment.
pub const PARAM_MARKER: char = ':';

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Name of the parameter held by a single template segment, if any.
///
/// Trailing characters outside `[A-Za-z0-9_]` are ignored (`:id.json` names `id`).
fn segment_param(segment: &str) -> Option<&str> {
    let rest = segment.strip_prefix(PARAM_MARKER)?;
    let end = rest
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// Extract the unique parameter names of a template, in order of first appearance.
///
/// ```
/// use routegate::path_params::extract_path_params;
///
/// assert_eq!(extract_path_params("/users/:id/posts/:post_id"), vec!["id", "post_id"]);
/// assert!(extract_path_params("/health").is_empty());
/// ```
#[must_use]
pub fn extract_path_params(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(template.matches(PARAM_MARKER).count());
    for name in template.split('/').filter_map(segment_param) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Default params schema: every named parameter is a required string.
///
/// Returns `None` for templates without parameters, which makes params validation a no-op.
#[must_use]
pub fn default_params_schema(names: &[String]) -> Option<Schema> {
    if names.is_empty() {
        return None;
    }
    Some(Schema::object(
        names.iter().map(|n| (n.as_str(), Schema::string())),
    ))
}

/// Rewrite `:name` segments into OpenAPI `{name}` segments.
#[must_use]
pub fn to_openapi_path(template: &str) -> String {
    let rewritten: Vec<String> = template
        .split('/')
        .map(|segment| match segment_param(segment) {
            Some(name) => {
                let suffix = &segment[name.len() + 1..];
                format!("{{{name}}}{suffix}")
            }
            None => segment.to_string(),
        })
        .collect();
    rewritten.join("/")
}

/// Join a mount prefix and a route path into one normalized template.
///
/// `("/api", "/profile")` becomes `/api/profile`, `("/api", "/")` becomes `/api`,
/// and an empty prefix leaves the path untouched.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => ensure_leading_slash(prefix),
        (false, false) => format!("{}/{path}", ensure_leading_slash(prefix)),
    }
}

fn ensure_leading_slash(s: &str) -> String {
    if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{s}")
    }
}
