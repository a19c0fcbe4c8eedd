use http::Method;
use serde_json::{Map, Value};
use tracing::debug;

use super::detail::DocDetail;
use crate::gate::RequestContext;
use crate::infer::{infer_from_sample, infer_from_source, InferenceMode};
use crate::path_params::{default_params_schema, extract_path_params, join_paths};
use crate::router::RouteDescriptor;
use crate::schema::{DocShape, Schema};

/// Documentation record of one bound route.
///
/// Produced when a router is mounted, one per route in registration order, and
/// consumed by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSwaggerEntry {
    /// Full template including the mount prefix, `:param` form.
    pub path: String,
    pub method: Method,
    pub detail: Option<DocDetail>,
    pub body_shape: DocShape,
    pub query_shape: DocShape,
    pub params_shape: DocShape,
    pub response_shape: DocShape,
    /// Parameter names of `path`, in order of first appearance.
    pub path_params: Vec<String>,
}

impl AppSwaggerEntry {
    /// Describe `route` as mounted under `prefix`.
    #[must_use]
    pub fn describe(prefix: &str, route: &RouteDescriptor, inference: InferenceMode) -> Self {
        let path = join_paths(prefix, &route.path);
        let path_params = extract_path_params(&path);
        let schemas = &route.schemas;

        let params_schema = schemas
            .params
            .as_deref()
            .cloned()
            .or_else(|| default_params_schema(&path_params));
        let shape_of = |s: Option<&Schema>| s.map_or(DocShape::Unknown, Schema::doc_shape);

        let has_documented_responses = schemas
            .detail
            .as_ref()
            .is_some_and(DocDetail::has_responses);

        let response_shape = match schemas.response.as_deref() {
            Some(schema) => schema.doc_shape(),
            None if has_documented_responses => DocShape::Unknown,
            None => infer_response(route, &path, params_schema.as_ref(), inference),
        };

        AppSwaggerEntry {
            body_shape: shape_of(schemas.body.as_deref()),
            query_shape: shape_of(schemas.query.as_deref()),
            params_shape: shape_of(params_schema.as_ref()),
            response_shape,
            detail: schemas.detail.clone(),
            method: route.method.clone(),
            path,
            path_params,
        }
    }

    /// Lower-case method name as used in OpenAPI path items.
    #[must_use]
    pub fn method_key(&self) -> String {
        self.method.as_str().to_ascii_lowercase()
    }
}

fn infer_response(
    route: &RouteDescriptor,
    path: &str,
    params: Option<&Schema>,
    mode: InferenceMode,
) -> DocShape {
    let data = match mode {
        InferenceMode::Off => return DocShape::Unknown,
        InferenceMode::SourceText => match route.handler.source() {
            Some(source) => infer_from_source(source),
            None => {
                debug!(method = %route.method, route = %path, "No handler source to infer from");
                return DocShape::Unknown;
            }
        },
        InferenceMode::SampleInvocation => {
            let example = |s: Option<&Schema>| {
                s.map_or_else(|| Value::Object(Map::new()), Schema::example)
            };
            let sample = RequestContext::synthetic(
                route.method.clone(),
                path,
                example(params),
                example(route.schemas.body.as_deref()),
                example(route.schemas.query.as_deref()),
            );
            infer_from_sample(route.handler.as_ref(), sample)
        }
    };
    DocShape::of_value(&data)
}
