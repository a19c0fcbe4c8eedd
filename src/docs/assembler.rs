use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::detail::{ParamDoc, ResponseKind};
use super::entry::AppSwaggerEntry;
use super::sources::merge_sources;
use crate::path_params::to_openapi_path;
use crate::schema::DocShape;

/// Document metadata and the documentation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    /// Where the UI is served; the document itself is at `<path>/openapi.json`.
    pub path: String,
    /// Glob patterns of auxiliary documentation sources.
    pub sources: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        DocsConfig {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            path: "/docs".to_string(),
            sources: Vec::new(),
        }
    }
}

impl DocsConfig {
    #[must_use]
    pub fn spec_path(&self) -> String {
        format!("{}/openapi.json", self.path.trim_end_matches('/'))
    }
}

/// Assembled OpenAPI 3.0 document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument(Value);

impl OpenApiDocument {
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Operation object at `path` (OpenAPI form) and lower-case `method`.
    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Option<&Value> {
        self.0.get("paths")?.get(path)?.get(method)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0)
    }
}

/// Build the document from route entries, in order, then merge auxiliary sources.
#[must_use]
pub fn assemble(entries: &[AppSwaggerEntry], config: &DocsConfig) -> OpenApiDocument {
    let mut info_obj = Map::new();
    info_obj.insert("title".into(), Value::String(config.title.clone()));
    info_obj.insert("version".into(), Value::String(config.version.clone()));
    if let Some(description) = &config.description {
        info_obj.insert("description".into(), Value::String(description.clone()));
    }

    let mut paths: Map<String, Value> = Map::new();
    for entry in entries {
        let item = paths
            .entry(to_openapi_path(&entry.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(entry.method_key(), operation(entry));
        }
    }

    let mut doc = json!({
        "openapi": "3.0.0",
        "info": info_obj,
        "paths": paths,
    });
    merge_sources(&mut doc, &config.sources);

    info!(
        operations = entries.len(),
        paths = doc["paths"].as_object().map_or(0, Map::len),
        sources = config.sources.len(),
        "OpenAPI document assembled"
    );
    OpenApiDocument(doc)
}

fn operation(entry: &AppSwaggerEntry) -> Value {
    let detail = entry.detail.as_ref();

    let summary = detail
        .and_then(|d| d.summary.clone())
        .unwrap_or_else(|| format!("{} {}", entry.method.as_str(), entry.path));
    let tags = match detail {
        Some(d) if !d.tags.is_empty() => d.tags.clone(),
        _ => vec!["default".to_string()],
    };

    let mut op = Map::new();
    op.insert("summary".into(), Value::String(summary));
    if let Some(description) = detail.and_then(|d| d.description.clone()) {
        op.insert("description".into(), Value::String(description));
    }
    op.insert("tags".into(), json!(tags));
    op.insert("parameters".into(), parameters(entry));
    if let Some(body) = request_body(entry) {
        op.insert("requestBody".into(), body);
    }
    op.insert("responses".into(), responses(entry));
    Value::Object(op)
}

fn request_body(entry: &AppSwaggerEntry) -> Option<Value> {
    let schema = match entry.detail.as_ref().and_then(|d| d.body.clone()) {
        Some(schema) => schema,
        None if !entry.body_shape.is_empty() => entry.body_shape.to_openapi_schema(),
        None => return None,
    };
    Some(json!({
        "required": true,
        "content": { "application/json": { "schema": schema } }
    }))
}

fn parameters(entry: &AppSwaggerEntry) -> Value {
    if let Some(detail) = &entry.detail {
        if !detail.parameters.is_empty() {
            return json!(detail.parameters);
        }
    }

    let mut params: Vec<ParamDoc> = entry
        .path_params
        .iter()
        .map(|name| match declared_param(&entry.params_shape, name) {
            Some(schema) => ParamDoc::path(name.as_str()).with_schema(schema),
            None => ParamDoc::path(name.as_str()),
        })
        .collect();
    if let DocShape::Object(props) = &entry.query_shape {
        params.extend(
            props
                .iter()
                .map(|(name, shape)| ParamDoc::query(name.clone(), shape.to_openapi_schema())),
        );
    }
    json!(params)
}

/// Schema of the `name` property of the params shape, if it has a documentable one.
fn declared_param(params: &DocShape, name: &str) -> Option<Value> {
    let DocShape::Object(props) = params else {
        return None;
    };
    props
        .iter()
        .find(|(prop, _)| prop == name)
        .filter(|(_, shape)| *shape != DocShape::Unknown)
        .map(|(_, shape)| shape.to_openapi_schema())
}

fn envelope_schema(data: Option<Value>) -> Value {
    let mut properties = Map::new();
    properties.insert("success".into(), json!({ "type": "boolean" }));
    properties.insert("message".into(), json!({ "type": "string" }));
    if let Some(data) = data {
        properties.insert("data".into(), data);
    }
    json!({ "type": "object", "properties": properties })
}

fn responses(entry: &AppSwaggerEntry) -> Value {
    let mut out = Map::new();

    if let Some(detail) = entry.detail.as_ref().filter(|d| d.has_responses()) {
        let mut documented: Vec<(ResponseKind, Value)> = detail
            .responses
            .iter()
            .map(|(kind, doc)| (*kind, doc.to_openapi()))
            .collect();
        documented.sort_by_key(|(kind, _)| kind.status());
        for (kind, response) in documented {
            out.insert(kind.status().to_string(), response);
        }
        return Value::Object(out);
    }

    let success_schema = if entry.response_shape.is_empty() {
        json!({ "type": "object", "properties": {} })
    } else {
        envelope_schema(Some(entry.response_shape.to_openapi_schema()))
    };
    out.insert(
        "200".into(),
        json!({
            "description": "Request successful",
            "content": { "application/json": { "schema": success_schema } }
        }),
    );
    out.insert("400".into(), json!({ "description": "Bad request" }));
    out.insert("500".into(), json!({ "description": "Internal server error" }));
    Value::Object(out)
}
