use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::schema::Schema;

/// Where a documented parameter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

/// One entry of an operation's `parameters` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDoc {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

impl ParamDoc {
    /// Required string path parameter.
    pub fn path(name: impl Into<String>) -> Self {
        ParamDoc {
            name: name.into(),
            location: ParamLocation::Path,
            required: true,
            description: None,
            schema: json!({ "type": "string" }),
        }
    }

    /// Optional query parameter.
    pub fn query(name: impl Into<String>, schema: Value) -> Self {
        ParamDoc {
            name: name.into(),
            location: ParamLocation::Query,
            required: false,
            description: None,
            schema,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Documented outcome classes and their HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "bad request")]
    BadRequest,
    #[serde(rename = "internal server error")]
    InternalServerError,
}

impl ResponseKind {
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            ResponseKind::Success => 200,
            ResponseKind::BadRequest => 400,
            ResponseKind::InternalServerError => 500,
        }
    }

    /// Look up a kind by its detail key (`success`, `bad request`, `internal server error`).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "success" => Some(ResponseKind::Success),
            "bad request" => Some(ResponseKind::BadRequest),
            "internal server error" => Some(ResponseKind::InternalServerError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ResponseDoc {
    /// OpenAPI response object.
    #[must_use]
    pub fn to_openapi(&self) -> Value {
        let mut out = Map::new();
        out.insert("description".into(), Value::String(self.description.clone()));
        if let Some(schema) = &self.schema {
            out.insert(
                "content".into(),
                json!({ "application/json": { "schema": schema } }),
            );
        }
        Value::Object(out)
    }
}

/// Author-supplied documentation for one route. Anything set here takes
/// precedence over shapes derived from schemas or handler source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocDetail {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Request body schema (OpenAPI schema object).
    pub body: Option<Value>,
    pub parameters: Vec<ParamDoc>,
    pub responses: Vec<(ResponseKind, ResponseDoc)>,
}

impl DocDetail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn body_schema(mut self, schema: &Schema) -> Self {
        self.body = Some(schema.doc_shape().to_openapi_schema());
        self
    }

    #[must_use]
    pub fn parameter(mut self, param: ParamDoc) -> Self {
        self.parameters.push(param);
        self
    }

    /// Document one outcome. A later entry for the same kind replaces the earlier one.
    #[must_use]
    pub fn response(
        mut self,
        kind: ResponseKind,
        description: impl Into<String>,
        schema: Option<&Schema>,
    ) -> Self {
        self.responses.retain(|(k, _)| *k != kind);
        self.responses.push((
            kind,
            ResponseDoc {
                description: description.into(),
                schema: schema.map(|s| s.doc_shape().to_openapi_schema()),
            },
        ));
        self
    }

    #[must_use]
    pub fn has_responses(&self) -> bool {
        !self.responses.is_empty()
    }
}
