use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::dispatcher::HeaderVec;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::schema::ValidationError;

/// A request as it reaches a route's gate, before validation.
///
/// Path params and query values are still raw strings; the body is the raw text
/// (`None` when the request carried no body).
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Bound path parameters (filled in by the route table).
    pub path_params: ParamVec,
    /// Query string; repeated keys become arrays.
    pub query: Map<String, Value>,
    pub headers: HeaderVec,
    pub body: Option<String>,
    /// Set when the body bytes could not be read as text.
    pub body_error: Option<String>,
}

impl InboundRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        InboundRequest {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            path_params: ParamVec::new(),
            query: Map::new(),
            headers: HeaderVec::new(),
            body: None,
            body_error: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path params as a JSON object of strings, ready for schema parsing.
    ///
    /// Duplicate names keep the last bound value.
    #[must_use]
    pub fn params_object(&self) -> Value {
        let mut map = Map::with_capacity(self.path_params.len());
        for (name, value) in &self.path_params {
            map.insert(name.to_string(), Value::String(value.clone()));
        }
        Value::Object(map)
    }

    /// Body as JSON. An absent or blank body is `{}`; an unreadable one is malformed.
    pub fn json_body(&self) -> Result<Value, ValidationError> {
        if let Some(reason) = &self.body_error {
            return Err(ValidationError::single(
                "",
                format!("Malformed JSON body: {reason}"),
            ));
        }
        match self.body.as_deref().map(str::trim) {
            None | Some("") => Ok(Value::Object(Map::new())),
            Some(text) => serde_json::from_str(text)
                .map_err(|e| ValidationError::single("", format!("Malformed JSON body: {e}"))),
        }
    }
}

/// Validated request handed to a handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub params: Value,
    pub body: Value,
    pub query: Value,
    pub headers: HeaderVec,
}

impl RequestContext {
    /// A context that did not come from the wire, e.g. for sampling a handler.
    #[must_use]
    pub fn synthetic(
        method: Method,
        path: impl Into<String>,
        params: Value,
        body: Value,
        query: Value,
    ) -> Self {
        RequestContext {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            params,
            body,
            query,
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// String view of a path param.
    #[must_use]
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the validated body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize_part(&self.body)
    }

    /// Deserialize the validated query.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize_part(&self.query)
    }

    /// Deserialize the validated path params.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        deserialize_part(&self.params)
    }
}

fn deserialize_part<T: DeserializeOwned>(value: &Value) -> Result<T, ApiError> {
    T::deserialize(value)
        .map_err(|e| ApiError::Validation(ValidationError::single("", e.to_string())))
}
