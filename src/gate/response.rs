use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::schema::ValidationError;

/// What every handler resolves with.
///
/// The gate merges it into the success envelope
/// `{success: true, message: "Request successful", ...}`; fields set here win.
/// `status_code` also selects the HTTP status (200 when unset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl BaseResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Attach pagination metadata.
    #[must_use]
    pub fn paginated(mut self, page: u64, page_size: u64, total: u64) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self.total = Some(total);
        self
    }

    /// HTTP status for this response.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.status_code.unwrap_or(200)
    }

    /// Merge into the success envelope.
    #[must_use]
    pub fn into_envelope(self) -> Value {
        let mut envelope = Map::new();
        envelope.insert("success".into(), Value::Bool(true));
        envelope.insert("message".into(), Value::from("Request successful"));
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            for (key, value) in fields {
                envelope.insert(key, value);
            }
        }
        Value::Object(envelope)
    }
}

/// 400 body for a rejected request.
#[must_use]
pub fn validation_envelope(err: &ValidationError) -> Value {
    json!({
        "success": false,
        "message": err.to_string(),
        "details": err.issues,
    })
}

/// Error body; `trace_stack` is only passed in development mode.
#[must_use]
pub fn error_envelope(message: &str, trace_stack: Option<String>) -> Value {
    let mut body = json!({ "success": false, "message": message });
    if let (Some(trace), Value::Object(map)) = (trace_stack, &mut body) {
        map.insert("traceStack".into(), Value::String(trace));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationIssue;

    #[test]
    fn test_envelope_defaults() {
        let body = BaseResponse::ok().with_data(json!({ "id": 1 })).into_envelope();
        assert_eq!(
            body,
            json!({ "success": true, "message": "Request successful", "data": { "id": 1 } })
        );
    }

    #[test]
    fn test_handler_fields_override_defaults() {
        let resp = BaseResponse::ok()
            .message("Created")
            .status(201)
            .paginated(2, 10, 35);
        assert_eq!(resp.http_status(), 201);
        let body = resp.into_envelope();
        assert_eq!(body["message"], "Created");
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["pageSize"], 10);
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_validation_envelope_lists_details() {
        let err = ValidationError::new(vec![ValidationIssue::new("content", "Required")]);
        let body = validation_envelope(&err);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "content: Required");
        assert_eq!(body["details"][0]["path"], "content");
    }

    #[test]
    fn test_error_envelope_trace_is_optional() {
        assert!(error_envelope("boom", None).get("traceStack").is_none());
        assert_eq!(
            error_envelope("boom", Some("at main".into()))["traceStack"],
            "at main"
        );
    }
}
