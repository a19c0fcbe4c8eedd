use may_minihttp::Response;
use serde_json::Value;

use crate::dispatcher::HandlerResponse;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ if status < 400 => "OK",
        _ if status < 500 => "Client Error",
        _ => "Server Error",
    }
}

/// `may_minihttp` only accepts `'static` header lines, so content types map onto
/// a fixed set.
fn content_type_line(content_type: Option<&str>, body: &Value) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/json") => "Content-Type: application/json",
        Some("text/html") => "Content-Type: text/html; charset=utf-8",
        Some("text/plain") => "Content-Type: text/plain; charset=utf-8",
        Some("text/yaml" | "application/yaml") => "Content-Type: text/yaml",
        _ if body.is_string() => "Content-Type: text/plain; charset=utf-8",
        _ => "Content-Type: application/json",
    }
}

/// Write a dispatcher response. String bodies go out verbatim, anything else as JSON.
pub fn write_handler_response(res: &mut Response, resp: HandlerResponse) {
    res.status_code(usize::from(resp.status), status_reason(resp.status));
    res.header(content_type_line(resp.get_header("content-type"), &resp.body));
    let bytes = match resp.body {
        Value::String(text) => text.into_bytes(),
        other => serde_json::to_vec(&other).unwrap_or_else(|_| b"{}".to_vec()),
    };
    res.body_vec(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(418), "Client Error");
        assert_eq!(status_reason(599), "Server Error");
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(
            content_type_line(Some("application/json; charset=utf-8"), &json!({})),
            "Content-Type: application/json"
        );
        assert_eq!(
            content_type_line(Some("text/html"), &json!("<p>")),
            "Content-Type: text/html; charset=utf-8"
        );
        assert_eq!(
            content_type_line(None, &json!("plain")),
            "Content-Type: text/plain; charset=utf-8"
        );
        assert_eq!(
            content_type_line(Some("image/png"), &json!({})),
            "Content-Type: application/json"
        );
    }
}
