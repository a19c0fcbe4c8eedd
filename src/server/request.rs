use std::io::Read;
use std::sync::Arc;

use http::Method;
use may_minihttp::Request;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::dispatcher::{HeaderVec, REQUEST_ID_HEADER};
use crate::gate::InboundRequest;
use crate::ids::RequestId;

/// Why a raw request could not be turned into an [`InboundRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestParseError {
    UnsupportedMethod(String),
}

impl std::fmt::Display for RequestParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestParseError::UnsupportedMethod(m) => write!(f, "unsupported method {m:?}"),
        }
    }
}

impl std::error::Error for RequestParseError {}

/// Split a request target into its path and query.
///
/// Query values stay strings; a key repeated in the query string collects its
/// values into an array, in order.
///
/// ```
/// use routegate::server::split_target;
/// use serde_json::json;
///
/// let (path, query) = split_target("/search?tag=a&tag=b&q=rust%20lang");
/// assert_eq!(path, "/search");
/// assert_eq!(query["tag"], json!(["a", "b"]));
/// assert_eq!(query["q"], "rust lang");
/// ```
#[must_use]
pub fn split_target(target: &str) -> (String, Map<String, Value>) {
    let (path, raw_query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };
    let path = if path.is_empty() { "/" } else { path };

    let mut query: Map<String, Value> = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match query.get_mut(key.as_ref()) {
            None => {
                query.insert(key.into_owned(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    (path.to_string(), query)
}

/// Convert a raw `may_minihttp` request.
///
/// Header names are lower-cased. The correlation id comes from `x-request-id` when
/// it holds a valid id and is freshly generated otherwise.
pub fn parse_request(req: Request) -> Result<InboundRequest, RequestParseError> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|_| RequestParseError::UnsupportedMethod(req.method().to_string()))?;
    let (path, query) = split_target(req.path());

    let mut headers = HeaderVec::new();
    for h in req.headers() {
        headers.push((
            Arc::from(h.name.to_ascii_lowercase()),
            String::from_utf8_lossy(h.value).into_owned(),
        ));
    }

    let mut inbound = InboundRequest::new(method, path);
    inbound.query = query;
    inbound.headers = headers;
    inbound.request_id = RequestId::from_header_or_new(inbound.get_header(REQUEST_ID_HEADER));

    let mut raw = Vec::new();
    match req.body().read_to_end(&mut raw) {
        Ok(0) => {}
        Ok(size) => {
            debug!(request_id = %inbound.request_id, body_size_bytes = size, "Request body read");
            decode_body(&mut inbound, raw);
        }
        Err(e) => {
            warn!(request_id = %inbound.request_id, error = %e, "Request body unreadable");
            inbound.body_error = Some(e.to_string());
        }
    }

    debug!(
        request_id = %inbound.request_id,
        method = %inbound.method,
        path = %inbound.path,
        header_count = inbound.headers.len(),
        query_count = inbound.query.len(),
        "HTTP request parsed"
    );
    Ok(inbound)
}

/// Store the body text, or record why the bytes are not text.
fn decode_body(inbound: &mut InboundRequest, raw: Vec<u8>) {
    match String::from_utf8(raw) {
        Ok(text) => inbound.body = Some(text),
        Err(e) => {
            warn!(request_id = %inbound.request_id, error = %e, "Request body is not UTF-8");
            inbound.body_error = Some(e.utf8_error().to_string());
        }
    }
}
