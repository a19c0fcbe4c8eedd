//! End-to-end tests over a real socket
//!
//! Each test serves a finalized app with `may_minihttp` on a fresh local port and
//! talks raw HTTP/1.1 to it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use routegate::app::{App, RunningApp};
use routegate::config::AppConfig;
use routegate::docs::{DocsConfig, DocsMiddleware};
use routegate::gate::{ApiError, BaseResponse, HandlerResult, RequestContext};
use routegate::ids::RequestId;
use routegate::router::{RouteSchemas, Router};
use routegate::schema::Schema;
use serde_json::json;

mod common;
use common::http::{get, parse_response, send_bytes, send_json, send_request};
use common::test_server::{start, wait_until};

fn show_item(ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok().with_data(json!({ "id": ctx.params["id"], "query": ctx.query })))
}

fn create_note(ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok()
        .status(201)
        .with_data(json!({ "content": ctx.body["content"] })))
}

fn save_draft(ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok().with_data(json!({ "body": ctx.body })))
}

fn whoami(ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok().with_data(json!({ "requestId": ctx.request_id.to_string() })))
}

fn missing(_ctx: RequestContext) -> HandlerResult {
    Err(ApiError::not_found("profile not found"))
}

fn test_app() -> App {
    let mut config = AppConfig::default();
    config.shutdown.grace_ms = 500;
    let mut app = App::new(config);
    let mut api = Router::new()
        .get(
            "/items/:id",
            show_item,
            RouteSchemas::new()
                .params(Schema::object([("id", Schema::integer())]))
                .query(Schema::object([(
                    "tag",
                    Schema::array(Schema::string()).optional(),
                )])),
        )
        .post(
            "/notes",
            create_note,
            RouteSchemas::new().body(Schema::object([("content", Schema::string())])),
        )
        .post(
            "/drafts",
            save_draft,
            RouteSchemas::new().body(Schema::object([("content", Schema::string().optional())])),
        )
        .get("/whoami", whoami, RouteSchemas::new())
        .get("/profile", missing, RouteSchemas::new());
    app.router("/api", &mut api, Vec::new());
    app.use_middleware(Arc::new(DocsMiddleware::new(DocsConfig::default())));
    app
}

fn stop(running: RunningApp) {
    let _ = running.shutdown(|| {});
}

fn addr_of(running: &RunningApp) -> SocketAddr {
    running.addr()
}

#[test]
fn test_health_endpoint() {
    let running = start(test_app());
    let resp = get(&addr_of(&running), "/health");
    stop(running);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({ "status": "ok" }));
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[test]
fn test_validated_route_over_the_wire() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let ok = get(&addr, "/api/items/42");
    let bad = get(&addr, "/api/items/forty-two");
    stop(running);

    assert_eq!(ok.status, 200);
    let body = ok.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Request successful");
    assert_eq!(body["data"]["id"], 42);

    assert_eq!(bad.status, 400);
    let body = bad.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["details"][0]["path"], "id");
}

#[test]
fn test_repeated_query_keys_become_arrays() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let many = get(&addr, "/api/items/1?tag=a&tag=b%20c");
    let one = get(&addr, "/api/items/1?tag=solo");
    stop(running);

    assert_eq!(many.json()["data"]["query"]["tag"], json!(["a", "b c"]));
    assert_eq!(one.json()["data"]["query"]["tag"], json!(["solo"]));
}

#[test]
fn test_json_body_round_trip() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let created = send_json(&addr, "POST", "/api/notes", r#"{"content":"hello"}"#);
    let rejected = send_json(&addr, "POST", "/api/notes", "{}");
    stop(running);

    assert_eq!(created.status, 201);
    assert_eq!(created.json()["data"], json!({ "content": "hello" }));
    assert_eq!(rejected.status, 400);
    assert_eq!(rejected.json()["details"][0]["path"], "content");
}

#[test]
fn test_non_utf8_body_is_rejected() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let garbage = send_bytes(&addr, "POST", "/api/drafts", b"{\"content\": \"\xff\xfe\"}");
    let empty = send_json(&addr, "POST", "/api/drafts", "{}");
    stop(running);

    assert_eq!(garbage.status, 400);
    let body = garbage.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["details"][0]["path"], "");
    assert!(body["details"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed JSON body"));

    assert_eq!(empty.status, 200);
    assert_eq!(empty.json()["data"]["body"], json!({}));
}

#[test]
fn test_unknown_url() {
    let running = start(test_app());
    let resp = get(&addr_of(&running), "/api/nothing-here");
    stop(running);
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.json(),
        json!({ "message": "Unknown URL", "path": "/api/nothing-here" })
    );
}

#[test]
fn test_not_found_error_status() {
    let running = start(test_app());
    let resp = get(&addr_of(&running), "/api/profile");
    stop(running);
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.json(),
        json!({ "success": false, "message": "profile not found" })
    );
}

#[test]
fn test_inbound_request_id_is_used() {
    let running = start(test_app());
    let addr = addr_of(&running);
    let id = RequestId::new();

    let raw = send_request(
        &addr,
        &format!("GET /api/whoami HTTP/1.1\r\nHost: localhost\r\nX-Request-Id: {id}\r\n\r\n"),
    );
    let generated = get(&addr, "/api/whoami");
    stop(running);

    assert_eq!(parse_response(&raw).json()["data"]["requestId"], id.to_string());
    let other = generated.json()["data"]["requestId"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(other.parse::<RequestId>().is_ok());
    assert_ne!(other, id.to_string());
}

#[test]
fn test_metrics_endpoint() {
    let running = start(test_app());
    let addr = addr_of(&running);

    get(&addr, "/api/items/1");
    get(&addr, "/api/items/x");
    get(&addr, "/missing");
    let metrics = get(&addr, "/metrics");
    stop(running);

    assert_eq!(metrics.status, 200);
    assert!(metrics
        .header("content-type")
        .unwrap()
        .starts_with("text/plain"));
    assert!(metrics.body.contains("routegate_requests_total 3"));
    assert!(metrics.body.contains(r#"status="400""#));
    assert!(metrics.body.contains(r#"status="404""#));
}

#[test]
fn test_docs_endpoints() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let spec = get(&addr, "/docs/openapi.json");
    let ui = get(&addr, "/docs");
    stop(running);

    assert_eq!(spec.status, 200);
    let doc = spec.json();
    assert_eq!(doc["openapi"], "3.0.0");
    assert!(doc["paths"]["/api/items/{id}"]["get"].is_object());
    assert!(doc["paths"]["/api/notes"]["post"]["requestBody"].is_object());

    assert_eq!(ui.status, 200);
    assert!(ui.header("content-type").unwrap().starts_with("text/html"));
    assert!(ui.body.contains("swagger-ui"));
}

#[test]
fn test_connections_leave_the_set_when_clients_disconnect() {
    let running = start(test_app());
    let addr = addr_of(&running);

    let resp = get(&addr, "/health");
    assert_eq!(resp.status, 200);
    let drained = wait_until(Duration::from_secs(2), || running.connections().is_empty());
    stop(running);
    assert!(drained);
}
