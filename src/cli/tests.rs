//! Unit tests for CLI commands and the demo app

use crate::cli::{demo_app, run_cli, Cli, Commands};
use crate::config::AppConfig;
use crate::gate::InboundRequest;
use crate::infer::InferenceMode;
use clap::Parser;
use http::Method;
use serde_json::json;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["routegate-demo", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { addr } => assert_eq!(addr, "0.0.0.0:8080"),
        other => panic!("Expected Serve, got {other:?}"),
    }
}

#[test]
fn test_openapi_flags() {
    let cli = Cli::try_parse_from([
        "routegate-demo",
        "openapi",
        "--inference",
        "sample-invocation",
        "--source",
        "a/*.yaml",
        "--source",
        "b/*.rs",
    ])
    .unwrap();
    match cli.command {
        Commands::Openapi {
            inference, sources, ..
        } => {
            assert_eq!(inference, Some(InferenceMode::SampleInvocation));
            assert_eq!(sources, vec!["a/*.yaml", "b/*.rs"]);
        }
        other => panic!("Expected Openapi, got {other:?}"),
    }
}

#[test]
fn test_unknown_inference_rejected() {
    assert!(Cli::try_parse_from(["routegate-demo", "openapi", "--inference", "guess"]).is_err());
}

#[test]
fn test_openapi_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("openapi.json");
    let cli = Cli::try_parse_from([
        "routegate-demo",
        "openapi",
        "--output",
        out.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(run_cli(cli).unwrap(), 0);

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(doc["openapi"], "3.0.0");
    let profile = &doc["paths"]["/api/profile"]["get"];
    assert_eq!(profile["summary"], "Read the profile");
    assert_eq!(
        profile["responses"]["200"]["content"]["application/json"]["schema"]["properties"]["data"]
            ["properties"]["followers"],
        json!({ "type": "integer" })
    );
}

#[test]
fn test_demo_routes_dispatch() {
    let bound = demo_app(AppConfig::default()).finalize();

    let post = bound
        .dispatcher
        .dispatch(InboundRequest::new(Method::GET, "/api/posts/1"));
    assert_eq!(post.status, 200);
    assert_eq!(post.body["data"]["title"], "Notes on the Engine");

    let missing = bound
        .dispatcher
        .dispatch(InboundRequest::new(Method::GET, "/api/posts/9"));
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["message"], "Post not found");

    let page = bound
        .dispatcher
        .dispatch(InboundRequest::new(Method::GET, "/api/posts").with_query("page", "2"));
    assert_eq!(page.body["page"], 2);
    assert_eq!(page.body["pageSize"], 10);

    let invalid = bound
        .dispatcher
        .dispatch(InboundRequest::new(Method::POST, "/api/posts").with_body(r#"{"title":1}"#));
    assert_eq!(invalid.status, 400);
    assert_eq!(invalid.body["success"], false);
}
