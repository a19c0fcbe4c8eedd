use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::app::App;
use crate::config::AppConfig;
use crate::docs::{DocDetail, DocsConfig, DocsMiddleware, ParamDoc, ResponseKind};
use crate::gate::{ApiError, BaseResponse, HandlerResult, RequestContext, Sourced};
use crate::handler;
use crate::router::{RouteSchemas, Router};
use crate::schema::Schema;

#[handler]
fn get_profile(_ctx: RequestContext) -> HandlerResult {
    return Ok(BaseResponse::ok().with_data(json!({
        "name": "Ada Lovelace",
        "bio": "Analyst",
        "followers": 1815,
    })));
}

#[handler]
fn update_profile(ctx: RequestContext) -> HandlerResult {
    let name = ctx.body["name"].as_str().unwrap_or_default().to_string();
    return Ok(BaseResponse::ok()
        .message("Profile updated")
        .with_data(json!({ "name": name, "updated": true })));
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u64>,
    size: Option<u64>,
}

#[handler]
fn list_posts(ctx: RequestContext) -> HandlerResult {
    let query: ListQuery = ctx.query_as()?;
    let page = query.page.unwrap_or(1);
    let size = query.size.unwrap_or(10);
    Ok(BaseResponse::ok()
        .with_data(json!([{ "id": "1", "title": "Notes on the Engine" }]))
        .paginated(page, size, 1))
}

fn get_post(ctx: RequestContext) -> HandlerResult {
    match ctx.param_str("id") {
        Some("1") => Ok(BaseResponse::ok()
            .with_data(json!({ "id": "1", "title": "Notes on the Engine", "tags": ["math"] }))),
        _ => Err(ApiError::not_found("Post not found")),
    }
}

fn create_post(ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok()
        .status(201)
        .message("Post created")
        .with_data(json!({ "id": "2", "title": ctx.body["title"] })))
}

fn delete_post(_ctx: RequestContext) -> HandlerResult {
    Err(ApiError::declared(403, "Posts are read-only in the demo"))
}

fn post_schema() -> Schema {
    Schema::object([
        ("title", Schema::string()),
        ("body", Schema::string()),
        ("draft", Schema::boolean().optional()),
    ])
}

/// Demo blog API with docs at `/docs`.
#[must_use]
pub fn demo_app(config: AppConfig) -> App {
    let mut app = App::new(config);

    let mut profile = Router::new()
        .get(
            "/profile",
            Sourced::new(get_profile, GET_PROFILE_SOURCE),
            RouteSchemas::new().detail(DocDetail::new().summary("Read the profile").tag("profile")),
        )
        .post(
            "/profile",
            Sourced::new(update_profile, UPDATE_PROFILE_SOURCE),
            RouteSchemas::new()
                .body(Schema::object([("name", Schema::string())]))
                .detail(DocDetail::new().tag("profile")),
        );

    let posts = Router::new()
        .get(
            "/posts",
            Sourced::new(list_posts, LIST_POSTS_SOURCE),
            RouteSchemas::new().query(Schema::object([
                ("page", Schema::integer().optional()),
                ("size", Schema::integer().optional()),
            ])),
        )
        .get(
            "/posts/:id",
            get_post,
            RouteSchemas::new()
                .response(Schema::object([
                    ("id", Schema::string()),
                    ("title", Schema::string()),
                    ("tags", Schema::array(Schema::string())),
                ]))
                .detail(
                    DocDetail::new()
                        .summary("Read one post")
                        .tag("posts")
                        .parameter(ParamDoc::path("id").described("Post id")),
                ),
        )
        .post("/posts", create_post, RouteSchemas::new().body(post_schema()));
    let mut posts = posts.delete(
        "/posts/:id",
        delete_post,
        RouteSchemas::new().detail(
            DocDetail::new()
                .tag("posts")
                .response(ResponseKind::Success, "Never succeeds", None)
                .response(ResponseKind::InternalServerError, "Always refused", None),
        ),
    );

    app.router("/api", &mut profile, Vec::new());
    app.router("/api", &mut posts, Vec::new());
    app.use_middleware(Arc::new(DocsMiddleware::new(DocsConfig {
        title: "routegate demo".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: Some("A small blog API".to_string()),
        ..DocsConfig::default()
    })));
    app
}
