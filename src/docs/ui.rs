use std::sync::Arc;

use http::Method;
use minijinja::{context, Environment};
use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::{error, info, warn};

use super::assembler::{DocsConfig, OpenApiDocument};
use crate::dispatcher::HandlerResponse;
use crate::gate::InboundRequest;
use crate::middleware::Middleware;

const UI_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{{ title }}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "{{ spec_url }}", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

/// Serves the assembled OpenAPI document and a Swagger UI page for it.
///
/// Adding this middleware to an app is what turns documentation on: `App::finalize`
/// assembles the document and installs it here. Until then both endpoints fall
/// through to the router.
pub struct DocsMiddleware {
    config: DocsConfig,
    document: OnceCell<Arc<OpenApiDocument>>,
}

impl DocsMiddleware {
    #[must_use]
    pub fn new(config: DocsConfig) -> Self {
        DocsMiddleware {
            config,
            document: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DocsConfig {
        &self.config
    }

    /// Install the document. Only the first call has any effect.
    pub fn install(&self, document: Arc<OpenApiDocument>) {
        if self.document.set(document).is_err() {
            warn!(path = %self.config.path, "OpenAPI document already installed");
            return;
        }
        info!(ui = %self.config.path, spec = %self.config.spec_path(), "API docs mounted");
    }

    #[must_use]
    pub fn document(&self) -> Option<&Arc<OpenApiDocument>> {
        self.document.get()
    }

    /// Swagger UI page pointing at the JSON document.
    pub fn render_ui(&self) -> Result<String, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("docs", UI_TEMPLATE)?;
        env.get_template("docs")?.render(context! {
            title => self.config.title.as_str(),
            spec_url => self.config.spec_path(),
        })
    }
}

impl Middleware for DocsMiddleware {
    fn before(&self, req: &InboundRequest) -> Option<HandlerResponse> {
        if req.method != Method::GET {
            return None;
        }
        let document = self.document.get()?;
        let ui_path = self.config.path.trim_end_matches('/');

        if req.path == self.config.spec_path() {
            return Some(HandlerResponse::json(200, document.as_value().clone()));
        }
        if req.path.trim_end_matches('/') == ui_path {
            return Some(match self.render_ui() {
                Ok(html) => HandlerResponse::text(200, "text/html", html),
                Err(e) => {
                    error!(error = %e, "Docs page failed to render");
                    HandlerResponse::json(
                        500,
                        json!({ "success": false, "message": "Internal server error" }),
                    )
                }
            });
        }
        None
    }

    fn docs_trigger(&self) -> Option<&DocsMiddleware> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::assemble;

    fn installed() -> DocsMiddleware {
        let docs = DocsMiddleware::new(DocsConfig {
            title: "Blog API".into(),
            ..DocsConfig::default()
        });
        docs.install(Arc::new(assemble(&[], docs.config())));
        docs
    }

    #[test]
    fn test_serves_document_and_ui() {
        let docs = installed();
        let spec = docs
            .before(&InboundRequest::new(Method::GET, "/docs/openapi.json"))
            .unwrap();
        assert_eq!(spec.status, 200);
        assert_eq!(spec.body["openapi"], "3.0.0");

        let page = docs.before(&InboundRequest::new(Method::GET, "/docs")).unwrap();
        assert_eq!(page.get_header("content-type"), Some("text/html"));
        let html = page.body.as_str().unwrap();
        assert!(html.contains("<title>Blog API</title>"));
        assert!(html.contains("url: \"/docs/openapi.json\""));
        assert!(html.contains(r##"dom_id: "#swagger-ui""##));
    }

    #[test]
    fn test_passes_through_otherwise() {
        let docs = DocsMiddleware::new(DocsConfig::default());
        assert!(docs.before(&InboundRequest::new(Method::GET, "/docs")).is_none());

        let docs = installed();
        assert!(docs.before(&InboundRequest::new(Method::POST, "/docs")).is_none());
        assert!(docs.before(&InboundRequest::new(Method::GET, "/profile")).is_none());
        assert!(docs.docs_trigger().is_some());
    }
}
