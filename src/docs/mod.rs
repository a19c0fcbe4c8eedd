//! # Docs Module
//!
//! OpenAPI 3.0 documentation derived from route declarations.
//!
//! Every mounted route yields an [`AppSwaggerEntry`] carrying the shapes of its
//! params, body and query schemas, an optional author-supplied [`DocDetail`], and a
//! response shape (explicit response schema, else inferred from the handler).
//! [`assemble`] folds the entries, in registration order, into one
//! [`OpenApiDocument`], letting detail override anything derived.
//!
//! Documentation is off unless a [`DocsMiddleware`] is in the app's middleware
//! stack; it then serves the document and a Swagger UI page.

mod assembler;
mod detail;
mod entry;
mod sources;
mod ui;

pub use assembler::{assemble, DocsConfig, OpenApiDocument};
pub use detail::{DocDetail, ParamDoc, ParamLocation, ResponseDoc, ResponseKind};
pub use entry::AppSwaggerEntry;
pub use sources::load_fragments;
pub use ui::DocsMiddleware;
