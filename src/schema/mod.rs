//! # Schema Module
//!
//! A small composable schema language used for two jobs at once: validating the
//! params, body and query of inbound requests, and describing their shape in the
//! generated OpenAPI document.
//!
//! ## Overview
//!
//! [`Schema`] is a closed sum type. Every operation over it is a total recursive
//! `match`, so adding a variant is a compile error everywhere it needs handling.
//!
//! - [`Schema::parse`] validates a JSON value and returns the cleaned value
//!   (unknown object keys stripped) or a [`ValidationError`] listing every issue.
//! - [`Schema::parse_coerced`] does the same for string-typed sources (path
//!   params, query strings), accepting `"42"` for numbers and `"true"` for booleans.
//! - [`Schema::example`] produces a representative value with the same nesting.
//! - [`Schema::doc_shape`] produces the [`DocShape`] descriptor used by the
//!   documentation assembler.
//!
//! ## Example
//!
//! ```
//! use routegate::schema::Schema;
//! use serde_json::json;
//!
//! let body = Schema::object([
//!     ("content", Schema::string()),
//!     ("tags", Schema::array(Schema::string()).optional()),
//! ]);
//!
//! assert!(body.parse(&json!({ "content": "hello" })).is_ok());
//!
//! let err = body.parse(&json!({})).unwrap_err();
//! assert_eq!(err.issues[0].path, "content");
//! assert_eq!(err.issues[0].message, "Required");
//! ```

mod core;
mod error;
mod shape;

pub use core::{ParseMode, Schema};
pub use error::{ValidationError, ValidationIssue};
pub use shape::DocShape;
