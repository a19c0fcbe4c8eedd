//! # Response-Shape Inference
//!
//! Best-effort recovery of a handler's response shape for documentation, used only
//! when a route declares neither a response schema nor documented responses.
//!
//! Two strategies exist:
//!
//! - [`infer_from_source`] reads the handler's source text (captured by
//!   `#[handler]` or attached with [`Sourced`](crate::gate::Sourced)) and parses the
//!   object literal that follows the final `return`. Computed values, conditional
//!   returns and helper calls are invisible to it.
//! - [`infer_from_sample`] calls the handler once with a request assembled from the
//!   route's schema examples and looks at the `data` it returns. It executes user
//!   code, so it is opt-in ([`InferenceMode::SampleInvocation`]).
//!
//! Neither ever fails: anything unexpected yields an empty object.

use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::gate::{Handler, RequestContext};

/// How response shapes are derived for routes without a response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Undocumented responses stay empty.
    Off,
    /// Parse the handler's source text.
    #[default]
    SourceText,
    /// Invoke the handler with example input.
    SampleInvocation,
}

static RETURN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\breturn\b").expect("return regex should be valid"));

static JSON_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bjson\s*!").expect("json! regex should be valid"));

static BARE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:([^:]|$)")
        .expect("bare key regex should be valid")
});

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex should be valid"));

static SPLIT_NEGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s+(\d)").expect("negative number regex should be valid"));

/// Parse the object literal returned by a handler's source text.
///
/// ```
/// use routegate::infer::infer_from_source;
/// use serde_json::json;
///
/// let src = r#"{ let id = 1; return Ok(BaseResponse::ok().with_data(json!({ name: 'ada', tags: ["x",], }))); }"#;
/// assert_eq!(infer_from_source(src), json!({ "name": "ada", "tags": ["x"] }));
/// assert_eq!(infer_from_source("{ compute() }"), json!({}));
/// ```
#[must_use]
pub fn infer_from_source(source: &str) -> Value {
    match literal_after_final_return(source).and_then(|lit| parse_repaired(&lit)) {
        Some(value @ Value::Object(_)) => value,
        Some(other) => {
            debug!(kind = json_kind(&other), "Inferred literal is not an object");
            empty_object()
        }
        None => {
            debug!(source_len = source.len(), "Response shape inference found no literal");
            empty_object()
        }
    }
}

/// Call `handler` with `sample` and return the `data` of its response.
///
/// Errors, panics and responses without object data all yield `{}`.
pub fn infer_from_sample(handler: &dyn Handler, sample: RequestContext) -> Value {
    let path = sample.path.clone();
    match catch_unwind(AssertUnwindSafe(|| handler.call(sample))) {
        Ok(Ok(resp)) => match resp.data {
            Some(data @ Value::Object(_)) => data,
            other => {
                debug!(
                    path = %path,
                    has_data = other.is_some(),
                    "Sampled response has no object data"
                );
                empty_object()
            }
        },
        Ok(Err(err)) => {
            debug!(path = %path, error = %err, "Sampled handler returned an error");
            empty_object()
        }
        Err(_) => {
            debug!(path = %path, "Sampled handler panicked");
            empty_object()
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text of the first balanced `{...}` after the final `return`, or after the final
/// `json!` when the handler ends in a tail expression.
fn literal_after_final_return(source: &str) -> Option<String> {
    let tail = match RETURN_KEYWORD.find_iter(source).last() {
        Some(m) => &source[m.end()..],
        None => {
            let m = JSON_MACRO.find_iter(source).last()?;
            &source[m.end()..]
        }
    };
    // Inside a `return Ok(BaseResponse { .. json!({..}) })` the payload is the macro body.
    let tail = match JSON_MACRO.find(tail) {
        Some(m) => &tail[m.end()..],
        None => tail,
    };
    balanced_braces(tail).map(str::to_string)
}

/// First balanced `{...}` in `text`, skipping braces inside string literals.
fn balanced_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrite a source-level literal into JSON and parse it.
///
/// Literals that are already JSON are taken as they are. Otherwise the repairs only
/// touch text outside string literals.
fn parse_repaired(literal: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(literal) {
        return Some(value);
    }

    let mut repaired = String::with_capacity(literal.len() + 16);
    for span in spans(literal) {
        match span {
            Span::Code(code) => repaired.push_str(&repair_code(code)),
            Span::Quoted(text) => push_double_quoted(&mut repaired, text),
        }
    }
    match serde_json::from_str(&repaired) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, literal = %repaired, "Repaired literal did not parse");
            None
        }
    }
}

#[derive(Debug, PartialEq)]
enum Span<'a> {
    Code(&'a str),
    /// A string literal including its delimiters (possibly unterminated).
    Quoted(&'a str),
}

/// Split `text` into code and string-literal spans.
fn spans(text: &str) -> Vec<Span<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => {
                out.push(Span::Quoted(&text[start..=i]));
                start = i + 1;
                quote = None;
            }
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                if start < i {
                    out.push(Span::Code(&text[start..i]));
                }
                start = i;
                quote = Some(c);
            }
            None => {}
        }
    }
    if start < text.len() {
        let rest = &text[start..];
        out.push(if quote.is_some() {
            Span::Quoted(rest)
        } else {
            Span::Code(rest)
        });
    }
    out
}

fn repair_code(code: &str) -> String {
    let repaired = SPLIT_NEGATIVE.replace_all(code, "-$1");
    // Second pass catches keys whose opening brace was consumed by the outer key.
    let repaired = BARE_KEY.replace_all(&repaired, "$1\"$2\":$3");
    let repaired = BARE_KEY.replace_all(&repaired, "$1\"$2\":$3");
    TRAILING_COMMA.replace_all(&repaired, "$1").into_owned()
}

/// Append a string literal in double-quoted form.
fn push_double_quoted(out: &mut String, literal: &str) {
    if !literal.starts_with('\'') {
        out.push_str(literal);
        return;
    }
    let inner = literal
        .strip_prefix('\'')
        .map(|rest| rest.strip_suffix('\'').unwrap_or(rest))
        .unwrap_or(literal);
    out.push('"');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ApiError, BaseResponse, HandlerResult};
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_final_return_wins() {
        let src = r#"{
            if ctx.params.is_null() {
                return Ok(BaseResponse::ok().with_data(json!({ "early": true })));
            }
            return Ok(BaseResponse::ok().with_data(json!({ "id": 1, "name": "x" })));
        }"#;
        assert_eq!(infer_from_source(src), json!({ "id": 1, "name": "x" }));
    }

    #[test]
    fn test_tail_expression_uses_final_json_macro() {
        let src = r#"{ let _n = 3; Ok(BaseResponse::ok().with_data(json!({ "count": 3 }))) }"#;
        assert_eq!(infer_from_source(src), json!({ "count": 3 }));
    }

    #[test]
    fn test_macro_token_spacing() {
        // proc-macro stringification separates every token
        let src = r#"{ return Ok (BaseResponse :: ok () . with_data (json ! ({ "user" : { "age" : - 4 , "tags" : [] } , }))) ; }"#;
        assert_eq!(
            infer_from_source(src),
            json!({ "user": { "age": -4, "tags": [] } })
        );
    }

    #[test]
    fn test_bare_keys_and_single_quotes() {
        assert_eq!(
            parse_repaired("{ id: 1, title: 'hi', nested: { ok: true }, }"),
            Some(json!({ "id": 1, "title": "hi", "nested": { "ok": true } }))
        );
    }

    #[test]
    fn test_string_values_are_not_rewritten() {
        let src = r#"{ return Ok(BaseResponse::ok().with_data(json!({ "note": "a, b: c", "id": 1 }))); }"#;
        assert_eq!(infer_from_source(src), json!({ "note": "a, b: c", "id": 1 }));

        assert_eq!(
            parse_repaired("{ note: 'x, y: - 1,}', quoted: 'say \"hi\"', }"),
            Some(json!({ "note": "x, y: - 1,}", "quoted": "say \"hi\"" }))
        );
    }

    #[test]
    fn test_spans_split_on_string_literals() {
        assert_eq!(
            spans(r#"{ a: "b: c", d: 'e' }"#),
            vec![
                Span::Code("{ a: "),
                Span::Quoted(r#""b: c""#),
                Span::Code(", d: "),
                Span::Quoted("'e'"),
                Span::Code(" }"),
            ]
        );
    }

    #[test]
    fn test_unparseable_literal_degrades_to_empty() {
        assert_eq!(
            infer_from_source("{ return Ok(BaseResponse::ok().with_data(json!({ \"id\": id }))); }"),
            json!({})
        );
        assert_eq!(infer_from_source("{ return ; }"), json!({}));
        assert_eq!(infer_from_source(""), json!({}));
        assert_eq!(infer_from_source("{ return Ok(json!({ \"a\": 1 "), json!({}));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        assert_eq!(
            balanced_braces(r#"x { "a": "}{", "b": 2 } y"#),
            Some(r#"{ "a": "}{", "b": 2 }"#)
        );
    }

    #[test]
    fn test_sample_invocation() {
        let handler = |ctx: RequestContext| -> HandlerResult {
            Ok(BaseResponse::ok().with_data(json!({ "echo": ctx.body["content"] })))
        };
        let sample = RequestContext::synthetic(
            Method::POST,
            "/posts",
            json!({}),
            json!({ "content": "example" }),
            json!({}),
        );
        assert_eq!(
            infer_from_sample(&handler, sample),
            json!({ "echo": "example" })
        );
    }

    #[test]
    fn test_sample_failures_degrade() {
        let failing =
            |_ctx: RequestContext| -> HandlerResult { Err(ApiError::not_found("nope")) };
        let panicking = |_ctx: RequestContext| -> HandlerResult { panic!("sampling") };
        let ctx = || RequestContext::synthetic(Method::GET, "/", json!({}), json!({}), json!({}));
        assert_eq!(infer_from_sample(&failing, ctx()), json!({}));
        assert_eq!(infer_from_sample(&panicking, ctx()), json!({}));
    }
}
