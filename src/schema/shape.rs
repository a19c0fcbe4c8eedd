//! Schema -> example value / documentation shape conversion.
//!
//! Both conversions are pure and recurse structurally over the schema, so they
//! terminate for any finite nesting and never fail: kinds without a documentation
//! form degrade to [`DocShape::Unknown`].

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::core::Schema;

/// Representative leaf values, in the spirit of generated handler stubs.
const EXAMPLE_STRING: &str = "example";
const EXAMPLE_INTEGER: i64 = 42;
const EXAMPLE_NUMBER: f64 = 1.5;
const EXAMPLE_BOOLEAN: bool = true;

/// Plain shape descriptor used by the documentation assembler.
///
/// Serializes to `{type, properties?}` for objects, `{type, items}` for arrays,
/// `{type}` for primitives and `{type: "unknown"}` for anything else.
#[derive(Debug, Clone, PartialEq)]
pub enum DocShape {
    /// `string`, `number`, `integer` or `boolean`.
    Primitive(&'static str),
    Object(Vec<(String, DocShape)>),
    Array(Box<DocShape>),
    Unknown,
}

impl Schema {
    /// Example value with the same nesting as the schema.
    ///
    /// Used as a stand-in request when sampling a handler and as the example
    /// payload in generated documentation.
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            Schema::String => Value::from(EXAMPLE_STRING),
            Schema::Number => json!(EXAMPLE_NUMBER),
            Schema::Integer => Value::from(EXAMPLE_INTEGER),
            Schema::Boolean => Value::Bool(EXAMPLE_BOOLEAN),
            Schema::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, s)| (k.clone(), s.example()))
                    .collect::<Map<String, Value>>(),
            ),
            Schema::Array(inner) => Value::Array(vec![inner.example()]),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.example(),
            Schema::Any | Schema::Unknown(_) => Value::Null,
        }
    }

    /// Documentation shape of the schema.
    #[must_use]
    pub fn doc_shape(&self) -> DocShape {
        match self {
            Schema::String => DocShape::Primitive("string"),
            Schema::Number => DocShape::Primitive("number"),
            Schema::Integer => DocShape::Primitive("integer"),
            Schema::Boolean => DocShape::Primitive("boolean"),
            Schema::Object(fields) => DocShape::Object(
                fields
                    .iter()
                    .map(|(k, s)| (k.clone(), s.doc_shape()))
                    .collect(),
            ),
            Schema::Array(inner) => DocShape::Array(Box::new(inner.doc_shape())),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.doc_shape(),
            Schema::Any | Schema::Unknown(_) => DocShape::Unknown,
        }
    }
}

impl DocShape {
    /// Derive a shape from a concrete value.
    ///
    /// Arrays take the shape of their first element; empty arrays and `null`
    /// leaves are `unknown`.
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::String(_) => DocShape::Primitive("string"),
            Value::Bool(_) => DocShape::Primitive("boolean"),
            Value::Number(n) if n.is_i64() || n.is_u64() => DocShape::Primitive("integer"),
            Value::Number(_) => DocShape::Primitive("number"),
            Value::Object(map) => DocShape::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), DocShape::of_value(v)))
                    .collect(),
            ),
            Value::Array(items) => DocShape::Array(Box::new(
                items.first().map(DocShape::of_value).unwrap_or(DocShape::Unknown),
            )),
            Value::Null => DocShape::Unknown,
        }
    }

    /// An empty shape carries no documentation: `unknown` or an object without properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            DocShape::Unknown => true,
            DocShape::Object(props) => props.is_empty(),
            DocShape::Primitive(_) | DocShape::Array(_) => false,
        }
    }

    /// Type name as it appears in the descriptor.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DocShape::Primitive(name) => name,
            DocShape::Object(_) => "object",
            DocShape::Array(_) => "array",
            DocShape::Unknown => "unknown",
        }
    }

    /// Example value matching the shape.
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            DocShape::Primitive("string") => Value::from(EXAMPLE_STRING),
            DocShape::Primitive("integer") => Value::from(EXAMPLE_INTEGER),
            DocShape::Primitive("number") => json!(EXAMPLE_NUMBER),
            DocShape::Primitive(_) => Value::Bool(EXAMPLE_BOOLEAN),
            DocShape::Object(props) => Value::Object(
                props
                    .iter()
                    .map(|(k, s)| (k.clone(), s.example()))
                    .collect::<Map<String, Value>>(),
            ),
            DocShape::Array(inner) => Value::Array(vec![inner.example()]),
            DocShape::Unknown => Value::Null,
        }
    }

    /// The plain `{type, properties?, items?}` descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> Value {
        match self {
            DocShape::Object(props) => json!({
                "type": "object",
                "properties": props
                    .iter()
                    .map(|(k, s)| (k.clone(), s.to_descriptor()))
                    .collect::<Map<String, Value>>(),
            }),
            DocShape::Array(inner) => json!({ "type": "array", "items": inner.to_descriptor() }),
            other => json!({ "type": other.type_name() }),
        }
    }

    /// OpenAPI schema object. `unknown` has no OpenAPI type and becomes `{}`.
    #[must_use]
    pub fn to_openapi_schema(&self) -> Value {
        match self {
            DocShape::Object(props) => json!({
                "type": "object",
                "properties": props
                    .iter()
                    .map(|(k, s)| (k.clone(), s.to_openapi_schema()))
                    .collect::<Map<String, Value>>(),
            }),
            DocShape::Array(inner) => {
                json!({ "type": "array", "items": inner.to_openapi_schema() })
            }
            DocShape::Primitive(name) => json!({ "type": name }),
            DocShape::Unknown => json!({}),
        }
    }
}

impl Serialize for DocShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_descriptor().serialize(serializer)
    }
}
