use serde_json::{Map, Number, Value};

use super::error::{ValidationError, ValidationIssue};

/// How leaf values are matched against primitive schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// JSON types must match exactly (request bodies).
    #[default]
    Strict,
    /// Strings may stand in for numbers and booleans, and a single value may stand
    /// in for a one-element array (path params and query strings).
    Coerce,
}

/// Composable validation schema.
///
/// Object fields keep their declaration order, which is also the order of
/// properties in the generated documentation.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String,
    Number,
    Integer,
    Boolean,
    Object(Vec<(String, Schema)>),
    Array(Box<Schema>),
    /// The field may be absent.
    Optional(Box<Schema>),
    /// The field may be `null`.
    Nullable(Box<Schema>),
    /// Accepts any value.
    Any,
    /// A schema kind the converter does not understand. Validates nothing and
    /// documents as `{"type": "unknown"}`.
    Unknown(String),
}

impl Schema {
    #[must_use]
    pub fn string() -> Self {
        Schema::String
    }

    #[must_use]
    pub fn number() -> Self {
        Schema::Number
    }

    #[must_use]
    pub fn integer() -> Self {
        Schema::Integer
    }

    #[must_use]
    pub fn boolean() -> Self {
        Schema::Boolean
    }

    #[must_use]
    pub fn any() -> Self {
        Schema::Any
    }

    #[must_use]
    pub fn unknown(kind: impl Into<String>) -> Self {
        Schema::Unknown(kind.into())
    }

    /// Build an object schema from `(name, schema)` pairs.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Schema::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    #[must_use]
    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    #[must_use]
    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Short name of the schema kind, as used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Schema::String => "string",
            Schema::Number => "number",
            Schema::Integer => "integer",
            Schema::Boolean => "boolean",
            Schema::Object(_) => "object",
            Schema::Array(_) => "array",
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.kind_name(),
            Schema::Any => "any",
            Schema::Unknown(kind) => kind,
        }
    }

    /// Field names of an object schema (looking through optional/nullable wrappers).
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Schema::Object(fields) => fields.iter().map(|(k, _)| k.as_str()).collect(),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.field_names(),
            _ => Vec::new(),
        }
    }

    /// Validate `value` strictly.
    pub fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        self.parse_with(value, ParseMode::Strict)
    }

    /// Validate a value assembled from strings (path params, query strings).
    pub fn parse_coerced(&self, value: &Value) -> Result<Value, ValidationError> {
        self.parse_with(value, ParseMode::Coerce)
    }

    /// Validate `value`, collecting every issue rather than stopping at the first.
    pub fn parse_with(&self, value: &Value, mode: ParseMode) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let parsed = self.check(Some(value), &mut path, mode, &mut issues);
        if issues.is_empty() {
            Ok(parsed.unwrap_or(Value::Null))
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Returns the cleaned value, or `None` when the field should be omitted
    /// (absent optional) or is invalid (an issue was recorded).
    fn check(
        &self,
        value: Option<&Value>,
        path: &mut Vec<String>,
        mode: ParseMode,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        let value = match (self, value) {
            (Schema::Optional(_) | Schema::Any | Schema::Unknown(_), None) => return None,
            (_, None) => {
                issues.push(ValidationIssue::at(path, "Required"));
                return None;
            }
            (_, Some(v)) => v,
        };

        match self {
            Schema::Any | Schema::Unknown(_) => Some(value.clone()),
            Schema::Optional(inner) => inner.check(Some(value), path, mode, issues),
            Schema::Nullable(inner) => {
                if value.is_null() {
                    Some(Value::Null)
                } else {
                    inner.check(Some(value), path, mode, issues)
                }
            }
            Schema::String => match value {
                Value::String(_) => Some(value.clone()),
                other => mismatch(path, "string", other, issues),
            },
            Schema::Number => match value {
                Value::Number(_) => Some(value.clone()),
                Value::String(s) if mode == ParseMode::Coerce => {
                    match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
                        Some(n) => Some(Value::Number(n)),
                        None => mismatch(path, "number", value, issues),
                    }
                }
                other => mismatch(path, "number", other, issues),
            },
            Schema::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Some(Value::from(f as i64))
                    }
                    _ => {
                        issues.push(ValidationIssue::at(
                            path,
                            "Expected integer, received float",
                        ));
                        None
                    }
                },
                Value::String(s) if mode == ParseMode::Coerce => match s.trim().parse::<i64>() {
                    Ok(i) => Some(Value::from(i)),
                    Err(_) => mismatch(path, "integer", value, issues),
                },
                other => mismatch(path, "integer", other, issues),
            },
            Schema::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if mode == ParseMode::Coerce => match s.as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    _ => mismatch(path, "boolean", value, issues),
                },
                other => mismatch(path, "boolean", other, issues),
            },
            Schema::Object(fields) => match value {
                Value::Object(map) => {
                    let mut out = Map::with_capacity(fields.len());
                    for (key, field) in fields {
                        path.push(key.clone());
                        if let Some(v) = field.check(map.get(key), path, mode, issues) {
                            out.insert(key.clone(), v);
                        }
                        path.pop();
                    }
                    Some(Value::Object(out))
                }
                other => mismatch(path, "object", other, issues),
            },
            Schema::Array(inner) => match value {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (idx, item) in items.iter().enumerate() {
                        path.push(idx.to_string());
                        if let Some(v) = inner.check(Some(item), path, mode, issues) {
                            out.push(v);
                        }
                        path.pop();
                    }
                    Some(Value::Array(out))
                }
                Value::Object(_) => mismatch(path, "array", value, issues),
                scalar if mode == ParseMode::Coerce => {
                    path.push("0".to_string());
                    let item = inner.check(Some(scalar), path, mode, issues);
                    path.pop();
                    item.map(|v| Value::Array(vec![v]))
                }
                other => mismatch(path, "array", other, issues),
            },
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(
    path: &[String],
    expected: &str,
    received: &Value,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    issues.push(ValidationIssue::at(
        path,
        format!("Expected {expected}, received {}", json_type_name(received)),
    ));
    None
}
