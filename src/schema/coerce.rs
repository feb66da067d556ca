//! Coercion of loosely typed input into values that satisfy a [`Schema`].
//!
//! Path, query, header and cookie values always arrive as strings, so
//! primitives accept their string spelling as well (`"42"`, `"true"`).
//! Every violation is collected; a failed coercion reports all of them.

use super::{
    EnumSchema, FloatSchema, IntegerSchema, InterfaceSchema, ListSchema, Literal, Schema,
    ShapeSchema, StringSchema,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use thiserror::Error;

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl Issue {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Prepend segments, outermost first.
    #[must_use]
    pub fn prefixed<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        let mut path: Vec<PathSegment> = segments.into_iter().map(Into::into).collect();
        path.append(&mut self.path);
        self.path = path;
        self
    }

    /// Issue for a value that is absent but required.
    pub fn required() -> Self {
        Issue::new("invalid_type", "Required")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to coerce value: {} issue(s)", .issues.len())]
pub struct CoerceError {
    pub issues: Vec<Issue>,
}

impl Schema {
    /// Coerce `raw` into a value that satisfies this schema.
    pub fn instantiate(&self, raw: &Value) -> Result<Value, CoerceError> {
        let mut issues = Vec::new();
        let value = coerce(self, raw, &mut Vec::new(), &mut issues);
        if issues.is_empty() {
            Ok(value)
        } else {
            Err(CoerceError { issues })
        }
    }
}

type Issues = Vec<Issue>;

fn push(issues: &mut Issues, path: &[PathSegment], code: &str, message: String) {
    issues.push(Issue {
        code: code.to_string(),
        message,
        path: path.to_vec(),
    });
}

fn type_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_type(issues: &mut Issues, path: &[PathSegment], expected: &str, raw: &Value) -> Value {
    let message = if raw.is_null() {
        "Required".to_string()
    } else {
        format!("Expected {expected}, received {}", type_name(raw))
    };
    push(issues, path, "invalid_type", message);
    Value::Null
}

fn coerce(schema: &Schema, raw: &Value, path: &mut Vec<PathSegment>, issues: &mut Issues) -> Value {
    match schema {
        Schema::Literal(kind) => coerce_literal(*kind, raw, path, issues),
        Schema::String(s) => coerce_string(s, raw, path, issues),
        Schema::Integer(s) => coerce_integer(s, raw, path, issues),
        Schema::Float(s) => coerce_float(s, raw, path, issues),
        Schema::Enum(s) => coerce_enum(s, raw, path, issues),
        Schema::List(s) => coerce_list(s, raw, path, issues),
        Schema::Shape(s) => coerce_shape(s, raw, path, issues),
        Schema::Interface(s) => coerce_interface(s, raw, path, issues),
    }
}

fn as_string(raw: &Value) -> Option<String> {
    raw.as_str().map(str::to_string)
}

/// Whole numbers, widened so that both `i64` and `u64` extremes stay exact.
/// Floats too large to be any supported integer are not cast.
fn as_integer(raw: &Value) -> Option<i128> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() <= u64::MAX as f64)
                    .map(|f| f as i128)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Finite values only; NaN and the infinities have no JSON spelling.
fn as_float(raw: &Value) -> Option<(f64, Number)> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Number::from_f64(value).map(|number| (value, number))
}

fn as_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn integer_value(value: i128) -> Value {
    i64::try_from(value)
        .map(Value::from)
        .or_else(|_| u64::try_from(value).map(Value::from))
        .unwrap_or(Value::Null)
}

/// Checks `value` against inclusive bounds. Out-of-range values are reported,
/// never clamped.
fn check_range(
    value: i128,
    minimum: i128,
    maximum: i128,
    path: &[PathSegment],
    issues: &mut Issues,
) -> Value {
    if value < minimum {
        push(
            issues,
            path,
            "too_small",
            format!("Number must be greater than or equal to {minimum}"),
        );
    } else if value > maximum {
        push(
            issues,
            path,
            "too_big",
            format!("Number must be less than or equal to {maximum}"),
        );
    }
    integer_value(value)
}

fn coerce_literal(kind: Literal, raw: &Value, path: &[PathSegment], issues: &mut Issues) -> Value {
    match kind {
        Literal::String => match as_string(raw) {
            Some(s) => Value::String(s),
            None => invalid_type(issues, path, "string", raw),
        },
        Literal::Boolean => match as_bool(raw) {
            Some(b) => Value::Bool(b),
            None => invalid_type(issues, path, "boolean", raw),
        },
        Literal::Integer => match as_integer(raw) {
            Some(i) => check_range(i, i64::MIN.into(), i64::MAX.into(), path, issues),
            None => invalid_type(issues, path, "integer", raw),
        },
        Literal::BoundedInteger { minimum, maximum } => match as_integer(raw) {
            Some(i) => check_range(i, minimum.into(), maximum.into(), path, issues),
            None => invalid_type(issues, path, "integer", raw),
        },
        Literal::Float => match as_float(raw) {
            Some((_, number)) => Value::Number(number),
            None => invalid_type(issues, path, "float", raw),
        },
    }
}

fn check_format(format: &str, value: &str) -> bool {
    match format {
        "email" => {
            let mut parts = value.splitn(2, '@');
            matches!(
                (parts.next(), parts.next()),
                (Some(local), Some(domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            )
        }
        "uri" | "url" => url::Url::parse(value).is_ok(),
        "date" => {
            let bytes = value.as_bytes();
            bytes.len() == 10
                && bytes[4] == b'-'
                && bytes[7] == b'-'
                && value
                    .chars()
                    .enumerate()
                    .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
        }
        _ => true,
    }
}

fn coerce_string(
    schema: &StringSchema,
    raw: &Value,
    path: &[PathSegment],
    issues: &mut Issues,
) -> Value {
    let Some(value) = as_string(raw) else {
        return invalid_type(issues, path, "string", raw);
    };
    let len = value.chars().count();
    if let Some(min) = schema.min_length {
        if len < min {
            push(
                issues,
                path,
                "too_small",
                format!("String must contain at least {min} character(s)"),
            );
        }
    }
    if let Some(max) = schema.max_length {
        if len > max {
            push(
                issues,
                path,
                "too_big",
                format!("String must contain at most {max} character(s)"),
            );
        }
    }
    if let Some(pattern) = &schema.pattern {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(&value) => {}
            Ok(_) => push(
                issues,
                path,
                "invalid_string",
                format!("Value does not match regular expression \"{pattern}\""),
            ),
            Err(err) => push(
                issues,
                path,
                "custom",
                format!("Pattern \"{pattern}\" of {} is invalid: {err}", schema.name),
            ),
        }
    }
    if let Some(format) = &schema.format {
        if !check_format(format, &value) {
            push(
                issues,
                path,
                "invalid_string",
                format!("Value is not a valid {format}"),
            );
        }
    }
    Value::String(value)
}

fn coerce_integer(
    schema: &IntegerSchema,
    raw: &Value,
    path: &[PathSegment],
    issues: &mut Issues,
) -> Value {
    let Some(value) = as_integer(raw) else {
        return invalid_type(issues, path, "integer", raw);
    };
    check_range(
        value,
        schema.minimum.unwrap_or(i64::MIN).into(),
        schema.maximum.unwrap_or(i64::MAX).into(),
        path,
        issues,
    )
}

fn coerce_float(schema: &FloatSchema, raw: &Value, path: &[PathSegment], issues: &mut Issues) -> Value {
    let Some((value, number)) = as_float(raw) else {
        return invalid_type(issues, path, "float", raw);
    };
    if let Some(min) = schema.minimum {
        if value < min {
            push(
                issues,
                path,
                "too_small",
                format!("Number must be greater than or equal to {min}"),
            );
        }
    }
    if let Some(max) = schema.maximum {
        if value > max {
            push(
                issues,
                path,
                "too_big",
                format!("Number must be less than or equal to {max}"),
            );
        }
    }
    Value::Number(number)
}

fn coerce_enum(schema: &EnumSchema, raw: &Value, path: &[PathSegment], issues: &mut Issues) -> Value {
    let Some(value) = raw.as_str() else {
        return invalid_type(issues, path, "string", raw);
    };
    if !schema.cases.iter().any(|c| c == value) {
        push(
            issues,
            path,
            "invalid_enum_value",
            format!(
                "Invalid enum value. Expected {}, received '{value}'",
                schema
                    .cases
                    .iter()
                    .map(|c| format!("'{c}'"))
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
        );
    }
    Value::String(value.to_string())
}

fn coerce_list(
    schema: &ListSchema,
    raw: &Value,
    path: &mut Vec<PathSegment>,
    issues: &mut Issues,
) -> Value {
    let Some(items) = raw.as_array() else {
        return invalid_type(issues, path, "array", raw);
    };
    if let Some(min) = schema.min_count {
        if items.len() < min {
            push(
                issues,
                path,
                "too_small",
                format!("Array must contain at least {min} element(s)"),
            );
        }
    }
    if let Some(max) = schema.max_count {
        if items.len() > max {
            push(
                issues,
                path,
                "too_big",
                format!("Array must contain at most {max} element(s)"),
            );
        }
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        path.push(PathSegment::Index(i));
        out.push(coerce(&schema.item, item, path, issues));
        path.pop();
    }
    Value::Array(out)
}

fn coerce_shape(
    schema: &ShapeSchema,
    raw: &Value,
    path: &mut Vec<PathSegment>,
    issues: &mut Issues,
) -> Value {
    let Some(object) = raw.as_object() else {
        return invalid_type(issues, path, "object", raw);
    };
    let unknown: Vec<&str> = object
        .keys()
        .filter(|k| !schema.properties.iter().any(|p| &p.name == *k))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        push(
            issues,
            path,
            "unrecognized_keys",
            format!(
                "Unrecognized key(s) in object: {}",
                unknown
                    .iter()
                    .map(|k| format!("'{k}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );
    }
    let mut out = Map::new();
    for property in &schema.properties {
        path.push(PathSegment::Key(property.name.clone()));
        match object.get(&property.name) {
            None | Some(Value::Null) if !property.required => {}
            Some(value) => {
                let coerced = coerce(&property.schema, value, path, issues);
                out.insert(property.name.clone(), coerced);
            }
            None => push(issues, path, "invalid_type", "Required".to_string()),
        }
        path.pop();
    }
    Value::Object(out)
}

fn coerce_interface(
    schema: &InterfaceSchema,
    raw: &Value,
    path: &mut Vec<PathSegment>,
    issues: &mut Issues,
) -> Value {
    if let Some(discriminator) = &schema.discriminator {
        let Some(object) = raw.as_object() else {
            return invalid_type(issues, path, "object", raw);
        };
        let tag = object.get(&discriminator.property_name).and_then(Value::as_str);
        let implementation = tag.and_then(|tag| {
            discriminator
                .mapping
                .iter()
                .find(|(id, _)| id == tag)
                .and_then(|(_, name)| {
                    schema
                        .implementations
                        .iter()
                        .find(|i| i.name() == Some(name.as_str()))
                })
        });
        let Some(implementation) = implementation else {
            path.push(PathSegment::Key(discriminator.property_name.clone()));
            push(
                issues,
                path,
                "invalid_union_discriminator",
                format!(
                    "Invalid discriminator value. Expected {}",
                    discriminator
                        .mapping
                        .iter()
                        .map(|(id, _)| format!("'{id}'"))
                        .collect::<Vec<_>>()
                        .join(" | ")
                ),
            );
            path.pop();
            return Value::Null;
        };
        let mut rest = object.clone();
        rest.remove(&discriminator.property_name);
        let mut coerced = coerce(implementation, &Value::Object(rest), path, issues);
        if let Value::Object(map) = &mut coerced {
            map.insert(
                discriminator.property_name.clone(),
                object
                    .get(&discriminator.property_name)
                    .cloned()
                    .unwrap_or(Value::Null),
            );
        }
        return coerced;
    }

    for implementation in &schema.implementations {
        if let Ok(value) = implementation.instantiate(raw) {
            return value;
        }
    }
    push(
        issues,
        path,
        "invalid_union",
        format!("Value does not match any implementation of {}", schema.name),
    );
    Value::Null
}
