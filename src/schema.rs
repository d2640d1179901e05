//! Declarative tool input schemas and the shared validator
//!
//! Every tool declares its arguments as a closed [`Schema`]. The same schema
//! drives both validation of incoming `tools/call` arguments and the JSON
//! Schema advertised through `tools/list`, so the two can never drift apart.
//!
//! Validation is strict: undeclared fields are rejected, numeric bounds are
//! inclusive, and declared defaults are filled in before a handler sees the
//! record.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A closed object shape: an ordered list of named fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

/// Shape of a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum FieldKind {
    String {
        non_empty: bool,
        allowed: Option<Vec<String>>,
    },
    Number {
        integer: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<FieldSpec>,
        min_items: Option<usize>,
    },
    Object(Schema),
}

impl Schema {
    /// Create an empty schema (accepts only `{}`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Declaration order is preserved in `tools/list`.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Names of all declared fields, in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Validate a raw argument record.
    ///
    /// Returns the accepted record with defaults applied, or every violation
    /// found (declared fields first in schema order, then unknown fields by
    /// name).
    pub fn validate(&self, value: &Value) -> Result<ValidatedArgs, ValidationError> {
        let mut violations = Vec::new();
        let validated = match value {
            Value::Object(map) => self.validate_object(map, "", &mut violations),
            other => {
                violations.push(Violation::new(
                    "arguments",
                    ViolationKind::WrongType {
                        expected: "object",
                        found: type_name(other),
                    },
                ));
                Map::new()
            }
        };

        if violations.is_empty() {
            Ok(ValidatedArgs(validated))
        } else {
            Err(ValidationError(violations))
        }
    }

    fn validate_object(
        &self,
        map: &Map<String, Value>,
        prefix: &str,
        violations: &mut Vec<Violation>,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for (name, spec) in &self.fields {
            let path = join_path(prefix, name);
            match map.get(name) {
                Some(value) => {
                    if let Some(accepted) = spec.validate_value(value, &path, violations) {
                        out.insert(name.clone(), accepted);
                    }
                }
                None => {
                    if let Some(default) = &spec.default {
                        out.insert(name.clone(), default.clone());
                    } else if spec.required {
                        violations.push(Violation::new(path, ViolationKind::Missing));
                    }
                }
            }
        }

        let mut unknown: Vec<&String> = map
            .keys()
            .filter(|key| !self.fields.iter().any(|(name, _)| name == *key))
            .collect();
        unknown.sort();
        for key in unknown {
            violations.push(Violation::new(
                join_path(prefix, key),
                ViolationKind::UnknownField,
            ));
        }

        out
    }

    /// Render as JSON Schema for capability advertisement
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            properties.insert(name.clone(), spec.to_json_schema());
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

impl FieldSpec {
    fn with_kind(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::with_kind(FieldKind::String {
            non_empty: false,
            allowed: None,
        })
    }

    pub fn number() -> Self {
        Self::with_kind(FieldKind::Number {
            integer: false,
            min: None,
            max: None,
        })
    }

    pub fn integer() -> Self {
        Self::with_kind(FieldKind::Number {
            integer: true,
            min: None,
            max: None,
        })
    }

    pub fn boolean() -> Self {
        Self::with_kind(FieldKind::Boolean)
    }

    pub fn array(items: FieldSpec) -> Self {
        Self::with_kind(FieldKind::Array {
            items: Box::new(items),
            min_items: None,
        })
    }

    pub fn object(schema: Schema) -> Self {
        Self::with_kind(FieldKind::Object(schema))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value substituted when the field is absent
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject empty and whitespace-only strings
    pub fn non_empty(mut self) -> Self {
        if let FieldKind::String { non_empty, .. } = &mut self.kind {
            *non_empty = true;
        }
        self
    }

    /// Restrict a string field to an enumerated set
    pub fn one_of(mut self, values: &[&str]) -> Self {
        if let FieldKind::String { allowed, .. } = &mut self.kind {
            *allowed = Some(values.iter().map(|v| v.to_string()).collect());
        }
        self
    }

    /// Inclusive lower bound for numeric fields
    pub fn minimum(mut self, bound: f64) -> Self {
        if let FieldKind::Number { min, .. } = &mut self.kind {
            *min = Some(bound);
        }
        self
    }

    /// Inclusive upper bound for numeric fields
    pub fn maximum(mut self, bound: f64) -> Self {
        if let FieldKind::Number { max, .. } = &mut self.kind {
            *max = Some(bound);
        }
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.minimum(min).maximum(max)
    }

    pub fn min_items(mut self, count: usize) -> Self {
        if let FieldKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(count);
        }
        self
    }

    fn validate_value(
        &self,
        value: &Value,
        path: &str,
        violations: &mut Vec<Violation>,
    ) -> Option<Value> {
        let wrong_type = |expected: &'static str| {
            Violation::new(
                path,
                ViolationKind::WrongType {
                    expected,
                    found: type_name(value),
                },
            )
        };

        match &self.kind {
            FieldKind::String { non_empty, allowed } => {
                let Some(s) = value.as_str() else {
                    violations.push(wrong_type("string"));
                    return None;
                };
                if *non_empty && s.trim().is_empty() {
                    violations.push(Violation::new(path, ViolationKind::EmptyString));
                    return None;
                }
                if let Some(allowed) = allowed {
                    if !allowed.iter().any(|a| a == s) {
                        violations.push(Violation::new(
                            path,
                            ViolationKind::NotAllowed {
                                value: s.to_string(),
                                allowed: allowed.clone(),
                            },
                        ));
                        return None;
                    }
                }
                Some(value.clone())
            }
            FieldKind::Number { integer, min, max } => {
                let Some(n) = value.as_f64() else {
                    violations.push(wrong_type(if *integer { "integer" } else { "number" }));
                    return None;
                };
                // Past 2^53 a float no longer names a single integer
                if *integer
                    && (n.fract() != 0.0
                        || (value.is_f64() && n.abs() > MAX_EXACT_FLOAT_INTEGER))
                {
                    violations.push(wrong_type("integer"));
                    return None;
                }
                if let Some(min) = min {
                    if n < *min {
                        violations.push(Violation::new(
                            path,
                            ViolationKind::BelowMinimum { min: *min, found: n },
                        ));
                        return None;
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        violations.push(Violation::new(
                            path,
                            ViolationKind::AboveMaximum { max: *max, found: n },
                        ));
                        return None;
                    }
                }
                if *integer && !(value.is_i64() || value.is_u64()) {
                    // 3.0 is an integer in JSON Schema terms; hand the typed
                    // layer a real integer.
                    return Some(Value::from(n as i64));
                }
                Some(value.clone())
            }
            FieldKind::Boolean => {
                if value.is_boolean() {
                    Some(value.clone())
                } else {
                    violations.push(wrong_type("boolean"));
                    None
                }
            }
            FieldKind::Array { items, min_items } => {
                let Some(elements) = value.as_array() else {
                    violations.push(wrong_type("array"));
                    return None;
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        violations.push(Violation::new(
                            path,
                            ViolationKind::TooFewItems {
                                min: *min,
                                found: elements.len(),
                            },
                        ));
                        return None;
                    }
                }
                let before = violations.len();
                let accepted: Vec<Value> = elements
                    .iter()
                    .enumerate()
                    .filter_map(|(i, element)| {
                        items.validate_value(element, &format!("{}[{}]", path, i), violations)
                    })
                    .collect();
                (violations.len() == before).then_some(Value::Array(accepted))
            }
            FieldKind::Object(schema) => {
                let Some(map) = value.as_object() else {
                    violations.push(wrong_type("object"));
                    return None;
                };
                let before = violations.len();
                let accepted = schema.validate_object(map, path, violations);
                (violations.len() == before).then_some(Value::Object(accepted))
            }
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            FieldKind::String { non_empty, allowed } => {
                let mut s = json!({"type": "string"});
                if *non_empty {
                    s["minLength"] = json!(1);
                }
                if let Some(allowed) = allowed {
                    s["enum"] = json!(allowed);
                }
                s
            }
            FieldKind::Number { integer, min, max } => {
                let ty = if *integer { "integer" } else { "number" };
                let mut s = json!({"type": ty});
                if let Some(min) = min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    s["maximum"] = json!(max);
                }
                s
            }
            FieldKind::Boolean => json!({"type": "boolean"}),
            FieldKind::Array { items, min_items } => {
                let mut s = json!({"type": "array", "items": items.to_json_schema()});
                if let Some(min) = min_items {
                    s["minItems"] = json!(min);
                }
                s
            }
            FieldKind::Object(schema) => schema.to_json_schema(),
        };

        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if let Some(description) = &self.description {
            schema["description"] = json!(description);
        }
        schema
    }
}

/// An argument record that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Deserialize into a handler's typed parameter struct
    pub fn into_typed<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0))
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Missing,
    UnknownField,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    EmptyString,
    NotAllowed {
        value: String,
        allowed: Vec<String>,
    },
    BelowMinimum {
        min: f64,
        found: f64,
    },
    AboveMaximum {
        max: f64,
        found: f64,
    },
    TooFewItems {
        min: usize,
        found: usize,
    },
}

impl Violation {
    fn new(path: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            ViolationKind::Missing => write!(f, "{}: required field is missing", path),
            ViolationKind::UnknownField => write!(f, "{}: unknown field", path),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "{}: expected {}, got {}", path, expected, found)
            }
            ViolationKind::EmptyString => write!(f, "{}: must not be empty", path),
            ViolationKind::NotAllowed { value, allowed } => write!(
                f,
                "{}: \"{}\" is not one of [{}]",
                path,
                value,
                allowed.join(", ")
            ),
            ViolationKind::BelowMinimum { min, found } => {
                write!(f, "{}: {} is below the minimum of {}", path, found, min)
            }
            ViolationKind::AboveMaximum { max, found } => {
                write!(f, "{}: {} is above the maximum of {}", path, found, max)
            }
            ViolationKind::TooFewItems { min, found } => write!(
                f,
                "{}: expected at least {} item(s), got {}",
                path, min, found
            ),
        }
    }
}

/// All violations found while validating one record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", format_violations(.0))]
pub struct ValidationError(Vec<Violation>);

impl ValidationError {
    pub fn first(&self) -> Option<&Violation> {
        self.0.first()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
