//! Type checking of resolved field values against declared types.
//!
//! Runs after nested resolution, so record-typed fields are expected to hold
//! a resolved [`Record`]. Every violation is collected before reporting.

use std::{collections::BTreeMap, fmt};

use serde_json::Value;

use crate::{
    record::{Node, Record},
    resolve::Resolved,
    schema::RecordSchema,
    types::TypeExpr,
};

/// A single field whose value does not match its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path, e.g. `child.value` or `items[2]`.
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Aggregate report of every violation found in one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    record: String,
    violations: Vec<Violation>,
}

impl ValidationError {
    #[must_use]
    pub fn new(record: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            record: record.into(),
            violations,
        }
    }

    /// Name of the record that failed.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Paths of the failing fields.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    #[must_use]
    pub fn violation(&self, field: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.field == field)
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Re-root the report under a parent record's field.
    #[must_use]
    pub fn nested_under(self, parent: &str, field: &str) -> Self {
        Self {
            record: parent.to_string(),
            violations: self
                .violations
                .into_iter()
                .map(|v| Violation {
                    field: join_path(field, &v.field),
                    ..v
                })
                .collect(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.violations.len();
        let noun = if count == 1 {
            "violation"
        } else {
            "violations"
        };
        write!(f, "invalid {} ({count} {noun}): ", self.record)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Check every present value against its field's declared type.
///
/// Keys without a field descriptor are ignored; the loader drops them
/// before this runs.
pub fn check(schema: &RecordSchema, values: &BTreeMap<String, Node>) -> Result<(), ValidationError> {
    collect(schema, values, &BTreeMap::new())
}

/// Like [`check`], merging the violations of nested records that failed
/// during resolution into one report, in field declaration order.
pub fn check_resolved(schema: &RecordSchema, resolved: &Resolved) -> Result<(), ValidationError> {
    collect(schema, &resolved.values, &resolved.nested)
}

fn collect(
    schema: &RecordSchema,
    values: &BTreeMap<String, Node>,
    nested: &BTreeMap<String, Vec<Violation>>,
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    for field in schema.fields() {
        if let Some(found) = nested.get(&field.name) {
            violations.extend(found.iter().cloned());
        } else if let Some(node) = values.get(&field.name) {
            check_node(&field.ty, node, &field.name, &mut violations);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(schema.name(), violations))
    }
}

/// Check declared defaults against their field types.
///
/// A record-typed default is `null` (the nested record's own defaults, which
/// must then exist) or a mapping overriding some nested fields.
pub fn check_defaults(schema: &RecordSchema) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    for field in schema.fields() {
        if let Some(default) = &field.default {
            check_default(&field.ty, default, &field.name, &mut violations);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(schema.name(), violations))
    }
}

fn check_default(ty: &TypeExpr, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match (ty.record_branch(), value) {
        (Some((nested, _)), Value::Object(overrides)) => {
            for (key, value) in overrides {
                if let Some(field) = nested.field(key) {
                    check_default(&field.ty, value, &join_path(path, key), out);
                }
            }
        },
        (Some((nested, false)), Value::Null) if !nested.is_default_constructible() => {
            out.push(Violation {
                field: path.to_string(),
                expected: format!("{} with defaults for every field", nested.name()),
                actual: "null".to_string(),
            });
        },
        (Some((_, false)), Value::Null) => {},
        _ => check_value(ty, value, path, out),
    }
}

fn check_node(ty: &TypeExpr, node: &Node, path: &str, out: &mut Vec<Violation>) {
    match node {
        Node::Raw(value) => check_value(ty, value, path, out),
        Node::Record(record) => {
            if !record_matches(ty, record) {
                out.push(Violation {
                    field: path.to_string(),
                    expected: ty.to_string(),
                    actual: record.type_name().to_string(),
                });
            }
        },
    }
}

fn record_matches(ty: &TypeExpr, record: &Record) -> bool {
    match ty {
        TypeExpr::Any => true,
        TypeExpr::Record(schema) => schema.same_type(record.schema()),
        TypeExpr::Optional(inner) => record_matches(inner, record),
        TypeExpr::Union(branches) => branches.iter().any(|b| record_matches(b, record)),
        _ => false,
    }
}

fn check_value(ty: &TypeExpr, value: &Value, path: &str, out: &mut Vec<Violation>) {
    let matches = match ty {
        TypeExpr::Any => true,
        TypeExpr::Null => value.is_null(),
        TypeExpr::Bool => value.is_boolean(),
        TypeExpr::Int => value.is_i64() || value.is_u64(),
        TypeExpr::BoundedInt { min, max } => {
            integer_of(value).is_some_and(|n| (*min..=*max).contains(&n))
        },
        TypeExpr::Float => value.is_number(),
        TypeExpr::Text => value.is_string(),
        // Raw mappings are never instances; nested records must be resolved.
        TypeExpr::Record(_) => false,
        TypeExpr::Optional(inner) => value.is_null() || branch_matches(inner, value, path),
        TypeExpr::Union(branches) => branches.iter().any(|b| branch_matches(b, value, path)),
        TypeExpr::List(inner) => match value {
            Value::Array(items) => {
                if **inner != TypeExpr::Any {
                    for (i, item) in items.iter().enumerate() {
                        check_value(inner, item, &format!("{path}[{i}]"), out);
                    }
                }
                true
            },
            _ => false,
        },
        TypeExpr::Map(inner) => match value {
            Value::Object(entries) => {
                if **inner != TypeExpr::Any {
                    for (key, item) in entries {
                        check_value(inner, item, &join_path(path, key), out);
                    }
                }
                true
            },
            _ => false,
        },
    };

    if !matches {
        let actual = match (ty, integer_of(value)) {
            (TypeExpr::BoundedInt { .. }, Some(n)) => n.to_string(),
            _ => kind_of(value).to_string(),
        };
        out.push(Violation {
            field: path.to_string(),
            expected: ty.to_string(),
            actual,
        });
    }
}

fn integer_of(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

/// Whether `value` fully matches one branch of an optional or union.
fn branch_matches(ty: &TypeExpr, value: &Value, path: &str) -> bool {
    let mut scratch = Vec::new();
    check_value(ty, value, path, &mut scratch);
    scratch.is_empty()
}

/// Kind name of a raw value as used in reports.
#[must_use]
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if key.starts_with('[') {
        format!("{prefix}{key}")
    } else {
        format!("{prefix}.{key}")
    }
}
