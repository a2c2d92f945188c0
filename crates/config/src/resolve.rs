//! Nested record resolution.
//!
//! Turns raw mappings under record-typed fields into resolved [`Record`]s by
//! running them through the whole loader again. Everything else passes
//! through untouched for the type checker to judge.

use std::collections::BTreeMap;

use {
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    formats::RawMap,
    loader::Loader,
    record::{Node, Record},
    schema::{FieldDescriptor, RecordSchema},
    validate::Violation,
};

/// Field values after nested resolution.
#[derive(Debug, Default)]
pub struct Resolved {
    pub values: BTreeMap<String, Node>,
    /// Violations of nested records that failed to load, keyed by the parent
    /// field and already prefixed with it.
    pub nested: BTreeMap<String, Vec<Violation>>,
}

/// Resolve every record-typed field of `raw`.
///
/// - mapping → full nested load (filter, resolve, check, construct)
/// - `null` → the nested record's zero-argument instance, when it has one,
///   unless the field also accepts `null`
/// - absent without a declared default → same as `null`
///
/// A field typed `union[..]` resolves against its single record branch.
/// Sequences and mappings of records are left as they are. A nested record
/// that fails validation does not stop resolution; its violations are kept
/// in [`Resolved::nested`] for the parent's report.
pub fn resolve_nested(loader: &Loader, schema: &RecordSchema, raw: RawMap) -> Result<Resolved> {
    let mut resolved = Resolved::default();

    for (key, value) in raw {
        let node = match schema.field(&key) {
            Some(field) => match resolve_field(loader, schema, field, value) {
                Ok(node) => node,
                Err(Error::Validation(report)) => {
                    let report = report.nested_under(schema.name(), &key);
                    resolved.nested.insert(key, report.into_violations());
                    continue;
                },
                Err(other) => return Err(other),
            },
            None => Node::Raw(value),
        };
        resolved.values.insert(key, node);
    }

    for field in schema.fields() {
        if resolved.values.contains_key(&field.name)
            || resolved.nested.contains_key(&field.name)
            || field.default.is_some()
        {
            continue;
        }
        if let Some(nested) = field.ty.as_record()
            && nested.is_default_constructible()
        {
            debug!(
                record = schema.name(),
                field = %field.name,
                nested = nested.name(),
                "absent nested record, using its defaults"
            );
            resolved
                .values
                .insert(field.name.clone(), Node::Record(Record::default_for(nested)?));
        }
    }

    Ok(resolved)
}

fn resolve_field(
    loader: &Loader,
    parent: &RecordSchema,
    field: &FieldDescriptor,
    value: Value,
) -> Result<Node> {
    let Some((nested, nullable)) = field.ty.record_branch() else {
        if field.ty.has_record_elements() && !value.is_null() {
            debug!(
                record = parent.name(),
                field = %field.name,
                "collection of records left unresolved"
            );
        }
        return Ok(Node::Raw(value));
    };

    match value {
        Value::Object(map) => {
            debug!(record = parent.name(), field = %field.name, nested = nested.name(), "resolving nested record");
            loader.load_schema(nested, Some(map)).map(Node::Record)
        },
        Value::Null if !nullable => match Record::default_for(nested) {
            Ok(record) => {
                debug!(
                    record = parent.name(),
                    field = %field.name,
                    nested = nested.name(),
                    "null nested record, using its defaults"
                );
                Ok(Node::Record(record))
            },
            Err(e) => {
                warn!(
                    record = parent.name(),
                    field = %field.name,
                    error = %e,
                    "null nested record has no zero-argument form, leaving it unresolved"
                );
                Ok(Node::Raw(Value::Null))
            },
        },
        other => Ok(Node::Raw(other)),
    }
}
