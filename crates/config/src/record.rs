//! Resolved instances.

use std::{collections::BTreeMap, sync::Arc};

use {
    serde::de::DeserializeOwned,
    serde_json::{Map, Value},
};

use crate::{
    error::{Error, Result},
    schema::RecordSchema,
    types::TypeExpr,
};

/// A field value inside a resolved instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Passed through from the document unchanged.
    Raw(Value),
    /// A nested record, already resolved and checked.
    Record(Record),
}

impl Node {
    #[must_use]
    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(value) => Some(value),
            Self::Record(_) => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Raw(value) => value.clone(),
            Self::Record(record) => record.to_value(),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<Record> for Node {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

/// A fully constructed instance of a record type.
///
/// Every declared field holds a value. Keys that are not fields never
/// reach a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: BTreeMap<String, Node>,
}

impl Record {
    /// Build an instance from already-resolved values.
    ///
    /// Absent fields take their declared defaults. Fails when a field
    /// without a default is absent. Values are not type-checked here.
    pub fn construct(schema: &Arc<RecordSchema>, mut values: BTreeMap<String, Node>) -> Result<Self> {
        let mut missing = Vec::new();
        let mut filled = BTreeMap::new();

        for field in schema.fields() {
            let node = match values.remove(&field.name) {
                Some(node) => node,
                None => match &field.default {
                    Some(default) => default_node(&field.ty, default)?,
                    None => {
                        missing.push(format!("`{}`", field.name));
                        continue;
                    },
                },
            };
            filled.insert(field.name.clone(), node);
        }

        if !missing.is_empty() {
            let noun = if missing.len() == 1 {
                "field"
            } else {
                "fields"
            };
            return Err(Error::construct(
                schema.name(),
                format!("missing required {noun} {}", missing.join(", ")),
            ));
        }

        Ok(Self {
            schema: Arc::clone(schema),
            values: filled,
        })
    }

    /// Zero-argument construction: every field from its default.
    pub fn default_for(schema: &Arc<RecordSchema>) -> Result<Self> {
        Self::construct(schema, BTreeMap::new())
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Node> {
        self.values.get(field)
    }

    /// Raw value of a scalar or collection field.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.get(field).and_then(Node::as_raw)
    }

    /// Nested record stored in a field.
    #[must_use]
    pub fn record(&self, field: &str) -> Option<&Record> {
        self.get(field).and_then(Node::as_record)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.schema
            .fields()
            .iter()
            .filter_map(|f| self.values.get_key_value(&f.name))
            .map(|(name, node)| (name.as_str(), node))
    }

    /// JSON view of the instance, nested records included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields()
            .map(|(name, node)| (name.to_string(), node.to_value()))
            .collect();
        Value::Object(map)
    }

    /// Convert into the caller's typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value())
            .map_err(|e| Error::construct(self.type_name(), e.to_string()))
    }
}

/// Build the node for a declared default. Record-typed defaults become
/// records, recursively through nested overrides.
fn default_node(ty: &TypeExpr, default: &Value) -> Result<Node> {
    let Some((nested, nullable)) = ty.record_branch() else {
        return Ok(Node::Raw(default.clone()));
    };
    match default {
        Value::Null if nullable => Ok(Node::Raw(Value::Null)),
        Value::Null => Ok(Node::Record(Record::default_for(nested)?)),
        Value::Object(overrides) => {
            let mut values = BTreeMap::new();
            for (key, value) in overrides {
                if let Some(field) = nested.field(key) {
                    values.insert(key.clone(), default_node(&field.ty, value)?);
                }
            }
            Ok(Node::Record(Record::construct(nested, values)?))
        },
        other => Ok(Node::Raw(other.clone())),
    }
}
