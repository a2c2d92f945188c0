//! Record schemas: field descriptors, defaults and file-name metadata.

use std::{collections::HashSet, sync::Arc};

use {serde::de::DeserializeOwned, serde_json::Value};

use crate::{
    error::{Error, Result},
    naming::to_snake_case,
    types::TypeExpr,
    validate,
};

/// A declared `(name, type)` pair with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeExpr,
    /// Value used when the field is absent from the document.
    ///
    /// For record-typed fields, `null` means the nested record's own
    /// defaults and a mapping overrides some of them.
    pub default: Option<Value>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A named, closed set of fields. The target of configuration loading.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
    file_name: Option<String>,
}

impl RecordSchema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            file_name: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// File name registered for this record, if any, as declared.
    ///
    /// A name without a registered extension gets the loader's default one
    /// at load time, see [`Loader::file_name_for`](crate::Loader::file_name_for).
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Whether the record can be built without any input.
    #[must_use]
    pub fn is_default_constructible(&self) -> bool {
        self.fields.iter().all(|f| f.default.is_some())
    }

    /// Two schemas describe the same record type.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }

    /// Check the schema is usable as a load target: a name, unique field
    /// names, and defaults that match their field types.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::not_a_record("<unnamed>", "record name is empty"));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(Error::not_a_record(&self.name, "field name is empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::not_a_record(
                    &self.name,
                    format!("duplicate field `{}`", field.name),
                ));
            }
        }
        validate::check_defaults(self).map_err(|report| {
            let violations: Vec<String> =
                report.violations().iter().map(ToString::to_string).collect();
            Error::not_a_record(
                &self.name,
                format!("invalid defaults: {}", violations.join("; ")),
            )
        })
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug)]
#[must_use]
pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    file_name: Option<String>,
}

impl RecordSchemaBuilder {
    /// Append a required field.
    pub fn field(mut self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    /// Append a field with a default.
    pub fn field_with_default(mut self, name: impl Into<String>, ty: TypeExpr, default: Value) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, ty).with_default(default));
        self
    }

    /// Set the default of the most recently added field.
    pub fn default_value(mut self, default: Value) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.default = Some(default);
        }
        self
    }

    /// Register the record under a file name derived from its type name.
    pub fn config_file(mut self) -> Self {
        self.file_name = Some(to_snake_case(&self.name));
        self
    }

    /// Register the record under an explicit file name.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<RecordSchema> {
        Arc::new(RecordSchema {
            name: self.name,
            fields: self.fields,
            file_name: self.file_name,
        })
    }
}

/// A typed configuration record.
///
/// Usually implemented through [`config_record!`](crate::config_record).
pub trait ConfigRecord: DeserializeOwned {
    /// The record's schema. Built once per type.
    fn schema() -> Arc<RecordSchema>;
}
