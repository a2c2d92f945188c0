//! Record schemas declared in a JSON/YAML document.
//!
//! ```yaml
//! root: Parent
//! records:
//!   - name: Child
//!     fields:
//!       - { name: value, type: integer, default: 0 }
//!   - name: Parent
//!     file: parent.yaml
//!     fields:
//!       - { name: title, type: text }
//!       - { name: child, type: Child }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use {
    anyhow::{Context, Result, bail},
    configr_config::{RawMap, RecordSchema, TypeExpr},
    serde::{Deserialize, Deserializer},
    serde_json::Value,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Record loaded when `--record` is not given.
    #[serde(default)]
    pub root: Option<String>,
    pub records: Vec<RecordDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDef {
    pub name: String,
    /// Explicit file name. Derived from `name` when absent.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// `Some(Null)` when the document says `default: null`.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Built schemas, keyed by record name.
#[derive(Debug)]
pub struct SchemaSet {
    root: Option<String>,
    schemas: HashMap<String, Arc<RecordSchema>>,
    order: Vec<String>,
}

impl SchemaSet {
    pub fn from_raw(raw: RawMap) -> Result<Self> {
        let document: SchemaDocument =
            serde_json::from_value(Value::Object(raw)).context("invalid schema document")?;
        Self::build(document)
    }

    /// Build every record, dependencies first.
    pub fn build(document: SchemaDocument) -> Result<Self> {
        let mut defs = HashMap::new();
        for def in &document.records {
            if defs.insert(def.name.as_str(), def).is_some() {
                bail!("record `{}` is declared twice", def.name);
            }
        }

        let mut order = Vec::new();
        let mut done = HashSet::new();
        for def in &document.records {
            visit(def, &defs, &mut Vec::new(), &mut done, &mut order)?;
        }

        let mut schemas: HashMap<String, Arc<RecordSchema>> = HashMap::new();
        for name in &order {
            let Some(def) = defs.get(name.as_str()) else {
                continue;
            };
            let schema = build_record(def, &schemas)?;
            schema
                .ensure_valid()
                .with_context(|| format!("record `{name}`"))?;
            schemas.insert(name.clone(), schema);
        }

        if let Some(root) = &document.root
            && !schemas.contains_key(root)
        {
            bail!("root record `{root}` is not declared");
        }

        Ok(Self {
            root: document.root,
            schemas,
            order,
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<RecordSchema>> {
        self.schemas.get(name)
    }

    /// The record to load: `requested`, else the document root, else the
    /// last record built.
    pub fn target(&self, requested: Option<&str>) -> Result<&Arc<RecordSchema>> {
        let name = match requested.or(self.root.as_deref()) {
            Some(name) => name,
            None => match self.order.last() {
                Some(last) => last.as_str(),
                None => bail!("schema document declares no records"),
            },
        };
        self.get(name)
            .with_context(|| format!("record `{name}` is not declared"))
    }
}

fn visit<'a>(
    def: &'a RecordDef,
    defs: &HashMap<&str, &'a RecordDef>,
    stack: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    if done.contains(def.name.as_str()) {
        return Ok(());
    }
    if stack.contains(&def.name.as_str()) {
        stack.push(&def.name);
        bail!("record cycle: {}", stack.join(" -> "));
    }

    stack.push(&def.name);
    for field in &def.fields {
        for name in referenced_names(&field.ty) {
            if let Some(&dep) = defs.get(name) {
                visit(dep, defs, stack, done, order)?;
            }
        }
    }
    stack.pop();

    done.insert(&def.name);
    order.push(def.name.clone());
    Ok(())
}

fn build_record(
    def: &RecordDef,
    built: &HashMap<String, Arc<RecordSchema>>,
) -> Result<Arc<RecordSchema>> {
    let mut builder = RecordSchema::builder(&def.name);
    builder = match &def.file {
        Some(file) => builder.file_name(file),
        None => builder.config_file(),
    };

    for field in &def.fields {
        let ty = TypeExpr::parse_with(&field.ty, |name| built.get(name).cloned())
            .with_context(|| format!("field `{}.{}`", def.name, field.name))?;
        builder = match &field.default {
            Some(default) => builder.field_with_default(&field.name, ty, default.clone()),
            None => builder.field(&field.name, ty),
        };
    }
    Ok(builder.build())
}

const BUILTIN_TYPES: &[&str] = &[
    "any", "null", "none", "bool", "boolean", "int", "integer", "float", "str", "string", "text",
    "list", "map", "dict", "optional", "union",
];

/// Identifiers in a type expression that are not built-in type names.
fn referenced_names(ty: &str) -> impl Iterator<Item = &str> {
    ty.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .filter(|word| !BUILTIN_TYPES.contains(&word.to_ascii_lowercase().as_str()))
}
