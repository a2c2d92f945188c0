use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {serde_json::Value, tracing::debug};

use crate::{
    error::{Error, Result},
    formats::{DocumentLoader, FormatRegistry, RawMap, into_mapping},
    naming::with_default_extension,
    record::Record,
    resolve::resolve_nested,
    schema::{ConfigRecord, RecordSchema},
    types::TypeExpr,
    validate,
};

/// Environment variable naming the base directory.
pub const CONFIG_DIR_ENV: &str = "CONFIG_DIR";

/// Base directory used when [`CONFIG_DIR_ENV`] is unset.
pub const DEFAULT_CONFIG_DIR: &str = "_config";

/// Loads configuration records from a base directory.
///
/// Holds the format registry and base directory that every load reads.
/// Mutating either needs `&mut self`, so they cannot change under an
/// in-flight load.
#[derive(Debug, Clone)]
pub struct Loader {
    base_dir: PathBuf,
    formats: FormatRegistry,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Base directory from `CONFIG_DIR` (default `_config`) and the
    /// built-in formats.
    #[must_use]
    pub fn new() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Like [`Loader::new`] with a custom environment lookup.
    #[must_use]
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_dir = lookup(CONFIG_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());
        Self::with_base_dir(base_dir)
    }

    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            formats: FormatRegistry::default(),
        }
    }

    /// Replace the format registry.
    #[must_use]
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn set_base_dir(&mut self, base_dir: impl Into<PathBuf>) {
        self.base_dir = base_dir.into();
    }

    #[must_use]
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn register_format(&mut self, extension: &str, loader: Arc<dyn DocumentLoader>) {
        self.formats.register(extension, loader);
    }

    pub fn unregister_format(&mut self, extension: &str) -> Option<Arc<dyn DocumentLoader>> {
        self.formats.unregister(extension)
    }

    // ── Typed entry points ──────────────────────────────────────────────────

    /// Load `T` from its registered file.
    pub fn load<T: ConfigRecord>(&self) -> Result<T> {
        self.load_schema(&T::schema(), None)?.deserialize()
    }

    /// Load `T` from `file_name` under the base directory, ignoring the
    /// file name `T` registered.
    pub fn load_from<T: ConfigRecord>(&self, file_name: &str) -> Result<T> {
        let schema = T::schema();
        schema.ensure_valid()?;
        let raw = self.read_document(file_name)?;
        self.build(&schema, raw)?.deserialize()
    }

    /// Load `T` from already-parsed data.
    pub fn load_data<T: ConfigRecord>(&self, data: RawMap) -> Result<T> {
        self.load_schema(&T::schema(), Some(data))?.deserialize()
    }

    // ── Dynamic entry points ────────────────────────────────────────────────

    /// Load any record type. Fails with [`Error::NotARecordType`] when
    /// `target` is not one.
    pub fn load_record(&self, target: &TypeExpr, data: Option<RawMap>) -> Result<Record> {
        let Some(schema) = target.as_record() else {
            return Err(Error::not_a_record(
                target.to_string(),
                "only record types can be loaded",
            ));
        };
        self.load_schema(schema, data)
    }

    /// Load `schema` from `data`, or from its registered file when `data` is
    /// `None`.
    pub fn load_schema(&self, schema: &Arc<RecordSchema>, data: Option<RawMap>) -> Result<Record> {
        schema.ensure_valid()?;
        let raw = match data {
            Some(data) => data,
            None => self.read_document(&self.file_name_for(schema)?)?,
        };
        self.build(schema, raw)
    }

    fn build(&self, schema: &Arc<RecordSchema>, raw: RawMap) -> Result<Record> {
        let filtered = retain_declared(schema, raw);
        let resolved = resolve_nested(self, schema, filtered)?;
        validate::check_resolved(schema, &resolved)?;
        Record::construct(schema, resolved.values)
    }

    // ── Files ───────────────────────────────────────────────────────────────

    /// The file `schema` loads from: its declared name, with the registry's
    /// default extension appended unless it already ends in a registered one.
    pub fn file_name_for(&self, schema: &RecordSchema) -> Result<String> {
        let declared = schema.file_name().ok_or_else(|| Error::MissingFileName {
            type_name: schema.name().to_string(),
        })?;
        let extensions: Vec<&str> = self.formats.extensions().collect();
        Ok(with_default_extension(declared, &extensions))
    }

    /// Find the file for `file_name` under the base directory.
    ///
    /// A name with an extension is used as is. A bare name is tried with
    /// every registered extension in registration order.
    pub fn resolve_path(&self, file_name: &str) -> Result<PathBuf> {
        let candidates: Vec<PathBuf> = if Path::new(file_name).extension().is_some() {
            vec![self.base_dir.join(file_name)]
        } else {
            self.formats
                .extensions()
                .map(|ext| self.base_dir.join(format!("{file_name}{ext}")))
                .collect()
        };

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "resolved config file");
                Ok(path.clone())
            },
            None => Err(Error::FileNotFound {
                file_name: file_name.to_string(),
                candidates,
            }),
        }
    }

    /// Locate and parse `file_name` with the loader for its extension.
    pub fn read_document(&self, file_name: &str) -> Result<RawMap> {
        let path = self.resolve_path(file_name)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let Some(loader) = self.formats.get(&extension) else {
            return Err(Error::UnsupportedFormat {
                path,
                extension,
                supported: self.formats.extensions().map(str::to_string).collect(),
            });
        };

        debug!(path = %path.display(), format = loader.name(), "loading config");
        loader.load(&path)
    }
}

/// Keep only keys that are declared fields of `schema`.
fn retain_declared(schema: &RecordSchema, raw: RawMap) -> RawMap {
    let mut kept = RawMap::new();
    let mut dropped = Vec::new();
    for (key, value) in raw {
        if schema.has_field(&key) {
            kept.insert(key, value);
        } else {
            dropped.push(key);
        }
    }
    if !dropped.is_empty() {
        debug!(record = schema.name(), keys = ?dropped, "ignoring undeclared keys");
    }
    kept
}

/// Loader-independent helper for callers holding a [`Value`] document.
///
/// Fails with [`Error::Parse`] when `document` is not a mapping.
pub fn document_from_value(document: Value) -> Result<RawMap> {
    into_mapping(document, Path::new("<inline>"))
}
