//! Document loaders and the extension registry.
//!
//! A [`DocumentLoader`] turns one file into a raw mapping. Every format
//! produces the same value model (`serde_json::Value`), so the engine never
//! sees format-specific types.

use std::{fmt, path::Path, sync::Arc};

use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    validate::kind_of,
};

/// Raw document: string keys to dynamically-typed values.
pub type RawMap = Map<String, Value>;

// ── Loader trait ────────────────────────────────────────────────────────────

/// Parses one configuration file format.
pub trait DocumentLoader: Send + Sync {
    /// Short format name for logs and listings.
    fn name(&self) -> &'static str;

    /// Read `path` and return its top-level mapping.
    fn load(&self, path: &Path) -> Result<RawMap>;
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Accept only mapping roots. `null` (an empty YAML document) is empty.
pub(crate) fn into_mapping(value: Value, path: &Path) -> Result<RawMap> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(RawMap::new()),
        other => Err(Error::parse(
            path,
            format!(
                "document root must be a mapping, got {}",
                kind_of(&other)
            ),
        )),
    }
}

// ── JSON ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl DocumentLoader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&self, path: &Path) -> Result<RawMap> {
        let raw = read(path)?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| Error::parse(path, e.to_string()))?;
        into_mapping(value, path)
    }
}

// ── YAML ────────────────────────────────────────────────────────────────────

/// YAML loader. Without the `yaml` feature every load fails with
/// [`Error::MissingYamlCapability`].
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl YamlLoader {
    /// Whether YAML parsing was compiled in.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(feature = "yaml")
    }
}

impl DocumentLoader for YamlLoader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    #[cfg(feature = "yaml")]
    fn load(&self, path: &Path) -> Result<RawMap> {
        let raw = read(path)?;
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|e| Error::parse(path, e.to_string()))?;
        let value = serde_json::to_value(yaml).map_err(|e| Error::parse(path, e.to_string()))?;
        into_mapping(value, path)
    }

    #[cfg(not(feature = "yaml"))]
    fn load(&self, path: &Path) -> Result<RawMap> {
        Err(Error::MissingYamlCapability {
            path: path.to_path_buf(),
        })
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Ordered extension → loader table. The first entry is the default
/// extension.
#[derive(Clone)]
pub struct FormatRegistry {
    entries: Vec<(String, Arc<dyn DocumentLoader>)>,
}

impl FormatRegistry {
    /// A registry with no formats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `loader` under `extension` (`.json`; the dot is optional).
    ///
    /// Re-registering an extension replaces its loader and keeps its
    /// position.
    pub fn register(&mut self, extension: &str, loader: Arc<dyn DocumentLoader>) {
        let extension = normalize_extension(extension);
        if let Some(entry) = self.entries.iter_mut().find(|(ext, _)| *ext == extension) {
            entry.1 = loader;
        } else {
            self.entries.push((extension, loader));
        }
    }

    /// Remove the loader for `extension`, returning it.
    pub fn unregister(&mut self, extension: &str) -> Option<Arc<dyn DocumentLoader>> {
        let extension = normalize_extension(extension);
        let index = self.entries.iter().position(|(ext, _)| *ext == extension)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn DocumentLoader>> {
        let extension = normalize_extension(extension);
        self.entries
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, loader)| loader)
    }

    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    /// The first registered extension.
    #[must_use]
    pub fn default_extension(&self) -> Option<&str> {
        self.extensions().next()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FormatRegistry {
    /// `.json`, `.yaml` and `.yml`, in that order.
    fn default() -> Self {
        let mut registry = Self::empty();
        let yaml: Arc<dyn DocumentLoader> = Arc::new(YamlLoader);
        registry.register(".json", Arc::new(JsonLoader));
        registry.register(".yaml", Arc::clone(&yaml));
        registry.register(".yml", yaml);
        registry
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(ext, loader)| (ext, loader.name())))
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_ascii_lowercase()
    } else {
        format!(".{}", extension.to_ascii_lowercase())
    }
}
