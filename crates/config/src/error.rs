use std::path::PathBuf;

use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{type_name} is not a config record: {reason}")]
    NotARecordType { type_name: String, reason: String },

    #[error("{type_name} has no config file name; declare it with `config_record!` or `.config_file()`")]
    MissingFileName { type_name: String },

    #[error("configuration file not found: {}", display_candidates(.candidates))]
    FileNotFound {
        file_name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("unsupported file extension: {extension:?} for {}. Supported: {supported:?}", .path.display())]
    UnsupportedFormat {
        path: PathBuf,
        extension: String,
        supported: Vec<String>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("YAML support is required to read {}; rebuild with the `yaml` feature", .path.display())]
    MissingYamlCapability { path: PathBuf },

    #[error("cannot construct {type_name}: {message}")]
    Construct { type_name: String, message: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl Error {
    #[must_use]
    pub fn not_a_record(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotARecordType {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn construct(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construct {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
