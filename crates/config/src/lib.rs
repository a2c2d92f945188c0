//! Load JSON/YAML configuration files into strongly-typed records.
//!
//! A record type declares its fields and their types once, usually with
//! [`config_record!`]. [`Loader`] finds the record's file under a base
//! directory (`CONFIG_DIR`, default `_config`), parses it, drops keys the
//! record does not declare, resolves nested records, type-checks every
//! field, and builds the instance.
//!
//! ```ignore
//! use configr_config::{Loader, config_record};
//!
//! config_record! {
//!     pub struct DatabaseConfig from "database" {
//!         pub host: String,
//!         pub port: i64 = 5432,
//!     }
//! }
//!
//! let db: DatabaseConfig = Loader::new().load()?;
//! ```

pub mod error;
pub mod formats;
pub mod loader;
mod macros;
pub mod naming;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod validate;

#[doc(hidden)]
pub use macros::__private;
pub use {
    error::{Error, Result},
    formats::{DocumentLoader, FormatRegistry, JsonLoader, RawMap, YamlLoader},
    loader::{CONFIG_DIR_ENV, DEFAULT_CONFIG_DIR, Loader, document_from_value},
    naming::to_snake_case,
    record::{Node, Record},
    resolve::Resolved,
    schema::{ConfigRecord, FieldDescriptor, RecordSchema, RecordSchemaBuilder},
    types::{FieldType, TypeExpr, TypeParseError},
    validate::{ValidationError, Violation},
};
