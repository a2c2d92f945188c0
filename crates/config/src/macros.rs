/// Declare a configuration record: the struct, its schema and its file name.
///
/// ```ignore
/// configr_config::config_record! {
///     /// Database connection settings.
///     pub struct DatabaseConfig from "database" {
///         pub host: String,
///         pub port: i64 = 5432,
///         pub username: String,
///         pub password: String,
///     }
/// }
///
/// let config: DatabaseConfig = Loader::new().load()?;
/// ```
///
/// - `from "name"` is optional; the file name otherwise derives from the type
///   name (`DatabaseConfig` → `database_config`). The loader appends its
///   default extension when the name has no registered one.
/// - `= expr` gives a field its default. The expression must have the
///   field's type (`"localhost".into()` for a `String`) and is captured as a
///   raw value.
/// - The struct derives `Debug`, `Clone`, `PartialEq`, `serde::Serialize` and
///   `serde::Deserialize`, so the calling crate needs `serde` with `derive`.
///   Serializing is what lets a record be another record's default.
///
/// Record types must not contain themselves, directly or through other
/// records.
#[macro_export]
macro_rules! config_record {
    (@field $builder:ident, $field:ident, $ty:ty) => {
        $builder.field(stringify!($field), <$ty as $crate::FieldType>::type_expr())
    };
    (@field $builder:ident, $field:ident, $ty:ty, $default:expr) => {
        $builder
            .field(stringify!($field), <$ty as $crate::FieldType>::type_expr())
            .default_value($crate::__private::default_value::<$ty>($default))
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(from $file:literal)? {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::ConfigRecord for $name {
            fn schema() -> ::std::sync::Arc<$crate::RecordSchema> {
                static SCHEMA: ::std::sync::OnceLock<::std::sync::Arc<$crate::RecordSchema>> =
                    ::std::sync::OnceLock::new();
                ::std::sync::Arc::clone(SCHEMA.get_or_init(|| {
                    let builder = $crate::RecordSchema::builder(stringify!($name)).config_file();
                    $( let builder = builder.file_name($file); )?
                    $(
                        let builder =
                            $crate::config_record!(@field builder, $field, $ty $(, $default)?);
                    )*
                    builder.build()
                }))
            }
        }

        impl $crate::FieldType for $name {
            fn type_expr() -> $crate::TypeExpr {
                $crate::TypeExpr::Record(<Self as $crate::ConfigRecord>::schema())
            }
        }
    };
}

#[doc(hidden)]
pub mod __private {
    use serde::Serialize;

    /// Capture a field default as a raw value.
    pub fn default_value<T: Serialize>(value: T) -> serde_json::Value {
        serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
    }
}
