//! Runtime description of declared field types.
//!
//! A [`TypeExpr`] is what the type checker and the nested resolver inspect
//! instead of reflecting on Rust types. [`FieldType`] maps Rust field types
//! to their expression, and [`TypeExpr::parse_with`] builds one from the
//! textual grammar used by schema documents.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use crate::schema::RecordSchema;

/// A declared field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Any value; never checked.
    Any,
    /// Only `null`.
    Null,
    Bool,
    Int,
    /// An integer within `min..=max`, e.g. the range of a `u16` field.
    BoundedInt { min: i128, max: i128 },
    /// Floating point; integers are accepted too.
    Float,
    Text,
    /// A sequence whose elements all match the inner type.
    List(Box<TypeExpr>),
    /// A string-keyed mapping whose values all match the inner type.
    Map(Box<TypeExpr>),
    /// `null` or the inner type.
    Optional(Box<TypeExpr>),
    /// At least one branch must match.
    Union(Vec<TypeExpr>),
    /// A nested record.
    Record(Arc<RecordSchema>),
}

impl TypeExpr {
    /// Type expression of a Rust field type.
    #[must_use]
    pub fn of<T: FieldType + ?Sized>() -> Self {
        T::type_expr()
    }

    #[must_use]
    pub fn list(inner: Self) -> Self {
        Self::List(Box::new(inner))
    }

    #[must_use]
    pub fn map(inner: Self) -> Self {
        Self::Map(Box::new(inner))
    }

    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// The record schema when this is a record type.
    #[must_use]
    pub fn as_record(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            Self::Record(schema) => Some(schema),
            _ => None,
        }
    }

    /// The record a mapping value resolves to, and whether `null` is
    /// accepted instead.
    ///
    /// Covers `Record`, `optional[Record]` and unions with exactly one
    /// record branch, such as `union[Record, null]`.
    #[must_use]
    pub fn record_branch(&self) -> Option<(&Arc<RecordSchema>, bool)> {
        match self {
            Self::Record(schema) => Some((schema, false)),
            Self::Optional(inner) => inner.record_branch().map(|(schema, _)| (schema, true)),
            Self::Union(branches) => {
                let mut records = branches.iter().filter_map(Self::record_branch);
                let (schema, nullable) = records.next()?;
                if records.next().is_some() {
                    return None;
                }
                let nullable = nullable || branches.iter().any(Self::accepts_null);
                Some((schema, nullable))
            },
            _ => None,
        }
    }

    fn accepts_null(&self) -> bool {
        match self {
            Self::Null | Self::Any | Self::Optional(_) => true,
            Self::Union(branches) => branches.iter().any(Self::accepts_null),
            _ => false,
        }
    }

    /// Whether a record type appears anywhere inside a collection type.
    #[must_use]
    pub fn has_record_elements(&self) -> bool {
        match self {
            Self::List(inner) | Self::Map(inner) => {
                inner.as_record().is_some() || inner.has_record_elements()
            },
            Self::Optional(inner) => inner.has_record_elements(),
            Self::Union(branches) => branches.iter().any(Self::has_record_elements),
            _ => false,
        }
    }

    /// Parse the textual form, resolving bare identifiers through `lookup`.
    ///
    /// ```text
    /// integer | text | float | boolean | null | any
    /// list[T] | map[T] | optional[T] | union[T, U, ...] | RecordName
    /// ```
    pub fn parse_with<F>(input: &str, lookup: F) -> Result<Self, TypeParseError>
    where
        F: Fn(&str) -> Option<Arc<RecordSchema>>,
    {
        let mut parser = Parser {
            input,
            pos: 0,
            lookup: &lookup,
        };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos < input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::BoundedInt { min, max } => write!(f, "integer[{min}..={max}]"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Map(inner) => write!(f, "map[{inner}]"),
            Self::Optional(inner) => write!(f, "optional[{inner}]"),
            Self::Union(branches) => {
                write!(f, "union[")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{branch}")?;
                }
                write!(f, "]")
            },
            Self::Record(schema) => write!(f, "{}", schema.name()),
        }
    }
}

impl FromStr for TypeExpr {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, |_| None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type expression {input:?} at offset {offset}: {message}")]
pub struct TypeParseError {
    pub input: String,
    pub offset: usize,
    pub message: String,
}

struct Parser<'a, F> {
    input: &'a str,
    pos: usize,
    lookup: &'a F,
}

impl<F> Parser<'_, F>
where
    F: Fn(&str) -> Option<Arc<RecordSchema>>,
{
    fn error(&self, message: impl Into<String>) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, ch: char) -> Result<(), TypeParseError> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{ch}'")))
        }
    }

    fn ident(&mut self) -> Result<&str, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(self.error("expected a type name"));
        }
        self.pos += len;
        Ok(&self.input[start..start + len])
    }

    fn expr(&mut self) -> Result<TypeExpr, TypeParseError> {
        let start = self.pos;
        let name = self.ident()?.to_string();
        let expr = match name.to_ascii_lowercase().as_str() {
            "any" => TypeExpr::Any,
            "null" | "none" => TypeExpr::Null,
            "bool" | "boolean" => TypeExpr::Bool,
            "int" | "integer" => {
                if self.eat('[') {
                    let min = self.int_literal()?;
                    self.skip_ws();
                    if !self.rest().starts_with("..=") {
                        return Err(self.error("expected '..='"));
                    }
                    self.pos += 3;
                    let max = self.int_literal()?;
                    self.expect_char(']')?;
                    if min > max {
                        return Err(self.error("empty integer range"));
                    }
                    TypeExpr::BoundedInt { min, max }
                } else {
                    TypeExpr::Int
                }
            },
            "float" => TypeExpr::Float,
            "str" | "string" | "text" => TypeExpr::Text,
            "list" => TypeExpr::list(self.single_param()?),
            "map" | "dict" => TypeExpr::map(self.single_param()?),
            "optional" => TypeExpr::optional(self.single_param()?),
            "union" => {
                self.expect_char('[')?;
                let mut branches = vec![self.expr()?];
                while self.eat(',') {
                    branches.push(self.expr()?);
                }
                self.expect_char(']')?;
                TypeExpr::Union(branches)
            },
            _ => match (self.lookup)(&name) {
                Some(schema) => TypeExpr::Record(schema),
                None => {
                    self.pos = start;
                    self.skip_ws();
                    return Err(self.error(format!("unknown type `{name}`")));
                },
            },
        };
        Ok(expr)
    }

    fn int_literal(&mut self) -> Result<i128, TypeParseError> {
        self.skip_ws();
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let len = sign
            + rest[sign..]
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len() - sign);
        let literal = &rest[..len];
        let value = literal
            .parse()
            .map_err(|_| self.error("expected an integer bound"))?;
        self.pos += len;
        Ok(value)
    }

    fn single_param(&mut self) -> Result<TypeExpr, TypeParseError> {
        self.expect_char('[')?;
        let inner = self.expr()?;
        self.expect_char(']')?;
        Ok(inner)
    }
}

// ── Rust type mapping ───────────────────────────────────────────────────────

/// Rust types that can appear as fields of a config record.
pub trait FieldType {
    fn type_expr() -> TypeExpr;
}

macro_rules! impl_field_type {
    ($expr:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl FieldType for $ty {
                fn type_expr() -> TypeExpr {
                    $expr
                }
            }
        )+
    };
}

macro_rules! impl_bounded_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FieldType for $ty {
                fn type_expr() -> TypeExpr {
                    TypeExpr::BoundedInt {
                        min: i128::try_from(<$ty>::MIN).unwrap_or(i128::MIN),
                        max: i128::try_from(<$ty>::MAX).unwrap_or(i128::MAX),
                    }
                }
            }
        )+
    };
}

impl_field_type!(TypeExpr::Int => i64, i128);
impl_bounded_int!(i8, i16, i32, isize, u8, u16, u32, u64, u128, usize);
impl_field_type!(TypeExpr::Float => f32, f64);
impl_field_type!(TypeExpr::Bool => bool);
impl_field_type!(TypeExpr::Text => String, PathBuf);
impl_field_type!(TypeExpr::Any => serde_json::Value);

impl<T: FieldType> FieldType for Option<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::optional(T::type_expr())
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::list(T::type_expr())
    }
}

impl<T: FieldType, S> FieldType for HashMap<String, T, S> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(T::type_expr())
    }
}

impl<T: FieldType> FieldType for BTreeMap<String, T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(T::type_expr())
    }
}
