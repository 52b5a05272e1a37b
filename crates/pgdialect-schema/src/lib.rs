//! Portable schema types for the PostgreSQL dialect adapter.
//!
//! These are plain value objects: the adapter builds them fresh from catalog
//! rows on every introspection call and hands them to the caller, who owns
//! them from then on.

use rust_decimal::Decimal;
use std::fmt;

/// The small logical type system columns are collapsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalKind {
    Integer,
    Float,
    Decimal,
    String,
    Text,
    Binary,
    Boolean,
    Date,
    Time,
    DateTime,
    Xml,
    SearchVector,
    Unknown,
}

impl CanonicalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalKind::Integer => "integer",
            CanonicalKind::Float => "float",
            CanonicalKind::Decimal => "decimal",
            CanonicalKind::String => "string",
            CanonicalKind::Text => "text",
            CanonicalKind::Binary => "binary",
            CanonicalKind::Boolean => "boolean",
            CanonicalKind::Date => "date",
            CanonicalKind::Time => "time",
            CanonicalKind::DateTime => "datetime",
            CanonicalKind::Xml => "xml",
            CanonicalKind::SearchVector => "tsvector",
            CanonicalKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CanonicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical kind plus the size modifiers extracted from a type spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub kind: CanonicalKind,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl TypeInfo {
    /// A kind with no size modifiers.
    pub fn of(kind: CanonicalKind) -> Self {
        Self {
            kind,
            limit: None,
            precision: None,
            scale: None,
        }
    }
}

/// A default value decoded from its catalog literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortableValue {
    /// Character, date/time, binary, network... anything kept as text.
    String(String),
    /// Numeric text, exactly as the catalog spelled it.
    Number(String),
    Bool(bool),
}

impl PortableValue {
    /// The textual form; `None` for booleans.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PortableValue::String(s) | PortableValue::Number(s) => Some(s),
            PortableValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PortableValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&PortableValue> for SqlValue {
    fn from(value: &PortableValue) -> Self {
        match value {
            PortableValue::String(s) => SqlValue::String(s.clone()),
            PortableValue::Number(n) => match n.parse::<i64>() {
                Ok(i) => SqlValue::Int(i),
                Err(_) => n
                    .parse::<Decimal>()
                    .map(SqlValue::Decimal)
                    .unwrap_or_else(|_| SqlValue::String(n.clone())),
            },
            PortableValue::Bool(b) => SqlValue::Bool(*b),
        }
    }
}

/// A runtime value to be quoted into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(chrono::NaiveDateTime),
    Date(chrono::NaiveDate),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Read a decoded value back for a column of `kind`.
    ///
    /// Datetime columns spell the unbounded timestamps as `infinity` and
    /// `-infinity`; those come back as infinite floats, the form quoting
    /// turns back into the same literal.
    pub fn from_portable(value: &PortableValue, kind: CanonicalKind) -> Self {
        match (kind, value) {
            (CanonicalKind::DateTime, PortableValue::String(s)) if s == "infinity" => {
                SqlValue::Float(f64::INFINITY)
            }
            (CanonicalKind::DateTime, PortableValue::String(s)) if s == "-infinity" => {
                SqlValue::Float(f64::NEG_INFINITY)
            }
            _ => SqlValue::from(value),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A table column as read back from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Type as PostgreSQL spells it, e.g. `character varying(50)`
    pub raw_type: String,
    pub kind: CanonicalKind,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Default value, if it has a recognizable literal shape
    pub default: Option<PortableValue>,
    /// Default expression as stored in the catalog
    pub raw_default: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        raw_type: impl Into<String>,
        info: TypeInfo,
        nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            kind: info.kind,
            limit: info.limit,
            precision: info.precision,
            scale: info.scale,
            nullable,
            default: None,
            raw_default: None,
        }
    }

    /// Attach the raw default expression and its decoded form.
    pub fn with_default(
        mut self,
        raw_default: Option<String>,
        default: Option<PortableValue>,
    ) -> Self {
        self.raw_default = raw_default;
        self.default = default;
        self
    }

    pub fn type_info(&self) -> TypeInfo {
        TypeInfo {
            kind: self.kind,
            limit: self.limit,
            precision: self.precision,
            scale: self.scale,
        }
    }

    /// The decoded default as a runtime value of this column's kind.
    pub fn default_value(&self) -> Option<SqlValue> {
        self.default
            .as_ref()
            .map(|value| SqlValue::from_portable(value, self.kind))
    }

    /// Whether the default draws from a sequence (`serial`-style columns).
    pub fn has_sequence_default(&self) -> bool {
        self.raw_default
            .as_deref()
            .is_some_and(|d| d.to_ascii_lowercase().contains("nextval("))
    }
}

/// A secondary index, with columns in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub table: String,
    pub name: String,
    pub unique: bool,
    /// Column names ordered by their position in the index key.
    pub columns: Vec<String>,
}

/// A table's primary-key column and the sequence feeding it.
///
/// Either half may be missing: a natural key has no sequence, and a lookup
/// that fails yields neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKeyInfo {
    pub column: Option<String>,
    pub sequence: Option<String>,
}

impl PrimaryKeyInfo {
    pub fn is_empty(&self) -> bool {
        self.column.is_none() && self.sequence.is_none()
    }
}
