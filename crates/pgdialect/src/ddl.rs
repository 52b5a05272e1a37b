//! DDL statement text.
//!
//! The builder only produces SQL strings; it never runs anything. Which
//! statements a change needs can depend on the server version, so the
//! builder carries a [`VersionGate`].

use std::fmt;
use std::sync::LazyLock;

use pgdialect_schema::{CanonicalKind, SqlValue};
use pgdialect_sql::{
    BinaryEscape, Ident, Lit, QuotedIdentifier, quote_ident, quote_qualified_name,
};
use regex::Regex;

use crate::quote::quote;
use crate::types::type_to_sql;
use crate::version::VersionGate;
use crate::Result;

/// Native spelling of a serial primary key column.
pub const PRIMARY_KEY_SQL: &str = "serial primary key";

/// The type of a column being added or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    Kind(CanonicalKind),
    /// `serial primary key`
    PrimaryKey,
    /// A spelling passed through untouched, e.g. `int4range`.
    Raw(String),
}

impl From<CanonicalKind> for SqlType {
    fn from(kind: CanonicalKind) -> Self {
        SqlType::Kind(kind)
    }
}

/// Size modifiers and constraints for a column definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOptions {
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// `Some(SqlValue::Null)` sets the default to NULL; `None` leaves it alone.
    pub default: Option<SqlValue>,
    /// `Some(false)` adds NOT NULL, `Some(true)` drops it.
    pub null: Option<bool>,
}

impl ColumnOptions {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.null = Some(false);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.null = Some(true);
        self
    }
}

/// Steps of the pre-8.0 column type rewrite, which has no
/// `ALTER COLUMN ... TYPE` and copies the data through a temporary column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    NotStarted,
    TempColumnAdded,
    DataCopied,
    OriginalDropped,
    Renamed,
    Committed,
}

impl RewriteState {
    pub fn next(self) -> Option<Self> {
        use RewriteState::*;
        match self {
            NotStarted => Some(TempColumnAdded),
            TempColumnAdded => Some(DataCopied),
            DataCopied => Some(OriginalDropped),
            OriginalDropped => Some(Renamed),
            Renamed => Some(Committed),
            Committed => None,
        }
    }
}

impl fmt::Display for RewriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewriteState::NotStarted => "not started",
            RewriteState::TempColumnAdded => "temp column added",
            RewriteState::DataCopied => "data copied",
            RewriteState::OriginalDropped => "original dropped",
            RewriteState::Renamed => "renamed",
            RewriteState::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// The statements of a legacy column rewrite. Runs inside `BEGIN`; each
/// state names the statement that advances out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRewrite {
    pub add_temp: String,
    pub copy_data: String,
    pub drop_original: String,
    pub rename_temp: String,
}

impl LegacyRewrite {
    pub const BEGIN: &'static str = "BEGIN";
    pub const COMMIT: &'static str = "COMMIT";
    pub const ROLLBACK: &'static str = "ROLLBACK";

    /// The statement that moves the rewrite out of `state`.
    pub fn statement(&self, state: RewriteState) -> Option<&str> {
        match state {
            RewriteState::NotStarted => Some(self.add_temp.as_str()),
            RewriteState::TempColumnAdded => Some(self.copy_data.as_str()),
            RewriteState::DataCopied => Some(self.drop_original.as_str()),
            RewriteState::OriginalDropped => Some(self.rename_temp.as_str()),
            RewriteState::Renamed => Some(Self::COMMIT),
            RewriteState::Committed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTypeChange {
    /// One `ALTER TABLE ... ALTER COLUMN ... TYPE`.
    Direct(String),
    Legacy(LegacyRewrite),
}

/// Everything `change_column` runs: the type change, then default and
/// nullability statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChangePlan {
    pub type_change: ColumnTypeChange,
    pub followups: Vec<String>,
}

static INSERT_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)into\s+([^(]*).*values\s*\(").expect("valid insert regex")
});

/// Target table of an `INSERT INTO <table> ... VALUES (` statement.
///
/// ```
/// use pgdialect::ddl::extract_table_ref_from_insert_sql;
/// assert_eq!(
///     extract_table_ref_from_insert_sql("INSERT INTO posts (title) VALUES ('x')"),
///     Some("posts".to_string())
/// );
/// ```
pub fn extract_table_ref_from_insert_sql(sql: &str) -> Option<String> {
    let table = INSERT_TABLE_RE.captures(sql)?.get(1)?.as_str().trim();
    (!table.is_empty()).then(|| table.to_string())
}

/// `<sql> RETURNING "<pk>"`
pub fn returning_sql(sql: &str, pk: &str) -> String {
    format!("{sql} RETURNING {}", quote_ident(pk))
}

static ORDER_DIRECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(ASC|DESC)\s*").expect("valid order direction regex")
});

/// `SELECT DISTINCT` list for a query that also orders by `orders`.
///
/// PostgreSQL wants every ORDER BY expression in the select list of a
/// DISTINCT query, so each one is appended as `alias_N` with its direction
/// stripped.
///
/// ```
/// use pgdialect::ddl::distinct_sql;
/// assert_eq!(
///     distinct_sql("posts.id", &["posts.created_at DESC"]),
///     "DISTINCT posts.id, posts.created_at AS alias_0"
/// );
/// ```
pub fn distinct_sql(columns: &str, orders: &[impl AsRef<str>]) -> String {
    let order_columns: Vec<String> = orders
        .iter()
        .map(|order| ORDER_DIRECTION_RE.replace_all(order.as_ref(), "").into_owned())
        .filter(|order| !order.trim().is_empty())
        .enumerate()
        .map(|(i, order)| format!("{order} AS alias_{i}"))
        .collect();

    if order_columns.is_empty() {
        format!("DISTINCT {columns}")
    } else {
        format!("DISTINCT {columns}, {}", order_columns.join(", "))
    }
}

/// Builds DDL text for one server.
#[derive(Debug, Clone, Copy)]
pub struct DdlBuilder {
    gate: VersionGate,
    binary_escape: BinaryEscape,
}

impl DdlBuilder {
    pub fn new(gate: VersionGate, binary_escape: BinaryEscape) -> Self {
        Self {
            gate,
            binary_escape,
        }
    }

    pub fn gate(&self) -> VersionGate {
        self.gate
    }

    pub fn column_type_sql(&self, ty: &SqlType, options: &ColumnOptions) -> Result<String> {
        match ty {
            SqlType::Kind(kind) => {
                type_to_sql(*kind, options.limit, options.precision, options.scale)
            }
            SqlType::PrimaryKey => Ok(PRIMARY_KEY_SQL.to_string()),
            SqlType::Raw(raw) => Ok(raw.clone()),
        }
    }

    fn literal(&self, value: &SqlValue) -> String {
        quote(value, None, self.binary_escape).into_string()
    }

    pub fn savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {}", quote_ident(name))
    }

    pub fn rollback_to_savepoint(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {}", quote_ident(name))
    }

    pub fn release_savepoint(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT {}", quote_ident(name))
    }

    /// `ADD COLUMN`, then `SET DEFAULT` and `SET NOT NULL` when requested.
    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        ty: &SqlType,
        options: &ColumnOptions,
    ) -> Result<Vec<String>> {
        let qtable = quote_qualified_name(table)?;
        let mut statements = vec![self.add_column_only(&qtable, column, ty, options)?];
        if let Some(default) = &options.default {
            statements.push(self.change_default(table, column, default)?);
        }
        if options.null == Some(false) {
            statements.extend(self.change_null(table, column, false, options.default.as_ref())?);
        }
        Ok(statements)
    }

    fn add_column_only(
        &self,
        qtable: &QuotedIdentifier,
        column: &str,
        ty: &SqlType,
        options: &ColumnOptions,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {qtable} ADD COLUMN {} {}",
            quote_ident(column),
            self.column_type_sql(ty, options)?
        ))
    }

    /// Plan a column type change.
    ///
    /// Servers that can `ALTER COLUMN ... TYPE` get that one statement;
    /// older ones get a [`LegacyRewrite`] through `<column>_ar_tmp`.
    pub fn change_column(
        &self,
        table: &str,
        column: &str,
        ty: &SqlType,
        options: &ColumnOptions,
    ) -> Result<ColumnChangePlan> {
        let qtable = quote_qualified_name(table)?;
        let qcolumn = quote_ident(column);
        let type_sql = self.column_type_sql(ty, options)?;

        let type_change = if self.gate.supports_alter_column_type() {
            ColumnTypeChange::Direct(format!(
                "ALTER TABLE {qtable} ALTER COLUMN {qcolumn} TYPE {type_sql}"
            ))
        } else {
            let temp = format!("{column}_ar_tmp");
            let qtemp = quote_ident(&temp);
            ColumnTypeChange::Legacy(LegacyRewrite {
                add_temp: self.add_column_only(&qtable, &temp, ty, options)?,
                copy_data: format!(
                    "UPDATE {qtable} SET {qtemp} = CAST({qcolumn} AS {type_sql})"
                ),
                drop_original: self.remove_column(table, column)?,
                rename_temp: self.rename_column(table, &temp, column)?,
            })
        };

        let mut followups = Vec::new();
        if let Some(default) = &options.default {
            followups.push(self.change_default(table, column, default)?);
        }
        if let Some(null) = options.null {
            followups.extend(self.change_null(table, column, null, options.default.as_ref())?);
        }

        Ok(ColumnChangePlan {
            type_change,
            followups,
        })
    }

    pub fn change_default(&self, table: &str, column: &str, default: &SqlValue) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            quote_qualified_name(table)?,
            quote_ident(column),
            self.literal(default)
        ))
    }

    /// Toggle NOT NULL. Setting it with a default first backfills NULLs.
    pub fn change_null(
        &self,
        table: &str,
        column: &str,
        null: bool,
        default: Option<&SqlValue>,
    ) -> Result<Vec<String>> {
        let qtable = quote_qualified_name(table)?;
        let qcolumn = quote_ident(column);
        let mut statements = Vec::new();
        if let Some(default) = default.filter(|d| !null && !d.is_null()) {
            statements.push(format!(
                "UPDATE {qtable} SET {qcolumn}={} WHERE {qcolumn} IS NULL",
                self.literal(default)
            ));
        }
        let action = if null { "DROP" } else { "SET" };
        statements.push(format!("ALTER TABLE {qtable} ALTER {qcolumn} {action} NOT NULL"));
        Ok(statements)
    }

    pub fn rename_table(&self, table: &str, new_name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_qualified_name(table)?,
            quote_ident(new_name)
        ))
    }

    pub fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_qualified_name(table)?,
            quote_ident(column),
            quote_ident(new_name)
        ))
    }

    pub fn remove_column(&self, table: &str, column: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_qualified_name(table)?,
            quote_ident(column)
        ))
    }

    pub fn add_index(
        &self,
        table: &str,
        name: &str,
        columns: &[impl AsRef<str>],
        unique: bool,
    ) -> Result<String> {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| quote_ident(c.as_ref()).into_string())
            .collect();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_ident(name),
            quote_qualified_name(table)?,
            cols.join(", ")
        ))
    }

    pub fn remove_index(&self, name: &str) -> Result<String> {
        Ok(format!("DROP INDEX {}", quote_qualified_name(name)?))
    }

    pub fn disable_triggers(&self, table: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DISABLE TRIGGER ALL",
            quote_qualified_name(table)?
        ))
    }

    pub fn enable_triggers(&self, table: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ENABLE TRIGGER ALL",
            quote_qualified_name(table)?
        ))
    }

    /// `encoding` defaults to `utf8`.
    pub fn create_database(&self, name: &str, encoding: Option<&str>) -> String {
        format!(
            "CREATE DATABASE {} ENCODING={}",
            Ident(name),
            Lit(encoding.unwrap_or("utf8"))
        )
    }

    pub fn drop_database(&self, name: &str) -> String {
        format!("DROP DATABASE IF EXISTS {}", Ident(name))
    }

    pub fn create_schema(&self, schema: &str, owner: &str) -> String {
        format!("CREATE SCHEMA {} AUTHORIZATION {}", Ident(schema), Ident(owner))
    }

    pub fn drop_schema(&self, schema: &str) -> String {
        format!("DROP SCHEMA {}", Ident(schema))
    }

    /// Restart `sequence` just past the table's largest key.
    pub fn reset_pk_sequence(&self, table: &str, pk: &str, sequence: &str) -> Result<String> {
        Ok(format!(
            "SELECT setval({}, COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
            Lit(quote_qualified_name(sequence)?.as_str()),
            quote_ident(pk),
            quote_qualified_name(table)?
        ))
    }

    pub fn last_insert_id(&self, sequence: &str) -> Result<String> {
        Ok(format!(
            "SELECT currval({})",
            Lit(quote_qualified_name(sequence)?.as_str())
        ))
    }
}
