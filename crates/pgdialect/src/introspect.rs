//! Catalog queries and the reassembly of their rows.
//!
//! Every query here is built by a pure function and every result is folded
//! back into schema objects by another. [`PgAdapter`](crate::PgAdapter) is
//! the only place that actually runs them.

use pgdialect_schema::{ColumnDescriptor, IndexDescriptor, PrimaryKeyInfo};
use pgdialect_sql::{IdentError, Lit, QualifiedName, QuotedIdentifier, unquote_ident};

use crate::executor::Row;
use crate::types::TypeSimplifier;
use crate::{Error, Result, default_value};

/// `'"schema"."table"'::regclass`
fn regclass(qtable: &QuotedIdentifier) -> String {
    format!("{}::regclass", Lit(qtable.as_str()))
}

/// Columns of a table in declaration order.
pub fn column_definitions_sql(qtable: &QuotedIdentifier) -> String {
    format!(
        "SELECT a.attname AS column_name, \
         format_type(a.atttypid, a.atttypmod) AS column_type, \
         pg_get_expr(d.adbin, d.adrelid) AS column_default, \
         a.attnotnull AS column_not_null \
         FROM pg_attribute a LEFT JOIN pg_attrdef d \
         ON a.attrelid = d.adrelid AND a.attnum = d.adnum \
         WHERE a.attrelid = {} \
         AND a.attnum > 0 AND NOT a.attisdropped \
         ORDER BY a.attnum",
        regclass(qtable)
    )
}

fn required<'r>(row: &'r Row, field: &'static str) -> Result<&'r str> {
    row.get_str(field).ok_or(Error::MissingField(field))
}

/// Build column descriptors from [`column_definitions_sql`] rows.
pub fn columns_from_rows(rows: &[Row], simplifier: &TypeSimplifier) -> Result<Vec<ColumnDescriptor>> {
    rows.iter()
        .map(|row| {
            let name = required(row, "column_name")?;
            let raw_type = required(row, "column_type")?;
            let not_null = match row.get("column_not_null") {
                None => return Err(Error::MissingField("column_not_null")),
                Some(value) => value.as_bool().ok_or_else(|| Error::MalformedCatalog {
                    field: "column_not_null",
                    value: format!("{value:?}"),
                })?,
            };
            let raw_default = row.get_str("column_default");

            let info = simplifier.simplify(raw_type);
            Ok(ColumnDescriptor::new(name, raw_type, info, !not_null)
                .with_default(raw_default.map(str::to_string), default_value::decode(raw_default)))
        })
        .collect()
}

/// Phase 1: a sequence owned by the primary-key column.
///
/// Serial columns own their sequence with an `'a'` dependency, identity
/// columns with `'i'`; serial is preferred when both exist.
pub fn pk_sequence_sql(qtable: &QuotedIdentifier) -> String {
    format!(
        "SELECT attr.attname, seq.relname \
         FROM pg_class seq, pg_attribute attr, pg_depend dep, pg_constraint cons \
         WHERE seq.oid = dep.objid \
         AND seq.relkind = 'S' \
         AND attr.attrelid = dep.refobjid \
         AND attr.attnum = dep.refobjsubid \
         AND attr.attrelid = cons.conrelid \
         AND attr.attnum = cons.conkey[1] \
         AND cons.contype = 'p' \
         AND dep.refobjid = {} \
         ORDER BY dep.deptype",
        regclass(qtable)
    )
}

/// Phase 2: the primary-key column's `nextval(...)` default.
pub fn pk_default_sql(qtable: &QuotedIdentifier) -> String {
    format!(
        "SELECT attr.attname, pg_get_expr(def.adbin, def.adrelid) AS default_expr \
         FROM pg_class t \
         JOIN pg_attribute attr ON (t.oid = attr.attrelid) \
         JOIN pg_attrdef def ON (def.adrelid = attr.attrelid AND def.adnum = attr.attnum) \
         JOIN pg_constraint cons ON (cons.conrelid = def.adrelid AND def.adnum = cons.conkey[1]) \
         WHERE t.oid = {} \
         AND cons.contype = 'p' \
         AND pg_get_expr(def.adbin, def.adrelid) ~* 'nextval'",
        regclass(qtable)
    )
}

/// Phase 3: just the primary-key column.
pub fn pk_column_sql(qtable: &QuotedIdentifier) -> String {
    format!(
        "SELECT a.attname \
         FROM pg_index i \
         JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0] \
         WHERE i.indrelid = {} \
         AND i.indisprimary",
        regclass(qtable)
    )
}

/// Read phase-1 rows.
pub fn pk_from_sequence_rows(rows: &[Row]) -> Option<PrimaryKeyInfo> {
    let row = rows.first()?;
    Some(PrimaryKeyInfo {
        column: row.get_str("attname").map(str::to_string),
        sequence: row.get_str("relname").map(str::to_string),
    })
}

/// Read phase-2 rows, pulling the sequence name out of the default.
pub fn pk_from_default_rows(rows: &[Row]) -> std::result::Result<Option<PrimaryKeyInfo>, IdentError> {
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let sequence = match row.get_str("default_expr") {
        Some(expr) => sequence_from_default(expr)?,
        None => None,
    };
    Ok(Some(PrimaryKeyInfo {
        column: row.get_str("attname").map(str::to_string),
        sequence,
    }))
}

/// Read phase-3 rows.
pub fn pk_from_column_rows(rows: &[Row]) -> Option<PrimaryKeyInfo> {
    let column = rows.first()?.get_str("attname")?;
    Some(PrimaryKeyInfo {
        column: Some(column.to_string()),
        sequence: None,
    })
}

/// The sequence named by a `nextval('...')` default, without its schema.
///
/// ```
/// use pgdialect::introspect::sequence_from_default;
///
/// let seq = sequence_from_default("nextval('app.\"Order_id_seq\"'::regclass)").unwrap();
/// assert_eq!(seq.as_deref(), Some("Order_id_seq"));
/// ```
pub fn sequence_from_default(expr: &str) -> std::result::Result<Option<String>, IdentError> {
    let Some(start) = expr.to_ascii_lowercase().find("nextval(") else {
        return Ok(None);
    };
    let Some(literal) = expr[start + "nextval(".len()..].strip_prefix('\'') else {
        return Ok(None);
    };

    let mut name = String::new();
    let mut chars = literal.chars().peekable();
    loop {
        match chars.next() {
            Some('\'') if chars.next_if_eq(&'\'').is_some() => name.push('\''),
            Some('\'') => break,
            Some(c) => name.push(c),
            None => return Ok(None),
        }
    }

    QualifiedName::parse(&name).map(|q| Some(q.name))
}

/// `<table>_<pk>_seq`, the name PostgreSQL gives a serial column's sequence.
pub fn fallback_sequence_name(table: &str, pk: Option<&str>) -> String {
    format!("{}_{}_seq", table, pk.unwrap_or("id"))
}

/// Split a `search_path` setting into bare schema names.
///
/// ```
/// use pgdialect::introspect::search_path_schemas;
/// assert_eq!(search_path_schemas("\"$user\", public"), vec!["$user", "public"]);
/// ```
pub fn search_path_schemas(path: &str) -> Vec<String> {
    path.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| unquote_ident(s).unwrap_or_else(|| s.to_string()))
        .collect()
}

/// Non-primary, non-expression indexes of a table, one row per key column.
///
/// `limit` caps how many key positions are joined against.
pub fn indexes_sql(qtable: &QuotedIdentifier, schemas: &[String], limit: usize) -> String {
    let namespace_filter = if schemas.is_empty() {
        "nspname = ANY (current_schemas(false))".to_string()
    } else {
        let list: Vec<String> = schemas.iter().map(|s| Lit(s).to_string()).collect();
        format!("nspname IN ({})", list.join(", "))
    };
    format!(
        "SELECT i.relname, d.indisunique, a.attname, a.attnum, d.indkey \
         FROM pg_class t, pg_class i, pg_index d, pg_attribute a, \
         generate_series(0, {last}) AS s(i) \
         WHERE i.relkind = 'i' \
         AND d.indexrelid = i.oid \
         AND d.indisprimary = 'f' \
         AND d.indexprs IS NULL \
         AND t.oid = d.indrelid \
         AND t.oid = {table} \
         AND i.relnamespace IN (SELECT oid FROM pg_namespace WHERE {namespace_filter}) \
         AND a.attrelid = t.oid \
         AND d.indkey[s.i] = a.attnum \
         ORDER BY i.relname",
        last = limit.saturating_sub(1),
        table = regclass(qtable),
    )
}

struct PendingIndex {
    name: String,
    unique: bool,
    keys: Vec<i64>,
    slots: Vec<Option<String>>,
}

impl PendingIndex {
    fn start(row: &Row, name: &str, limit: usize) -> Result<Self> {
        let indkey = required(row, "indkey")?;
        let mut keys = indkey
            .split_whitespace()
            .map(|k| {
                k.parse::<i64>().map_err(|_| Error::MalformedCatalog {
                    field: "indkey",
                    value: indkey.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        keys.truncate(limit.max(1));
        let unique = row.get_bool("indisunique").ok_or(Error::MissingField("indisunique"))?;
        Ok(Self {
            name: name.to_string(),
            unique,
            slots: vec![None; keys.len()],
            keys,
        })
    }

    fn place(&mut self, row: &Row) -> Result<()> {
        let column = required(row, "attname")?;
        let attnum = row.get_i64("attnum").ok_or(Error::MissingField("attnum"))?;
        let slot = self
            .keys
            .iter()
            .zip(&self.slots)
            .position(|(key, slot)| *key == attnum && slot.is_none())
            .ok_or_else(|| Error::IndexKeyMismatch {
                index: self.name.clone(),
                attnum,
            })?;
        self.slots[slot] = Some(column.to_string());
        Ok(())
    }

    fn finish(self, table: &str) -> Result<IndexDescriptor> {
        let missing: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            return Err(Error::IncompleteIndex {
                index: self.name,
                missing,
            });
        }
        Ok(IndexDescriptor {
            table: table.to_string(),
            name: self.name,
            unique: self.unique,
            columns: self.slots.into_iter().flatten().collect(),
        })
    }
}

/// Fold [`indexes_sql`] rows into index descriptors.
///
/// Rows for one index must be contiguous; their order within the run
/// doesn't matter.
pub fn indexes_from_rows(table: &str, rows: &[Row], limit: usize) -> Result<Vec<IndexDescriptor>> {
    let mut indexes = Vec::new();
    let mut current: Option<PendingIndex> = None;

    for row in rows {
        let name = required(row, "relname")?;
        if current.as_ref().is_none_or(|index| index.name != name) {
            if let Some(done) = current.take() {
                indexes.push(done.finish(table)?);
            }
            current = Some(PendingIndex::start(row, name, limit)?);
        }
        if let Some(index) = current.as_mut() {
            index.place(row)?;
        }
    }
    if let Some(done) = current {
        indexes.push(done.finish(table)?);
    }
    Ok(indexes)
}

pub fn tables_sql() -> &'static str {
    "SELECT tablename FROM pg_tables \
     WHERE schemaname = ANY (current_schemas(false)) \
     ORDER BY tablename"
}

pub fn all_schemas_sql() -> &'static str {
    "SELECT nspname FROM pg_namespace"
}

/// First field of every row, as text.
pub fn first_column(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.value(0).and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}
