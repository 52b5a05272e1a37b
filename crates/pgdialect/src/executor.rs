//! The query-execution capability the adapter drives.
//!
//! The adapter never talks to the network itself. It hands SQL text to a
//! [`QueryExecutor`] and reads back rows of loosely-typed fields. Catalog
//! queries only need text, booleans and integers, so rows are modeled that
//! way rather than through a driver's binary types.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio_postgres::SimpleQueryMessage;
use tracing::Instrument;

/// Boxed future returned by executor methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Booleans, plus the `t`/`f` text PostgreSQL sends over the text protocol.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Text(s) => match s.as_str() {
                "t" | "true" | "on" => Some(true),
                "f" | "false" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        s.map(Value::from).unwrap_or(Value::Null)
    }
}

/// A result row as field name → value pairs, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Look a field up by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Look a field up by position.
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.fields.get(idx).map(|(_, value)| value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn into_values(self) -> impl Iterator<Item = Value> {
        self.fields.into_iter().map(|(_, value)| value)
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

pub type RowSet = Vec<Row>;

/// A statement the executor couldn't run.
///
/// `message` is the server's own error text when there is one; the adapter
/// classifies constraint violations by matching on it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecError {
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

impl From<tokio_postgres::Error> for ExecError {
    fn from(err: tokio_postgres::Error) -> Self {
        let message = match err.as_db_error() {
            Some(db) => db.message().to_string(),
            None => err.to_string(),
        };
        Self {
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Something that can run SQL text and hand back rows.
///
/// Implemented for `tokio_postgres::Client` and `deadpool_postgres::Object`.
/// Calls against one executor are made sequentially; the executor is the
/// serialization point for its connection.
pub trait QueryExecutor: Send + Sync {
    /// Run a statement, returning whatever rows it produced.
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>>;

    /// Run a query and return the first field of its first row.
    ///
    /// A query that returns no rows yields [`Value::Null`].
    fn scalar<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Value, ExecError>> {
        Box::pin(async move {
            let rows = self.execute(sql).await?;
            Ok(rows
                .into_iter()
                .next()
                .and_then(|row| row.into_values().next())
                .unwrap_or(Value::Null))
        })
    }
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>> {
        (**self).execute(sql)
    }
}

/// Run `sql` over the simple-query protocol and collect text rows.
async fn simple_rows(client: &tokio_postgres::Client, sql: &str) -> Result<RowSet, ExecError> {
    let messages = client.simple_query(sql).await?;
    let mut rows = Vec::new();
    for message in messages {
        if let SimpleQueryMessage::Row(row) = message {
            let fields = row
                .columns()
                .iter()
                .enumerate()
                .map(|(i, column)| (column.name().to_string(), Value::from(row.get(i))))
                .collect();
            rows.push(Row::new(fields));
        }
    }
    Ok(rows)
}

impl QueryExecutor for tokio_postgres::Client {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>> {
        Box::pin(simple_rows(self, sql))
    }
}

impl QueryExecutor for deadpool_postgres::Object {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>> {
        // Deref to the underlying Client to avoid recursion
        use std::ops::Deref;
        let client: &tokio_postgres::Client = self.deref();
        Box::pin(simple_rows(client, sql))
    }
}

/// Wraps an executor and logs every statement via tracing.
///
/// ```ignore
/// let adapter = PgAdapter::new(TracedExecutor::new(client), AdapterConfig::default());
/// ```
pub struct TracedExecutor<E> {
    inner: E,
}

impl<E: QueryExecutor> TracedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    /// Get the wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: QueryExecutor> QueryExecutor for TracedExecutor<E> {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            rows = tracing::field::Empty,
        );
        Box::pin(async move {
            let rows = self.inner.execute(sql).instrument(span.clone()).await?;
            span.record("rows", rows.len());
            Ok(rows)
        })
    }
}
