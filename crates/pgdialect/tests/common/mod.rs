//! A scripted in-memory executor for driving `PgAdapter` without a server.

#![allow(dead_code)]

use std::sync::Mutex;

use pgdialect::{BoxFuture, ExecError, QueryExecutor, Row, RowSet, Value};

enum Reply {
    Rows(RowSet),
    Fail(String),
}

/// Answers each statement with the reply of the first rule whose needle
/// appears in it. Unmatched statements succeed with no rows. Every
/// statement is recorded.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, Reply)>,
    log: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, rows: RowSet) -> Self {
        self.rules.push((needle.to_string(), Reply::Rows(rows)));
        self
    }

    /// Reply with a single one-field row.
    pub fn on_value(self, needle: &str, value: &str) -> Self {
        self.on(needle, vec![row(&[("value", Some(value))])])
    }

    pub fn fail(mut self, needle: &str, message: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Fail(message.to_string())));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Statements containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.contains(needle))
            .collect()
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<RowSet, ExecError>> {
        self.log.lock().unwrap().push(sql.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, reply)| match reply {
                Reply::Rows(rows) => Ok(rows.clone()),
                Reply::Fail(message) => Err(ExecError::new(message.clone())),
            })
            .unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { reply })
    }
}

/// Build a text-protocol row.
pub fn row(fields: &[(&str, Option<&str>)]) -> Row {
    fields
        .iter()
        .map(|(name, value)| (*name, Value::from(*value)))
        .collect()
}

pub fn version_row(version: &str) -> RowSet {
    vec![row(&[("version", Some(version))])]
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
