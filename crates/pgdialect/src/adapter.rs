//! The adapter: one connection's worth of dialect knowledge.

use pgdialect_schema::{ColumnDescriptor, IndexDescriptor, PrimaryKeyInfo, SqlValue};
use pgdialect_sql::{
    DEFAULT_IDENTIFIER_LENGTH, EscapedLiteral, index_name, quote_qualified_name,
    truncate_identifier,
};
use tokio::sync::OnceCell;

use crate::ddl::{
    ColumnOptions, ColumnTypeChange, DdlBuilder, LegacyRewrite, RewriteState, SqlType,
    extract_table_ref_from_insert_sql, returning_sql,
};
use crate::executor::{QueryExecutor, RowSet, Value};
use crate::introspect;
use crate::quote::quote;
use crate::types::TypeSimplifier;
use crate::version::{ServerVersion, VersionGate};
use crate::{AdapterConfig, Result};

/// PostgreSQL dialect support bound to a single executor.
///
/// The server version and identifier length are looked up on first use and
/// cached for the adapter's lifetime.
///
/// ```ignore
/// let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
/// tokio::spawn(connection);
/// let adapter = PgAdapter::new(TracedExecutor::new(client), AdapterConfig::default());
/// for column in adapter.columns("users").await? {
///     println!("{} {}", column.name, column.kind);
/// }
/// ```
pub struct PgAdapter<E> {
    executor: E,
    config: AdapterConfig,
    simplifier: TypeSimplifier,
    version: OnceCell<ServerVersion>,
    identifier_length: OnceCell<usize>,
}

impl<E: QueryExecutor> PgAdapter<E> {
    pub fn new(executor: E, config: AdapterConfig) -> Self {
        let simplifier = TypeSimplifier::new(&config);
        Self {
            executor,
            config,
            simplifier,
            version: OnceCell::new(),
            identifier_length: OnceCell::new(),
        }
    }

    /// Skip the `SELECT version()` round trip.
    pub fn with_server_version(mut self, version: ServerVersion) -> Self {
        self.version = OnceCell::new_with(Some(version));
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn simplifier(&self) -> &TypeSimplifier {
        &self.simplifier
    }

    pub async fn server_version(&self) -> Result<ServerVersion> {
        let version = self
            .version
            .get_or_try_init(|| self.query_server_version())
            .await?;
        Ok(*version)
    }

    async fn query_server_version(&self) -> Result<ServerVersion> {
        let value = self.select_value("SELECT version()").await?;
        let version = ServerVersion::parse(value.as_str().unwrap_or_default());
        tracing::debug!("server version {} ({})", version, version.number());
        Ok(version)
    }

    pub async fn gate(&self) -> Result<VersionGate> {
        Ok(VersionGate::new(self.server_version().await?))
    }

    pub async fn ddl(&self) -> Result<DdlBuilder> {
        Ok(DdlBuilder::new(self.gate().await?, self.config.binary_escape()))
    }

    /// The server's `max_identifier_length`, or 63 where it can't be asked.
    pub async fn table_alias_length(&self) -> Result<usize> {
        let length = self
            .identifier_length
            .get_or_try_init(|| self.query_identifier_length())
            .await?;
        Ok(*length)
    }

    async fn query_identifier_length(&self) -> Result<usize> {
        if !self.gate().await?.supports_identifier_length_query() {
            return Ok(DEFAULT_IDENTIFIER_LENGTH);
        }
        let value = self.select_value("SHOW max_identifier_length").await?;
        match value.as_i64().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => Ok(n),
            None => {
                tracing::debug!(
                    "unreadable max_identifier_length {:?}, using {}",
                    value,
                    DEFAULT_IDENTIFIER_LENGTH
                );
                Ok(DEFAULT_IDENTIFIER_LENGTH)
            }
        }
    }

    /// Whether `standard_conforming_strings` is on. Servers that don't know
    /// the setting report false.
    pub async fn supports_standard_conforming_strings(&self) -> bool {
        match self.executor.scalar("SHOW standard_conforming_strings").await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                tracing::debug!("standard_conforming_strings unavailable: {}", e);
                false
            }
        }
    }

    /// Run one statement, classifying constraint violations.
    pub async fn execute(&self, sql: &str) -> Result<RowSet> {
        Ok(self.executor.execute(sql).await?)
    }

    async fn run(&self, sql: &str) -> Result<()> {
        self.execute(sql).await?;
        Ok(())
    }

    async fn execute_all(&self, statements: &[String]) -> Result<()> {
        for sql in statements {
            self.run(sql).await?;
        }
        Ok(())
    }

    async fn select_value(&self, sql: &str) -> Result<Value> {
        Ok(self.executor.scalar(sql).await?)
    }

    pub fn quote(&self, value: &SqlValue, column: Option<&ColumnDescriptor>) -> EscapedLiteral {
        quote(value, column, self.config.binary_escape())
    }

    // Introspection

    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let qtable = quote_qualified_name(table)?;
        let rows = self
            .execute(&introspect::column_definitions_sql(&qtable))
            .await?;
        introspect::columns_from_rows(&rows, &self.simplifier)
    }

    pub async fn indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>> {
        let qtable = quote_qualified_name(table)?;
        let search_path = match &self.config.schema_search_path {
            Some(path) => path.clone(),
            None => self
                .select_value("SHOW search_path")
                .await?
                .as_str()
                .unwrap_or_default()
                .to_string(),
        };
        let schemas = introspect::search_path_schemas(&search_path);
        // every index has at least its first key position
        let limit = self.config.multi_column_index_limit.max(1);

        let rows = self
            .execute(&introspect::indexes_sql(&qtable, &schemas, limit))
            .await?;
        introspect::indexes_from_rows(table, &rows, limit)
    }

    /// Find a table's primary-key column and the sequence feeding it.
    ///
    /// Tries the sequence the key column owns, then the sequence named in
    /// the key column's `nextval` default, then the key column alone.
    /// Lookup failures are treated as "no primary key".
    pub async fn pk_and_sequence(&self, table: &str) -> Result<PrimaryKeyInfo> {
        let qtable = quote_qualified_name(table)?;

        let rows = match self.executor.execute(&introspect::pk_sequence_sql(&qtable)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!("owned sequence lookup for {} failed: {}", table, e);
                return Ok(PrimaryKeyInfo::default());
            }
        };
        if let Some(info) = introspect::pk_from_sequence_rows(&rows) {
            return Ok(info);
        }

        tracing::debug!("no owned sequence for {}, reading the key default", table);
        let rows = match self.executor.execute(&introspect::pk_default_sql(&qtable)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!("key default lookup for {} failed: {}", table, e);
                return Ok(PrimaryKeyInfo::default());
            }
        };
        match introspect::pk_from_default_rows(&rows) {
            Ok(Some(info)) => return Ok(info),
            Ok(None) => {}
            Err(e) => tracing::debug!("unreadable sequence in key default of {}: {}", table, e),
        }

        tracing::debug!("no sequence default for {}, looking up the key column", table);
        match self.executor.execute(&introspect::pk_column_sql(&qtable)).await {
            Ok(rows) => Ok(introspect::pk_from_column_rows(&rows).unwrap_or_default()),
            Err(e) => {
                tracing::debug!("primary key lookup for {} failed: {}", table, e);
                Ok(PrimaryKeyInfo::default())
            }
        }
    }

    pub async fn primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(self.pk_and_sequence(table).await?.column)
    }

    /// The sequence feeding `table`'s key, or the conventional
    /// `<table>_<pk>_seq` name when none is found.
    pub async fn default_sequence_name(&self, table: &str, pk: Option<&str>) -> Result<String> {
        let info = self.pk_and_sequence(table).await?;
        Ok(info.sequence.unwrap_or_else(|| {
            introspect::fallback_sequence_name(table, pk.or(info.column.as_deref()))
        }))
    }

    /// Restart the key sequence just past the largest key in the table.
    ///
    /// Returns the value `setval` reported, or `None` when there's no key
    /// or no sequence to reset.
    pub async fn reset_pk_sequence(
        &self,
        table: &str,
        pk: Option<&str>,
        sequence: Option<&str>,
    ) -> Result<Option<i64>> {
        let (pk, sequence) = match (pk, sequence) {
            (Some(pk), Some(sequence)) => (Some(pk.to_string()), Some(sequence.to_string())),
            _ => {
                let info = self.pk_and_sequence(table).await?;
                (
                    pk.map(str::to_string).or(info.column),
                    sequence.map(str::to_string).or(info.sequence),
                )
            }
        };

        let Some(pk) = pk else {
            return Ok(None);
        };
        let Some(sequence) = sequence else {
            tracing::warn!(
                "{} has primary key {} but no sequence to reset",
                table,
                pk
            );
            return Ok(None);
        };

        let sql = self.ddl().await?.reset_pk_sequence(table, &pk, &sequence)?;
        Ok(self.select_value(&sql).await?.as_i64())
    }

    pub async fn last_insert_id(&self, sequence: &str) -> Result<Option<i64>> {
        let sql = self.ddl().await?.last_insert_id(sequence)?;
        Ok(self.select_value(&sql).await?.as_i64())
    }

    /// Append `RETURNING <pk>` when the server supports it and a key is
    /// known. Without an explicit `pk` the key of the statement's target
    /// table is looked up.
    pub async fn insert_sql(&self, sql: &str, pk: Option<&str>) -> Result<String> {
        if !self.gate().await?.supports_returning() {
            return Ok(sql.to_string());
        }
        let pk = match pk {
            Some(pk) => Some(pk.to_string()),
            None => match extract_table_ref_from_insert_sql(sql) {
                Some(table) => self.primary_key(&table).await?,
                None => None,
            },
        };
        Ok(match pk {
            Some(pk) => returning_sql(sql, &pk),
            None => sql.to_string(),
        })
    }

    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows = self.execute(introspect::tables_sql()).await?;
        Ok(introspect::first_column(&rows))
    }

    pub async fn all_schemas(&self) -> Result<Vec<String>> {
        let rows = self.execute(introspect::all_schemas_sql()).await?;
        Ok(introspect::first_column(&rows))
    }

    // Schema changes

    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        ty: &SqlType,
        options: &ColumnOptions,
    ) -> Result<()> {
        let statements = self.ddl().await?.add_column(table, column, ty, options)?;
        self.execute_all(&statements).await
    }

    /// Change a column's type, then apply any default and nullability
    /// options.
    pub async fn change_column(
        &self,
        table: &str,
        column: &str,
        ty: &SqlType,
        options: &ColumnOptions,
    ) -> Result<()> {
        let plan = self.ddl().await?.change_column(table, column, ty, options)?;
        match &plan.type_change {
            ColumnTypeChange::Direct(sql) => self.run(sql).await?,
            ColumnTypeChange::Legacy(rewrite) => {
                self.run_legacy_rewrite(table, column, rewrite).await?
            }
        }
        self.execute_all(&plan.followups).await
    }

    async fn run_legacy_rewrite(
        &self,
        table: &str,
        column: &str,
        rewrite: &LegacyRewrite,
    ) -> Result<()> {
        self.run(LegacyRewrite::BEGIN).await?;

        let mut state = RewriteState::NotStarted;
        while let Some(sql) = rewrite.statement(state) {
            if let Err(err) = self.run(sql).await {
                tracing::debug!(
                    "rewrite of {}.{} failed at '{}', rolling back",
                    table,
                    column,
                    state
                );
                if let Err(rollback_err) = self.run(LegacyRewrite::ROLLBACK).await {
                    tracing::warn!(
                        "rollback of {}.{} rewrite failed: {}",
                        table,
                        column,
                        rollback_err
                    );
                }
                return Err(err);
            }
            let Some(next) = state.next() else {
                break;
            };
            state = next;
        }
        Ok(())
    }

    pub async fn change_column_default(
        &self,
        table: &str,
        column: &str,
        default: &SqlValue,
    ) -> Result<()> {
        let sql = self.ddl().await?.change_default(table, column, default)?;
        self.run(&sql).await
    }

    pub async fn change_column_null(
        &self,
        table: &str,
        column: &str,
        null: bool,
        default: Option<&SqlValue>,
    ) -> Result<()> {
        let statements = self.ddl().await?.change_null(table, column, null, default)?;
        self.execute_all(&statements).await
    }

    pub async fn rename_table(&self, table: &str, new_name: &str) -> Result<()> {
        let sql = self.ddl().await?.rename_table(table, new_name)?;
        self.run(&sql).await
    }

    pub async fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<()> {
        let sql = self.ddl().await?.rename_column(table, column, new_name)?;
        self.run(&sql).await
    }

    pub async fn remove_column(&self, table: &str, column: &str) -> Result<()> {
        let sql = self.ddl().await?.remove_column(table, column)?;
        self.run(&sql).await
    }

    /// Create an index, named `index_<table>_on_<columns>` unless `name` is
    /// given. Generated names are shortened to fit the identifier length.
    pub async fn add_index(
        &self,
        table: &str,
        columns: &[&str],
        unique: bool,
        name: Option<&str>,
    ) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => truncate_identifier(
                &index_name(table, columns),
                self.table_alias_length().await?,
            ),
        };
        let sql = self.ddl().await?.add_index(table, &name, columns, unique)?;
        self.run(&sql).await?;
        Ok(name)
    }

    pub async fn remove_index(&self, name: &str) -> Result<()> {
        let sql = self.ddl().await?.remove_index(name)?;
        self.run(&sql).await
    }

    // Transactions

    pub async fn create_savepoint(&self, name: &str) -> Result<()> {
        let sql = self.ddl().await?.savepoint(name);
        self.run(&sql).await
    }

    pub async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        let sql = self.ddl().await?.rollback_to_savepoint(name);
        self.run(&sql).await
    }

    pub async fn release_savepoint(&self, name: &str) -> Result<()> {
        let sql = self.ddl().await?.release_savepoint(name);
        self.run(&sql).await
    }

    /// Turn off triggers (and with them foreign key checks) on every table.
    pub async fn disable_referential_integrity(&self) -> Result<()> {
        self.toggle_triggers(false).await
    }

    pub async fn enable_referential_integrity(&self) -> Result<()> {
        self.toggle_triggers(true).await
    }

    async fn toggle_triggers(&self, enable: bool) -> Result<()> {
        let tables = self.tables().await?;
        if tables.is_empty() {
            return Ok(());
        }
        let ddl = self.ddl().await?;
        let statements = tables
            .iter()
            .map(|table| {
                if enable {
                    ddl.enable_triggers(table)
                } else {
                    ddl.disable_triggers(table)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        self.run(&statements.join(";")).await
    }

    // Databases and schemas

    pub async fn create_database(&self, name: &str, encoding: Option<&str>) -> Result<()> {
        let sql = self.ddl().await?.create_database(name, encoding);
        self.run(&sql).await
    }

    pub async fn drop_database(&self, name: &str) -> Result<()> {
        let sql = self.ddl().await?.drop_database(name);
        self.run(&sql).await
    }

    pub async fn recreate_database(&self, name: &str, encoding: Option<&str>) -> Result<()> {
        self.drop_database(name).await?;
        self.create_database(name, encoding).await
    }

    pub async fn create_schema(&self, schema: &str, owner: &str) -> Result<()> {
        let sql = self.ddl().await?.create_schema(schema, owner);
        self.run(&sql).await
    }

    pub async fn drop_schema(&self, schema: &str) -> Result<()> {
        let sql = self.ddl().await?.drop_schema(schema);
        self.run(&sql).await
    }
}
