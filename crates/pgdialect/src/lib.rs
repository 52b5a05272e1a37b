//! PostgreSQL dialect support for a generic relational-mapping layer.
//!
//! This crate translates between what PostgreSQL's catalogs say and a small
//! portable schema model:
//! - Column defaults decoded from their catalog expressions
//! - Type spellings collapsed into [`CanonicalKind`]s
//! - Primary keys, their sequences, and multi-column indexes rebuilt from
//!   flat catalog rows
//! - DDL text, switched on the server version where it has to be
//!
//! It doesn't open connections. Everything runs through a [`QueryExecutor`],
//! implemented for `tokio_postgres::Client` and pooled
//! `deadpool_postgres::Object`s:
//!
//! ```ignore
//! let adapter = PgAdapter::new(TracedExecutor::new(client), AdapterConfig::default());
//! let pk = adapter.pk_and_sequence("post").await?;
//! let sql = adapter.insert_sql("INSERT INTO post (title) VALUES ('hi')", None).await?;
//! ```

mod adapter;
mod config;
pub mod ddl;
pub mod default_value;
mod error;
pub mod executor;
pub mod introspect;
pub mod quote;
pub mod types;
pub mod version;

pub use adapter::PgAdapter;
pub use config::*;
pub use ddl::{ColumnOptions, DdlBuilder, RewriteState, SqlType};
pub use error::Error;
pub use executor::{BoxFuture, ExecError, QueryExecutor, Row, RowSet, TracedExecutor, Value};
pub use types::{GenericTypeResolver, StandardTypeResolver, TypeOverrides, TypeSimplifier};
pub use version::{ServerVersion, VersionGate};

pub use pgdialect_schema::{
    CanonicalKind, ColumnDescriptor, IndexDescriptor, PortableValue, PrimaryKeyInfo, SqlValue,
    TypeInfo,
};
pub use pgdialect_sql::{BinaryEscape, EscapedLiteral, IdentError, QuotedIdentifier};

pub type Result<T> = std::result::Result<T, Error>;
