use pgdialect_schema::CanonicalKind;
use pgdialect_sql::IdentError;
use thiserror::Error;

use crate::executor::ExecError;

#[derive(Debug, Error)]
pub enum Error {
    /// A statement failed for a reason we don't classify.
    #[error("statement failed: {0}")]
    Statement(#[source] ExecError),

    /// A unique constraint rejected the statement.
    #[error("duplicate key: {0}")]
    DuplicateKey(#[source] ExecError),

    /// A foreign key constraint rejected the statement.
    #[error("invalid foreign key: {0}")]
    InvalidForeignKey(#[source] ExecError),

    #[error("malformed identifier: {0}")]
    Identifier(#[from] IdentError),

    /// Index rows from the catalog didn't fill every key position.
    #[error("index {index} has unfilled key positions {missing:?}")]
    IncompleteIndex { index: String, missing: Vec<usize> },

    /// A catalog row named a column that isn't in the index's key list.
    #[error("index {index} has no free key position for attribute {attnum}")]
    IndexKeyMismatch { index: String, attnum: i64 },

    #[error("catalog row is missing field {0:?}")]
    MissingField(&'static str),

    #[error("malformed catalog value for {field}: {value:?}")]
    MalformedCatalog { field: &'static str, value: String },

    #[error("no SQL type for columns of kind {0}")]
    UnsupportedType(CanonicalKind),

    #[error("invalid configuration: {0}")]
    Config(String),
}

const UNIQUE_VIOLATION: &str = "duplicate key value violates unique constraint";
const FOREIGN_KEY_VIOLATION: &str = "violates foreign key constraint";

impl From<ExecError> for Error {
    fn from(err: ExecError) -> Self {
        if err.message.contains(UNIQUE_VIOLATION) {
            Error::DuplicateKey(err)
        } else if err.message.contains(FOREIGN_KEY_VIOLATION) {
            Error::InvalidForeignKey(err)
        } else {
            Error::Statement(err)
        }
    }
}

impl Error {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey(_))
    }

    pub fn is_invalid_foreign_key(&self) -> bool {
        matches!(self, Error::InvalidForeignKey(_))
    }
}
