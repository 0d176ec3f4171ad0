//! Error types shared by the store, the ORM layer and configuration.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("schema error: {message}")]
    Schema { message: String },

    #[error("{operation} on `{table}` names no columns")]
    EmptyOperation {
        operation: &'static str,
        table: String,
    },

    #[error("column `{column}` missing from `{table}` record")]
    MissingColumn { table: String, column: String },

    #[error("column `{column}` of `{table}`: expected {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
    },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("connection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// True when SQLite rejected a write because of a NOT NULL, UNIQUE,
    /// PRIMARY KEY or FOREIGN KEY constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        StoreError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        StoreError::Schema {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
