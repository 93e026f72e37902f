//! Error types for pathfinder-seeder

use thiserror::Error;

use crate::catalog::ItemKind;

/// Failures raised by the persistence collaborator.
///
/// A `Timeout` stops the current test set only. Anything else aborts a
/// reconciliation run at the point of failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out waiting for database: {0}")]
    Timeout(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Unexpected value in column {column}: {detail}")]
    Decode { column: String, detail: String },

    #[error("Insert into {table} affected {affected} rows")]
    UnexpectedRowCount { table: &'static str, affected: usize },
}

impl StoreError {
    /// Whether the failure should stop the whole run rather than one test set
    pub fn aborts_run(&self) -> bool {
        !matches!(self, StoreError::Timeout(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Timeout(e.to_string())
            }
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase
                ) =>
            {
                StoreError::Connection(e.to_string())
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No templates registered for item kind '{0}'")]
    CatalogMiss(ItemKind),

    #[error("Template '{prompt}' has {count} options, expected 2 to 4")]
    OptionCount { prompt: String, count: usize },

    #[error("Template '{prompt}' marks option {letter} correct but only has {count} options")]
    CorrectOutOfRange {
        prompt: String,
        letter: char,
        count: usize,
    },

    #[error("Template '{prompt}' of kind '{kind}' must not carry a correct option")]
    UnexpectedCorrect { prompt: String, kind: ItemKind },

    #[error("Scored template '{0}' has no correct option")]
    MissingCorrect(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}
