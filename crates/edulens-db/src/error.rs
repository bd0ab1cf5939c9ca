//! Storage failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// No record has the requested id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A shortened id matched more than one record.
    #[error("Ambiguous ID prefix '{0}': multiple records match")]
    Ambiguous(String),

    /// A JSON column could not be written.
    #[error("Could not encode column: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Migration(String),

    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;
