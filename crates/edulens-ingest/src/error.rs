//! Error types for the ingestion pipeline.

use edulens_config::ConfigError;
use edulens_db::DbError;
use edulens_ollama::OllamaError;
use edulens_process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Why an extractor could not turn an input into text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("Stored file is missing: {0}")]
    Missing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Media processing failed: {0}")]
    Media(#[from] ProcessError),

    #[error("Extraction was interrupted: {0}")]
    Interrupted(String),
}

/// Errors surfaced by the pipeline and the study operations.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Bad or unsupported input. Terminal for the artifact.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The language-model or embedding capability errored.
    #[error("Model error: {0}")]
    Model(#[from] OllamaError),

    /// Retrieval was attempted on an artifact with zero chunks.
    #[error("Artifact {0} has no indexed content")]
    NotIndexed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed caller input, rejected before any stage runs.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing queue is full")]
    QueueFull,

    #[error("Processing queue is closed")]
    QueueClosed,
}

impl From<DbError> for IngestError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => IngestError::NotFound(what),
            DbError::Ambiguous(prefix) => {
                IngestError::Validation(format!("ambiguous ID prefix '{}'", prefix))
            }
            other => IngestError::Database(other),
        }
    }
}

impl From<edulens_core::Error> for IngestError {
    fn from(err: edulens_core::Error) -> Self {
        IngestError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: IngestError = DbError::NotFound("Artifact not found: x".to_string()).into();
        assert!(matches!(err, IngestError::NotFound(_)));

        let err: IngestError = DbError::Ambiguous("ab".to_string()).into();
        assert!(matches!(err, IngestError::Validation(_)));

        let err: IngestError =
            DbError::Migration("schema version 9 is newer than this build".to_string()).into();
        assert!(matches!(err, IngestError::Database(_)));
    }
}
