//! Failures of the model and embedding backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Model backend did not answer within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Model {model} is not installed. Run 'ollama pull {model}' first.")]
    ModelNotFound { model: String },

    /// Nothing is listening at the configured host.
    #[error("No Ollama server at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// Non-success status; `message` is the server's own error text when it sent one.
    #[error("Model backend answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model backend returned no content")]
    EmptyResponse,

    /// A reply that decoded but does not have the expected shape.
    #[error("Unexpected reply from model backend: {0}")]
    Malformed(String),

    /// Vectors of different lengths from the same embedder.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type OllamaResult<T> = Result<T, OllamaError>;
