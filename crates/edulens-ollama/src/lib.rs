//! EduLens Ollama - language-model and embedding capabilities.
//!
//! The pipeline only sees the [`LanguageModel`] and [`Embedder`] traits;
//! [`OllamaClient`] is the HTTP backend that implements them.

mod capability;
mod client;
mod error;
pub mod rag;
mod types;

pub use capability::{Embedder, LanguageModel, OllamaEmbedder, OllamaModel, Prompt};
pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use rag::{ContextItem, SourceReference};
pub use types::*;
