//! EduLens Ingest - the content ingestion and knowledge pipeline.
//!
//! This crate provides:
//! - Extractor adapters turning documents and recordings into plain text
//! - Chunking and the embedding store used for retrieval
//! - Topic and question synthesis on top of a language model
//! - Retrieval-augmented answers
//! - The orchestrator that drives an artifact from `pending` to
//!   `completed` or `failed`, and a bounded worker pool around it
//! - [`StudyService`], the facade exposing every boundary operation

mod answer;
mod chunker;
mod error;
pub mod extract;
mod orchestrator;
mod questions;
mod service;
mod store;
mod synthesis;
#[cfg(test)]
mod test_support;
mod topics;
mod worker;

pub use edulens_config::DEFAULT_TOP_K;

pub use answer::{Answer, Answerer, AnswerSettings};
pub use chunker::{ChunkConfig, Chunker};
pub use error::{ExtractionError, IngestError, IngestResult};
pub use extract::{normalize_text, DefaultExtractor, Extraction, Extractor};
pub use orchestrator::{AdvanceOutcome, Orchestrator, PipelineSettings, Submission, UploadRequest};
pub use questions::QuestionSynthesizer;
pub use service::{Capabilities, StudyService};
pub use store::EmbeddingStore;
pub use topics::TopicSynthesizer;
pub use worker::WorkerPool;
