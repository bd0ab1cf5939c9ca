//! Extractor adapters.
//!
//! An extractor turns a stored upload into plain text plus whatever
//! metadata it learned along the way. Extraction is blocking work (file
//! decoding, external tools) and is run off the async runtime by the
//! orchestrator.

mod document;
mod media;
mod normalize;

pub use document::DocumentExtractor;
pub use media::MediaExtractor;
pub use normalize::normalize_text;

use crate::error::ExtractionError;
use edulens_config::ProcessingConfig;
use edulens_core::{ArtifactKind, Metadata};
use std::path::Path;

/// Text extracted from an artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub metadata: Metadata,
}

impl Extraction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Uniform extraction capability over every artifact kind.
pub trait Extractor: Send + Sync {
    /// Decode the file at `path` into raw text.
    fn extract(&self, kind: ArtifactKind, path: &Path) -> Result<Extraction, ExtractionError>;

    /// [`Extractor::extract`] followed by whitespace normalization.
    fn extract_text(
        &self,
        kind: ArtifactKind,
        path: &Path,
    ) -> Result<Extraction, ExtractionError> {
        let mut extraction = self.extract(kind, path)?;
        extraction.text = normalize_text(&extraction.text);
        Ok(extraction)
    }
}

/// Dispatches on artifact kind to the document or media extractor.
pub struct DefaultExtractor {
    documents: DocumentExtractor,
    media: MediaExtractor,
}

impl DefaultExtractor {
    pub fn new(documents: DocumentExtractor, media: MediaExtractor) -> Self {
        Self { documents, media }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(
            DocumentExtractor::new(),
            MediaExtractor::new(&config.whisper_model),
        )
    }
}

impl Extractor for DefaultExtractor {
    fn extract(&self, kind: ArtifactKind, path: &Path) -> Result<Extraction, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::Missing(path.to_path_buf()));
        }
        match kind {
            ArtifactKind::Document => self.documents.extract(path),
            ArtifactKind::AudioVideo => self.media.extract(path),
        }
    }
}

/// Lowercased extension of `path`, or an empty string.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
