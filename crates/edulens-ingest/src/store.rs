//! Embedding store: chunk persistence plus nearest-neighbour retrieval.

use crate::error::{IngestError, IngestResult};
use edulens_core::{Chunk, ChunkInput};
use edulens_db::{Database, SimilarityResult};
use edulens_ollama::{Embedder, OllamaError};
use std::sync::Arc;
use tracing::debug;

/// Stores chunk embeddings and answers similarity queries over them.
#[derive(Clone)]
pub struct EmbeddingStore {
    db: Database,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingStore {
    pub fn new(db: Database, embedder: Arc<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    /// Embed and persist the chunks of an artifact.
    ///
    /// Every vector must share one dimension. Returns the number of chunks
    /// stored; an empty input stores nothing.
    pub async fn index(&self, artifact_id: &str, chunks: Vec<ChunkInput>) -> IngestResult<usize> {
        if chunks.is_empty() {
            debug!("No chunks to index for artifact {}", artifact_id);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(OllamaError::Malformed(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            ))
            .into());
        }
        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(OllamaError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            }
            .into());
        }

        let rows: Vec<Chunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(input, embedding)| Chunk::new(artifact_id.to_string(), input, embedding))
            .collect();

        self.db.insert_chunks(&rows)?;
        debug!(
            "Indexed {} chunks ({} dimensions) for artifact {}",
            rows.len(),
            dimensions,
            artifact_id
        );
        Ok(rows.len())
    }

    /// Top `k` chunks of an artifact by similarity to `question`.
    ///
    /// Ordered by non-increasing similarity, equal scores by ascending
    /// sequence index. Fails with [`IngestError::NotIndexed`] when the
    /// artifact has no chunks, and with a dimension mismatch when the
    /// question embeds to a different length than the stored chunks.
    pub async fn query(
        &self,
        artifact_id: &str,
        question: &str,
        k: usize,
    ) -> IngestResult<Vec<SimilarityResult>> {
        if k == 0 {
            return Err(IngestError::Validation("k must be at least 1".to_string()));
        }

        self.db.get_artifact(artifact_id)?;
        let stored = self
            .db
            .chunk_dimensions(artifact_id)?
            .ok_or_else(|| IngestError::NotIndexed(artifact_id.to_string()))?;

        let query_vector = self.embedder.embed(question).await?;
        if query_vector.len() != stored {
            return Err(OllamaError::DimensionMismatch {
                expected: stored,
                actual: query_vector.len(),
            }
            .into());
        }
        let results = self.db.vector_search(artifact_id, &query_vector, k)?;
        debug!(
            "Retrieved {} chunks for artifact {} (k={})",
            results.len(),
            artifact_id,
            k
        );
        Ok(results)
    }
}
