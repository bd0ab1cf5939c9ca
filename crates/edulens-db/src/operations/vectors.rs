//! Vector search over chunk embeddings.

use crate::database::Database;
use crate::error::DbResult;
use crate::operations::chunks::{row_to_chunk, CHUNK_COLUMNS};
use edulens_core::Chunk;
use rusqlite::params;

/// A chunk scored against a query vector.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1].
    pub similarity: f32,
}

/// Cosine of the angle between two vectors.
///
/// Zero when the lengths differ, when either is empty or when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, aa, bb), (x, y)| {
            (dot + x * y, aa + x * x, bb + y * y)
        });
    let norm = (aa * bb).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        dot / norm
    }
}

impl Database {
    /// Top `limit` chunks of one artifact by cosine similarity to `query_vector`.
    ///
    /// Brute force over the artifact's chunks. Results are ordered by
    /// descending similarity, equal scores by ascending sequence index.
    pub fn vector_search(
        &self,
        artifact_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> DbResult<Vec<SimilarityResult>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE artifact_id = ?1 ORDER BY sequence_index",
            CHUNK_COLUMNS
        ))?;

        let mut results = stmt
            .query_map(params![artifact_id], row_to_chunk)?
            .map(|row| {
                row.map(|chunk| SimilarityResult {
                    similarity: cosine_similarity(query_vector, &chunk.embedding),
                    chunk,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
        });
        results.truncate(limit);

        Ok(results)
    }
}
