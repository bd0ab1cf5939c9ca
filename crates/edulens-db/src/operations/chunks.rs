//! Chunk storage.

use crate::codec::{decode_vector, encode_vector, parse_ts, ts};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use edulens_core::Chunk;
use rusqlite::params;

pub(crate) const CHUNK_COLUMNS: &str =
    "id, artifact_id, sequence_index, text, embedding, dimensions, created_at";

impl Database {
    /// Insert an artifact's chunks in one transaction.
    ///
    /// A duplicate `(artifact_id, sequence_index)` aborts the whole batch.
    pub fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (id, artifact_id, sequence_index, text, embedding, dimensions, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.id,
                    chunk.artifact_id,
                    chunk.sequence_index,
                    chunk.text,
                    encode_vector(&chunk.embedding),
                    chunk.embedding.len() as i64,
                    ts(&chunk.created_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// All chunks of an artifact in document order.
    pub fn chunks_for_artifact(&self, artifact_id: &str) -> DbResult<Vec<Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE artifact_id = ?1 ORDER BY sequence_index",
            CHUNK_COLUMNS
        ))?;
        let chunks = stmt.query_map(params![artifact_id], row_to_chunk)?;
        chunks.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn count_chunks(&self, artifact_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE artifact_id = ?1",
            params![artifact_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Embedding dimension of an artifact's chunks, `None` when it has none.
    ///
    /// `index` rejects mixed dimensions, so one artifact's chunks agree.
    pub fn chunk_dimensions(&self, artifact_id: &str) -> DbResult<Option<usize>> {
        let conn = self.conn()?;
        let dimensions: Option<i64> = conn.query_row(
            "SELECT MAX(dimensions) FROM chunks WHERE artifact_id = ?1",
            params![artifact_id],
            |row| row.get(0),
        )?;
        Ok(dimensions.map(|d| d.max(0) as usize))
    }

    /// Delete all chunks for an artifact.
    pub fn delete_chunks_for_artifact(&self, artifact_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM chunks WHERE artifact_id = ?1",
            params![artifact_id],
        )?;
        Ok(count as i64)
    }
}

pub(crate) fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
    let bytes: Vec<u8> = row.get(4)?;
    let dimensions: i64 = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Chunk {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        sequence_index: row.get(2)?,
        text: row.get(3)?,
        embedding: decode_vector(&bytes, dimensions.max(0) as usize),
        created_at: parse_ts(6, &created_at)?,
    })
}
