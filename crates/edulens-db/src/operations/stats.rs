//! Statistics queries.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use edulens_core::{ArtifactStats, StoreStats};
use rusqlite::params;
use std::collections::HashMap;

impl Database {
    /// Study statistics for one artifact.
    pub fn artifact_stats(&self, artifact_id: &str) -> DbResult<ArtifactStats> {
        let conn = self.conn()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM artifacts WHERE id = ?1)",
            params![artifact_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::NotFound(format!("Artifact not found: {}", artifact_id)));
        }

        let (topic_count, average_topic_confidence): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(confidence) FROM topics WHERE artifact_id = ?1",
            params![artifact_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let question_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions q JOIN topics t ON t.id = q.topic_id
             WHERE t.artifact_id = ?1",
            params![artifact_id],
            |row| row.get(0),
        )?;

        let session_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE artifact_id = ?1",
            params![artifact_id],
            |row| row.get(0),
        )?;

        Ok(ArtifactStats {
            topic_count,
            question_count,
            session_count,
            average_topic_confidence: average_topic_confidence.unwrap_or(0.0),
        })
    }

    /// Get statistics for the whole store.
    pub fn get_stats(&self) -> DbResult<StoreStats> {
        let conn = self.conn()?;

        let count = |sql: &str| -> DbResult<i64> {
            Ok(conn.query_row(sql, [], |row| row.get(0))?)
        };

        let group = |sql: &str| -> DbResult<HashMap<String, i64>> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<HashMap<_, _>, _>>().map_err(DbError::from)
        };

        let total_artifacts = count("SELECT COUNT(*) FROM artifacts")?;
        let artifacts_by_status =
            group("SELECT status, COUNT(*) FROM artifacts GROUP BY status")?;
        let artifacts_by_kind = group("SELECT kind, COUNT(*) FROM artifacts GROUP BY kind")?;
        let total_chunks = count("SELECT COUNT(*) FROM chunks")?;
        let total_topics = count("SELECT COUNT(*) FROM topics")?;
        let total_questions = count("SELECT COUNT(*) FROM questions")?;
        let total_sessions = count("SELECT COUNT(*) FROM sessions")?;

        // Database size (page_count * page_size)
        let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;

        Ok(StoreStats {
            total_artifacts,
            artifacts_by_status,
            artifacts_by_kind,
            total_chunks,
            total_topics,
            total_questions,
            total_sessions,
            database_size_bytes: page_count * page_size,
        })
    }
}
