//! Artifact CRUD and pipeline status transitions.
//!
//! Every status change is a single guarded `UPDATE ... WHERE status = ...`,
//! so two callers racing on the same artifact cannot both win.

use crate::codec::{parse_enum, parse_json, parse_opt_ts, parse_ts, ts};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::operations::topics::insert_topics;
use chrono::{DateTime, Utc};
use edulens_core::{
    upload_metadata, Artifact, ArtifactId, ArtifactKind, ArtifactStatus, Metadata, Stage, Topic,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;

const ARTIFACT_COLUMNS: &str = "id, original_name, kind, size_bytes, uploaded_at, status, \
     content_summary, topics, raw_metadata, stored_path, content_hash, failure_stage, \
     failure_cause, processed_at";

impl Database {
    /// Register a new artifact.
    pub fn create_artifact(&self, artifact: &Artifact) -> DbResult<()> {
        let conn = self.conn()?;
        let topics = artifact
            .topics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            r#"
            INSERT INTO artifacts (id, original_name, kind, size_bytes, uploaded_at, status,
                content_summary, topics, raw_metadata, stored_path, content_hash,
                failure_stage, failure_cause, processed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                artifact.id,
                artifact.original_name,
                artifact.kind.as_str(),
                artifact.size_bytes as i64,
                ts(&artifact.uploaded_at),
                artifact.status.as_str(),
                artifact.content_summary,
                topics,
                serde_json::to_string(&artifact.raw_metadata)?,
                artifact.stored_path,
                artifact.content_hash,
                artifact.failure_stage.map(|s| s.as_str()),
                artifact.failure_cause,
                artifact.processed_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    /// Get an artifact by ID.
    pub fn get_artifact(&self, id: &str) -> DbResult<Artifact> {
        let conn = self.conn()?;
        fetch_artifact(&conn, id)?
            .ok_or_else(|| DbError::NotFound(format!("Artifact not found: {}", id)))
    }

    /// Get an artifact by ID prefix.
    ///
    /// Useful for CLI where users can type partial IDs.
    pub fn get_artifact_by_prefix(&self, prefix: &str) -> DbResult<Artifact> {
        let conn = self.conn()?;

        if let Some(artifact) = fetch_artifact(&conn, prefix)? {
            return Ok(artifact);
        }

        let pattern = format!("{}%", prefix.replace(['%', '_'], ""));
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artifacts WHERE id LIKE ?1 LIMIT 2",
            ARTIFACT_COLUMNS
        ))?;
        let mut matches = stmt
            .query_map(params![pattern], row_to_artifact)?
            .collect::<Result<Vec<_>, _>>()?;

        match matches.len() {
            0 => Err(DbError::NotFound(format!("Artifact not found: {}", prefix))),
            1 => matches
                .pop()
                .ok_or_else(|| DbError::NotFound(format!("Artifact not found: {}", prefix))),
            _ => Err(DbError::Ambiguous(prefix.to_string())),
        }
    }

    /// List artifacts, newest upload first.
    pub fn list_artifacts(&self, status: Option<ArtifactStatus>) -> DbResult<Vec<Artifact>> {
        let conn = self.conn()?;
        let artifacts = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM artifacts WHERE status = ?1
                     ORDER BY uploaded_at DESC, rowid DESC",
                    ARTIFACT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], row_to_artifact)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM artifacts ORDER BY uploaded_at DESC, rowid DESC",
                    ARTIFACT_COLUMNS
                ))?;
                let rows = stmt.query_map([], row_to_artifact)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(artifacts)
    }

    /// Find an artifact by content hash.
    pub fn find_artifact_by_hash(&self, hash: &str) -> DbResult<Option<Artifact>> {
        let conn = self.conn()?;
        let artifact = conn
            .query_row(
                &format!(
                    "SELECT {} FROM artifacts WHERE content_hash = ?1
                     ORDER BY uploaded_at ASC, rowid ASC LIMIT 1",
                    ARTIFACT_COLUMNS
                ),
                params![hash],
                row_to_artifact,
            )
            .optional()?;
        Ok(artifact)
    }

    /// Delete an artifact and everything it owns.
    ///
    /// Chunks, topics, questions and sessions go with it through
    /// `ON DELETE CASCADE`. Returns the deleted record so the caller can
    /// remove the stored file.
    pub fn delete_artifact(&self, id: &str) -> DbResult<Artifact> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let artifact = fetch_artifact(&tx, id)?
            .ok_or_else(|| DbError::NotFound(format!("Artifact not found: {}", id)))?;
        tx.execute("DELETE FROM artifacts WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(artifact)
    }

    /// Move a `pending` artifact to `processing`, holding the claim for `lease`.
    ///
    /// Returns `false` when the artifact exists but is not pending, which is
    /// how a second concurrent `advance` loses the race. The claimant keeps
    /// the claim alive with [`Database::renew_claim`].
    pub fn claim_artifact(&self, id: &str, lease: Duration) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE artifacts SET status = 'processing', claim_expires_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![id, ts(&lease_end(lease))],
        )?;
        if rows == 0 {
            ensure_exists(&conn, id)?;
        }
        Ok(rows == 1)
    }

    /// Push the claim on a `processing` artifact out to `lease` from now.
    ///
    /// Returns `false` once the artifact has left `processing`.
    pub fn renew_claim(&self, id: &str, lease: Duration) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE artifacts SET claim_expires_at = ?2 WHERE id = ?1 AND status = 'processing'",
            params![id, ts(&lease_end(lease))],
        )?;
        Ok(rows == 1)
    }

    /// Atomically finish a `processing` artifact.
    ///
    /// Writes the summary, topics and merged metadata in one transaction with
    /// the status change. Returns `false` if the artifact is no longer
    /// processing, in which case nothing is written.
    pub fn complete_artifact(
        &self,
        id: &str,
        content_summary: &str,
        topics: &[Topic],
        metadata: &Metadata,
    ) -> DbResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"
            UPDATE artifacts
            SET status = 'completed', content_summary = ?2, topics = ?3, raw_metadata = ?4,
                processed_at = ?5, failure_stage = NULL, failure_cause = NULL,
                claim_expires_at = NULL
            WHERE id = ?1 AND status = 'processing'
            "#,
            params![
                id,
                content_summary,
                serde_json::to_string(topics)?,
                serde_json::to_string(metadata)?,
                ts(&Utc::now()),
            ],
        )?;

        if rows == 0 {
            ensure_exists(&tx, id)?;
            return Ok(false);
        }

        insert_topics(&tx, topics)?;
        tx.commit()?;
        Ok(true)
    }

    /// Mark an in-flight artifact as failed, recording where and why.
    pub fn fail_artifact(&self, id: &str, stage: Stage, cause: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE artifacts
            SET status = 'failed', failure_stage = ?2, failure_cause = ?3, processed_at = ?4,
                claim_expires_at = NULL
            WHERE id = ?1 AND status IN ('pending', 'processing')
            "#,
            params![id, stage.as_str(), cause, ts(&Utc::now())],
        )?;
        if rows == 0 {
            ensure_exists(&conn, id)?;
        }
        Ok(rows == 1)
    }

    /// Return a `completed` or `failed` artifact to `pending`.
    ///
    /// Derived data from the previous run (chunks, topics and their
    /// questions, summary, failure record, derived metadata keys) is
    /// discarded in the same transaction. Sessions are kept.
    pub fn reset_artifact(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(artifact) = fetch_artifact(&tx, id)? else {
            return Err(DbError::NotFound(format!("Artifact not found: {}", id)));
        };
        let metadata = upload_metadata(&artifact.raw_metadata);

        let rows = tx.execute(
            r#"
            UPDATE artifacts
            SET status = 'pending', content_summary = NULL, topics = NULL, raw_metadata = ?2,
                failure_stage = NULL, failure_cause = NULL, processed_at = NULL,
                claim_expires_at = NULL
            WHERE id = ?1 AND status IN ('completed', 'failed')
            "#,
            params![id, serde_json::to_string(&metadata)?],
        )?;
        if rows == 0 {
            return Ok(false);
        }

        tx.execute("DELETE FROM chunks WHERE artifact_id = ?1", params![id])?;
        tx.execute("DELETE FROM topics WHERE artifact_id = ?1", params![id])?;
        tx.commit()?;
        Ok(true)
    }

    /// Fail every `processing` artifact whose claim lapsed before `now`.
    ///
    /// A claim lapses when its holder stops renewing it, e.g. because the
    /// process crashed. Artifacts still being renewed are left alone.
    pub fn fail_lapsed_claims(
        &self,
        cause: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<ArtifactId>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = ts(&now);

        const LAPSED: &str =
            "status = 'processing' AND (claim_expires_at IS NULL OR claim_expires_at <= ?1)";

        let ids = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM artifacts WHERE {} ORDER BY uploaded_at, rowid",
                LAPSED
            ))?;
            let rows = stmt.query_map(params![now], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            &format!(
                r#"
                UPDATE artifacts
                SET status = 'failed', failure_stage = NULL, failure_cause = ?2,
                    processed_at = ?1, claim_expires_at = NULL
                WHERE {}
                "#,
                LAPSED
            ),
            params![now, cause],
        )?;
        tx.commit()?;
        Ok(ids)
    }

    /// IDs of artifacts waiting to be processed, oldest first.
    pub fn pending_artifact_ids(&self) -> DbResult<Vec<ArtifactId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM artifacts WHERE status = 'pending' ORDER BY uploaded_at, rowid",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn lease_end(lease: Duration) -> DateTime<Utc> {
    let millis = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX / 2);
    Utc::now() + chrono::Duration::milliseconds(millis)
}

fn fetch_artifact(conn: &Connection, id: &str) -> DbResult<Option<Artifact>> {
    let artifact = conn
        .query_row(
            &format!("SELECT {} FROM artifacts WHERE id = ?1", ARTIFACT_COLUMNS),
            params![id],
            row_to_artifact,
        )
        .optional()?;
    Ok(artifact)
}

fn ensure_exists(conn: &Connection, id: &str) -> DbResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM artifacts WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(DbError::NotFound(format!("Artifact not found: {}", id)))
    }
}

fn row_to_artifact(row: &rusqlite::Row) -> rusqlite::Result<Artifact> {
    let kind: String = row.get(2)?;
    let size_bytes: i64 = row.get(3)?;
    let uploaded_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    let topics: Option<String> = row.get(7)?;
    let raw_metadata: String = row.get(8)?;
    let failure_stage: Option<String> = row.get(11)?;

    Ok(Artifact {
        id: row.get(0)?,
        original_name: row.get(1)?,
        kind: parse_enum(2, &kind, ArtifactKind::from_str)?,
        size_bytes: size_bytes.max(0) as u64,
        uploaded_at: parse_ts(4, &uploaded_at)?,
        status: parse_enum(5, &status, ArtifactStatus::from_str)?,
        content_summary: row.get(6)?,
        topics: topics.map(|t| parse_json(7, &t)).transpose()?,
        raw_metadata: parse_json(8, &raw_metadata)?,
        stored_path: row.get(9)?,
        content_hash: row.get(10)?,
        failure_stage: failure_stage
            .map(|s| parse_enum(11, &s, Stage::from_str))
            .transpose()?,
        failure_cause: row.get(12)?,
        processed_at: parse_opt_ts(13, row.get(13)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edulens_core::{Chunk, ChunkInput, TopicDraft};

    const LEASE: Duration = Duration::from_secs(60);

    fn document(name: &str) -> Artifact {
        Artifact::new(name, ArtifactKind::Document, 128)
    }

    #[test]
    fn test_artifact_crud() {
        let db = Database::open_in_memory().unwrap();

        let artifact = document("notes.pdf")
            .with_stored_path("/uploads/notes.pdf")
            .with_metadata("format", serde_json::json!("pdf"));
        db.create_artifact(&artifact).unwrap();

        let fetched = db.get_artifact(&artifact.id).unwrap();
        assert_eq!(fetched.original_name, "notes.pdf");
        assert_eq!(fetched.kind, ArtifactKind::Document);
        assert_eq!(fetched.status, ArtifactStatus::Pending);
        assert_eq!(fetched.raw_metadata["format"], "pdf");
        assert!(fetched.topics.is_none());

        let deleted = db.delete_artifact(&artifact.id).unwrap();
        assert_eq!(deleted.stored_path.as_deref(), Some("/uploads/notes.pdf"));
        assert!(matches!(
            db.get_artifact(&artifact.id),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_artifact(&artifact.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = document("a.txt");
        let mut second = document("b.txt");
        second.uploaded_at = first.uploaded_at + chrono::Duration::seconds(1);
        db.create_artifact(&first).unwrap();
        db.create_artifact(&second).unwrap();

        let listed = db.list_artifacts(None).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        assert!(db
            .list_artifacts(Some(ArtifactStatus::Completed))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_claim_only_once() {
        let db = Database::open_in_memory().unwrap();
        let artifact = document("a.txt");
        db.create_artifact(&artifact).unwrap();

        assert!(db.claim_artifact(&artifact.id, LEASE).unwrap());
        assert!(!db.claim_artifact(&artifact.id, LEASE).unwrap());
        assert_eq!(
            db.get_artifact(&artifact.id).unwrap().status,
            ArtifactStatus::Processing
        );
        assert!(matches!(
            db.claim_artifact("missing", LEASE),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_complete_writes_summary_and_topics() {
        let db = Database::open_in_memory().unwrap();
        let artifact = document("a.txt");
        db.create_artifact(&artifact).unwrap();

        let topics = vec![TopicDraft::fallback().into_topic(artifact.id.clone())];
        let mut metadata = Metadata::new();
        metadata.insert("pages".into(), serde_json::json!(2));

        // Not yet processing: nothing is written.
        assert!(!db
            .complete_artifact(&artifact.id, "summary", &topics, &metadata)
            .unwrap());
        assert!(db.list_topics(&artifact.id).unwrap().is_empty());

        db.claim_artifact(&artifact.id, LEASE).unwrap();
        assert!(db
            .complete_artifact(&artifact.id, "summary", &topics, &metadata)
            .unwrap());

        let done = db.get_artifact(&artifact.id).unwrap();
        assert_eq!(done.status, ArtifactStatus::Completed);
        assert_eq!(done.content_summary.as_deref(), Some("summary"));
        assert_eq!(done.topics.as_ref().map(Vec::len), Some(1));
        assert_eq!(done.raw_metadata["pages"], 2);
        assert!(done.processed_at.is_some());
        assert_eq!(db.list_topics(&artifact.id).unwrap().len(), 1);

        // Terminal: a second completion or failure is refused.
        assert!(!db
            .complete_artifact(&artifact.id, "again", &topics, &metadata)
            .unwrap());
        assert!(!db
            .fail_artifact(&artifact.id, Stage::Extraction, "late")
            .unwrap());
        assert_eq!(
            db.get_artifact(&artifact.id).unwrap().status,
            ArtifactStatus::Completed
        );
    }

    #[test]
    fn test_fail_and_reset() {
        let db = Database::open_in_memory().unwrap();
        let artifact = document("a.txt")
            .with_metadata("format", serde_json::json!("txt"))
            .with_content_hash("cafe");
        db.create_artifact(&artifact).unwrap();
        db.claim_artifact(&artifact.id, LEASE).unwrap();

        let chunk = Chunk::new(
            artifact.id.clone(),
            ChunkInput {
                sequence_index: 0,
                text: "text".into(),
            },
            vec![1.0, 0.0],
        );
        db.insert_chunks(&[chunk]).unwrap();
        let mut derived = db.get_artifact(&artifact.id).unwrap().raw_metadata;
        derived.insert("pages".into(), serde_json::json!(3));
        db.conn()
            .unwrap()
            .execute(
                "UPDATE artifacts SET raw_metadata = ?2 WHERE id = ?1",
                params![artifact.id, serde_json::to_string(&derived).unwrap()],
            )
            .unwrap();

        assert!(db
            .fail_artifact(&artifact.id, Stage::TopicSynthesis, "boom")
            .unwrap());
        let failed = db.get_artifact(&artifact.id).unwrap();
        assert_eq!(failed.status, ArtifactStatus::Failed);
        assert_eq!(failed.failure_stage, Some(Stage::TopicSynthesis));
        assert_eq!(failed.failure_cause.as_deref(), Some("boom"));

        assert!(db.reset_artifact(&artifact.id).unwrap());
        let reset = db.get_artifact(&artifact.id).unwrap();
        assert_eq!(reset.status, ArtifactStatus::Pending);
        assert!(reset.failure_cause.is_none());
        assert!(reset.failure_stage.is_none());
        assert_eq!(reset.raw_metadata["format"], "txt");
        assert_eq!(reset.raw_metadata["content_hash"], "cafe");
        assert!(!reset.raw_metadata.contains_key("pages"));
        assert_eq!(db.count_chunks(&artifact.id).unwrap(), 0);

        // Pending cannot be reset again.
        assert!(!db.reset_artifact(&artifact.id).unwrap());
    }

    #[test]
    fn test_fail_lapsed_claims_and_pending_ids() {
        let db = Database::open_in_memory().unwrap();
        let stuck = document("stuck.txt");
        let live = document("live.txt");
        let waiting = document("waiting.txt");
        db.create_artifact(&stuck).unwrap();
        db.create_artifact(&live).unwrap();
        db.create_artifact(&waiting).unwrap();
        db.claim_artifact(&stuck.id, Duration::ZERO).unwrap();
        db.claim_artifact(&live.id, LEASE).unwrap();

        let interrupted = db.fail_lapsed_claims("interrupted", Utc::now()).unwrap();
        assert_eq!(interrupted, vec![stuck.id.clone()]);
        let failed = db.get_artifact(&stuck.id).unwrap();
        assert_eq!(failed.status, ArtifactStatus::Failed);
        assert_eq!(failed.failure_cause.as_deref(), Some("interrupted"));
        assert_eq!(
            db.get_artifact(&live.id).unwrap().status,
            ArtifactStatus::Processing
        );
        assert_eq!(db.pending_artifact_ids().unwrap(), vec![waiting.id]);

        // Once its holder stops renewing, the live claim lapses too.
        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(
            db.fail_lapsed_claims("interrupted", later).unwrap(),
            vec![live.id.clone()]
        );
    }

    #[test]
    fn test_renew_claim_only_while_processing() {
        let db = Database::open_in_memory().unwrap();
        let artifact = document("a.txt");
        db.create_artifact(&artifact).unwrap();

        assert!(!db.renew_claim(&artifact.id, LEASE).unwrap());
        db.claim_artifact(&artifact.id, Duration::ZERO).unwrap();
        assert!(db.renew_claim(&artifact.id, LEASE).unwrap());
        assert!(db
            .fail_lapsed_claims("interrupted", Utc::now())
            .unwrap()
            .is_empty());

        db.fail_artifact(&artifact.id, Stage::Extraction, "boom")
            .unwrap();
        assert!(!db.renew_claim(&artifact.id, LEASE).unwrap());
    }

    #[test]
    fn test_find_by_hash_and_prefix() {
        let db = Database::open_in_memory().unwrap();
        let artifact = document("a.txt").with_content_hash("deadbeef");
        db.create_artifact(&artifact).unwrap();

        let found = db.find_artifact_by_hash("deadbeef").unwrap();
        assert_eq!(found.map(|a| a.id), Some(artifact.id.clone()));
        assert!(db.find_artifact_by_hash("other").unwrap().is_none());

        let by_prefix = db.get_artifact_by_prefix(&artifact.id[..8]).unwrap();
        assert_eq!(by_prefix.id, artifact.id);
        assert!(matches!(
            db.get_artifact_by_prefix("zzzz"),
            Err(DbError::NotFound(_))
        ));
    }
}
