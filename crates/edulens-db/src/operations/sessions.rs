//! Study session storage.

use crate::codec::{parse_json, parse_ts, ts};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::Utc;
use edulens_core::{SessionProgress, StudySession};
use rusqlite::{params, OptionalExtension};

const SESSION_COLUMNS: &str = "id, artifact_id, name, created_at, last_accessed_at, progress";

impl Database {
    /// Create a study session.
    pub fn create_session(&self, session: &StudySession) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO sessions (id, artifact_id, name, created_at, last_accessed_at, progress)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.id,
                session.artifact_id,
                session.name,
                ts(&session.created_at),
                ts(&session.last_accessed_at),
                serde_json::to_string(&session.progress)?,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                DbError::NotFound(format!("Artifact not found: {}", session.artifact_id))
            }
            _ => DbError::from(e),
        })?;
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, id: &str) -> DbResult<StudySession> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
            params![id],
            row_to_session,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("Session not found: {}", id)))
    }

    /// Sessions of an artifact, most recently used first.
    pub fn list_sessions(&self, artifact_id: &str) -> DbResult<Vec<StudySession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE artifact_id = ?1
             ORDER BY last_accessed_at DESC, rowid DESC",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt.query_map(params![artifact_id], row_to_session)?;
        sessions.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Replace a session's progress and touch `last_accessed_at`.
    pub fn update_session_progress(&self, id: &str, progress: &SessionProgress) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE sessions SET progress = ?2, last_accessed_at = ?3 WHERE id = ?1",
            params![id, serde_json::to_string(progress)?, ts(&Utc::now())],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Session not found: {}", id)));
        }

        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<StudySession> {
    let created_at: String = row.get(3)?;
    let last_accessed_at: String = row.get(4)?;
    let progress: String = row.get(5)?;

    Ok(StudySession {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_ts(3, &created_at)?,
        last_accessed_at: parse_ts(4, &last_accessed_at)?,
        progress: parse_json(5, &progress)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edulens_core::{Artifact, ArtifactKind};

    #[test]
    fn test_session_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let artifact = Artifact::new("a.txt", ArtifactKind::Document, 1);
        db.create_artifact(&artifact).unwrap();

        let older = StudySession::new(artifact.id.clone(), "Week 1");
        let newer = StudySession::new(artifact.id.clone(), "Week 2");
        db.create_session(&older).unwrap();
        db.create_session(&newer).unwrap();

        let listed = db.list_sessions(&artifact.id).unwrap();
        assert_eq!(listed[0].name, "Week 2");

        let progress = SessionProgress {
            correct_answers: 4,
            ..Default::default()
        };
        db.update_session_progress(&older.id, &progress).unwrap();

        let listed = db.list_sessions(&artifact.id).unwrap();
        assert_eq!(listed[0].name, "Week 1");
        assert_eq!(listed[0].progress.correct_answers, 4);
        assert!(listed[0].last_accessed_at >= listed[0].created_at);

        assert!(matches!(
            db.update_session_progress("missing", &progress),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_session_for_missing_artifact() {
        let db = Database::open_in_memory().unwrap();
        let session = StudySession::new("missing".into(), "Orphan");
        assert!(matches!(
            db.create_session(&session),
            Err(DbError::NotFound(_))
        ));
    }
}
