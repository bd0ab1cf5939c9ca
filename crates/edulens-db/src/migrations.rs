//! Database migrations and schema management.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than this build supports ({})",
            current_version, SCHEMA_VERSION
        )));
    }

    let mut version = current_version;
    if version == 0 {
        info!("Creating initial database schema...");
        create_initial_schema(conn)?;
        version = 1;
    } else if version < SCHEMA_VERSION {
        info!(
            "Migrating database from version {} to {}",
            version, SCHEMA_VERSION
        );
    }

    if version < 2 {
        add_claim_lease(conn)?;
    }

    if current_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}

/// v2: claims on `processing` artifacts expire unless renewed.
fn add_claim_lease(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("ALTER TABLE artifacts ADD COLUMN claim_expires_at TEXT;")?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- Uploaded artifacts and their pipeline state
        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            original_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
            content_summary TEXT,
            topics TEXT,
            raw_metadata TEXT NOT NULL DEFAULT '{}',
            stored_path TEXT,
            content_hash TEXT,
            failure_stage TEXT,
            failure_cause TEXT,
            processed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_artifacts_status ON artifacts(status);
        CREATE INDEX IF NOT EXISTS idx_artifacts_uploaded ON artifacts(uploaded_at);
        CREATE INDEX IF NOT EXISTS idx_artifacts_hash ON artifacts(content_hash);

        -- Retrieval units with their embeddings (little-endian f32 BLOB)
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
            sequence_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dimensions INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (artifact_id, sequence_index)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_artifact ON chunks(artifact_id);

        -- Synthesized study topics
        CREATE TABLE IF NOT EXISTS topics (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            key_concepts TEXT NOT NULL DEFAULT '[]',
            difficulty TEXT NOT NULL,
            estimated_minutes INTEGER NOT NULL,
            confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_topics_artifact ON topics(artifact_id);

        -- Practice questions, appended per generation request
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            topic_id TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            answer TEXT NOT NULL,
            question_type TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            options TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_topic ON questions(topic_id);

        -- Study sessions
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_accessed_at TEXT NOT NULL,
            progress TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_artifact ON sessions(artifact_id);

        PRAGMA foreign_keys = ON;
        "#,
    )?;

    Ok(())
}
