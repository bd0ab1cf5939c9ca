//! Topic storage.

use crate::codec::{parse_enum, parse_json, parse_ts, ts};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use edulens_core::{Topic, TopicDifficulty};
use rusqlite::{params, Connection, OptionalExtension};

const TOPIC_COLUMNS: &str = "id, artifact_id, name, description, key_concepts, difficulty, \
     estimated_minutes, confidence, created_at";

impl Database {
    /// Topics of an artifact, most confident first.
    pub fn list_topics(&self, artifact_id: &str) -> DbResult<Vec<Topic>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM topics WHERE artifact_id = ?1 ORDER BY confidence DESC, rowid ASC",
            TOPIC_COLUMNS
        ))?;
        let topics = stmt.query_map(params![artifact_id], row_to_topic)?;
        topics.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get a topic by ID.
    pub fn get_topic(&self, id: &str) -> DbResult<Topic> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM topics WHERE id = ?1", TOPIC_COLUMNS),
            params![id],
            row_to_topic,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("Topic not found: {}", id)))
    }

    /// Get a topic by ID prefix.
    pub fn get_topic_by_prefix(&self, prefix: &str) -> DbResult<Topic> {
        let conn = self.conn()?;
        let pattern = format!("{}%", prefix.replace(['%', '_'], ""));
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM topics WHERE id LIKE ?1 LIMIT 2",
            TOPIC_COLUMNS
        ))?;
        let mut matches = stmt
            .query_map(params![pattern], row_to_topic)?
            .collect::<Result<Vec<_>, _>>()?;

        match matches.len() {
            1 => matches
                .pop()
                .ok_or_else(|| DbError::NotFound(format!("Topic not found: {}", prefix))),
            0 => Err(DbError::NotFound(format!("Topic not found: {}", prefix))),
            _ => Err(DbError::Ambiguous(prefix.to_string())),
        }
    }
}

/// Insert topics on an open connection or transaction.
pub(crate) fn insert_topics(conn: &Connection, topics: &[Topic]) -> DbResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO topics (id, artifact_id, name, description, key_concepts, difficulty,
            estimated_minutes, confidence, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;

    for topic in topics {
        stmt.execute(params![
            topic.id,
            topic.artifact_id,
            topic.name,
            topic.description,
            serde_json::to_string(&topic.key_concepts)?,
            topic.difficulty.as_str(),
            topic.estimated_minutes,
            topic.confidence,
            ts(&topic.created_at),
        ])?;
    }

    Ok(())
}

fn row_to_topic(row: &rusqlite::Row) -> rusqlite::Result<Topic> {
    let key_concepts: String = row.get(4)?;
    let difficulty: String = row.get(5)?;
    let created_at: String = row.get(8)?;

    Ok(Topic {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        key_concepts: parse_json(4, &key_concepts)?,
        difficulty: parse_enum(5, &difficulty, TopicDifficulty::from_str)?,
        estimated_minutes: row.get(6)?,
        confidence: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edulens_core::{Artifact, ArtifactKind, Metadata, TopicDraft};

    #[test]
    fn test_topics_by_confidence() {
        let db = Database::open_in_memory().unwrap();
        let artifact = Artifact::new("a.txt", ArtifactKind::Document, 1);
        db.create_artifact(&artifact).unwrap();
        db.claim_artifact(&artifact.id, std::time::Duration::from_secs(60)).unwrap();

        let topics: Vec<Topic> = [("Low", 0.2), ("High", 0.9), ("Mid", 0.5)]
            .into_iter()
            .map(|(name, c)| {
                TopicDraft::new(name)
                    .with_key_concepts(vec!["x".into()])
                    .with_confidence(c)
                    .into_topic(artifact.id.clone())
            })
            .collect();
        db.complete_artifact(&artifact.id, "s", &topics, &Metadata::new())
            .unwrap();

        let listed = db.list_topics(&artifact.id).unwrap();
        let names: Vec<&str> = listed.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
        assert_eq!(listed[0].key_concepts, vec!["x".to_string()]);

        let fetched = db.get_topic(&topics[0].id).unwrap();
        assert_eq!(fetched.name, "Low");
        let by_prefix = db.get_topic_by_prefix(&topics[1].id[..8]).unwrap();
        assert_eq!(by_prefix.name, "High");
        assert!(matches!(db.get_topic("nope"), Err(DbError::NotFound(_))));
    }
}
