//! Question storage.

use crate::codec::{parse_enum, parse_json, parse_ts, ts};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use edulens_core::{Question, QuestionDifficulty, QuestionType};
use rusqlite::params;

impl Database {
    /// Append a batch of questions. Earlier batches are left in place.
    pub fn insert_questions(&self, questions: &[Question]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO questions (id, topic_id, text, answer, question_type, difficulty, options, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;

            for question in questions {
                let options = question
                    .options
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    question.id,
                    question.topic_id,
                    question.text,
                    question.answer,
                    question.question_type.as_str(),
                    question.difficulty.as_str(),
                    options,
                    ts(&question.created_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Questions for a topic, newest first.
    pub fn list_questions(&self, topic_id: &str) -> DbResult<Vec<Question>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, topic_id, text, answer, question_type, difficulty, options, created_at
             FROM questions WHERE topic_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let questions = stmt.query_map(params![topic_id], row_to_question)?;
        questions.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn row_to_question(row: &rusqlite::Row) -> rusqlite::Result<Question> {
    let question_type: String = row.get(4)?;
    let difficulty: String = row.get(5)?;
    let options: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(Question {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        text: row.get(2)?,
        answer: row.get(3)?,
        question_type: parse_enum(4, &question_type, QuestionType::from_str)?,
        difficulty: parse_enum(5, &difficulty, QuestionDifficulty::from_str)?,
        options: options.map(|o| parse_json(6, &o)).transpose()?,
        created_at: parse_ts(7, &created_at)?,
    })
}
