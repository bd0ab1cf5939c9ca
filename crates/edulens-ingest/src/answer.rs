//! Retrieval-augmented answers to free-form questions about an artifact.

use crate::error::{IngestError, IngestResult};
use crate::store::EmbeddingStore;
use crate::synthesis::truncate_chars;
use edulens_config::RetrievalConfig;
use edulens_db::Database;
use edulens_ollama::rag::{build_rag_prompt, build_system_prompt, join_context};
use edulens_ollama::{ContextItem, LanguageModel, Prompt, SourceReference};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrieval and prompt settings for answering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerSettings {
    pub top_k: usize,
    /// Budget for the grounding context, in characters.
    pub context_chars: usize,
    pub temperature: f32,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl AnswerSettings {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            context_chars: config.context_chars,
            temperature: config.temperature,
        }
    }
}

/// A model answer and what it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Retrieved chunks in rank order. Empty when the summary was used.
    pub sources: Vec<SourceReference>,
    /// Whether the artifact summary stood in for retrieved chunks.
    pub used_summary: bool,
}

/// Answers questions grounded in one artifact's content.
#[derive(Clone)]
pub struct Answerer {
    db: Database,
    store: EmbeddingStore,
    model: Arc<dyn LanguageModel>,
    settings: AnswerSettings,
}

impl Answerer {
    pub fn new(
        db: Database,
        store: EmbeddingStore,
        model: Arc<dyn LanguageModel>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            db,
            store,
            model,
            settings,
        }
    }

    /// Answer `question` from the artifact's content.
    ///
    /// Falls back to the content summary when the artifact has no chunks.
    /// Model failures are returned, never replaced by a canned answer.
    pub async fn answer(&self, artifact_id: &str, question: &str) -> IngestResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(IngestError::Validation("question must not be empty".to_string()));
        }

        let artifact = self.db.get_artifact(artifact_id)?;

        let (context, sources, used_summary) = match self
            .store
            .query(artifact_id, question, self.settings.top_k.max(1))
            .await
        {
            Ok(results) => {
                let items: Vec<ContextItem> = results
                    .into_iter()
                    .map(|r| ContextItem {
                        content: r.chunk.text,
                        similarity: r.similarity,
                        sequence_index: r.chunk.sequence_index,
                    })
                    .collect();
                let sources = items.iter().map(SourceReference::from_context).collect();
                (join_context(&items, self.settings.context_chars), sources, false)
            }
            Err(IngestError::NotIndexed(_)) => {
                let summary = artifact
                    .content_summary
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        IngestError::NotFound(format!(
                            "Artifact {} has no extracted content",
                            artifact_id
                        ))
                    })?;
                warn!(
                    "Artifact {} has no chunks, answering from its summary",
                    artifact.short_id()
                );
                (
                    truncate_chars(summary, self.settings.context_chars).to_string(),
                    Vec::new(),
                    true,
                )
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Answering with {} context characters from {} sources",
            context.chars().count(),
            sources.len()
        );

        let prompt = Prompt::new(build_rag_prompt(question, &context))
            .with_system(build_system_prompt())
            .with_temperature(self.settings.temperature);
        let text = self.model.complete(prompt).await?;

        info!("Answered question about artifact {}", artifact.short_id());
        Ok(Answer {
            text: text.trim().to_string(),
            sources,
            used_summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{HashEmbedder, ScriptedModel};
    use edulens_core::{Artifact, ArtifactKind, ChunkInput, Metadata};

    struct Fixture {
        db: Database,
        store: EmbeddingStore,
        model: Arc<ScriptedModel>,
        answerer: Answerer,
    }

    fn fixture(model: ScriptedModel, settings: AnswerSettings) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let store = EmbeddingStore::new(db.clone(), Arc::new(HashEmbedder));
        let model = Arc::new(model);
        let answerer = Answerer::new(db.clone(), store.clone(), model.clone(), settings);
        Fixture {
            db,
            store,
            model,
            answerer,
        }
    }

    fn completed_artifact(db: &Database, summary: &str) -> Artifact {
        let artifact = Artifact::new("notes.txt", ArtifactKind::Document, 10);
        db.create_artifact(&artifact).unwrap();
        db.claim_artifact(&artifact.id, std::time::Duration::from_secs(60)).unwrap();
        db.complete_artifact(&artifact.id, summary, &[], &Metadata::new())
            .unwrap();
        artifact
    }

    #[tokio::test]
    async fn test_answers_from_retrieved_chunks() {
        let f = fixture(
            ScriptedModel::replying(["  Mitochondria make ATP.  "]),
            AnswerSettings::default(),
        );
        let artifact = completed_artifact(&f.db, "summary");
        f.store
            .index(
                &artifact.id,
                vec![
                    ChunkInput {
                        sequence_index: 0,
                        text: "Mitochondria make ATP for the cell.".to_string(),
                    },
                    ChunkInput {
                        sequence_index: 1,
                        text: "Rome was not built in a day.".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        let answer = f
            .answerer
            .answer(&artifact.id, "What do mitochondria make?")
            .await
            .unwrap();

        assert_eq!(answer.text, "Mitochondria make ATP.");
        assert!(!answer.used_summary);
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].sequence_index, 0);

        let prompt = &f.model.prompts()[0];
        assert!(prompt.text.contains("Mitochondria make ATP for the cell."));
        assert!(prompt.text.contains("What do mitochondria make?"));
        assert!(prompt.system.is_some());
    }

    #[tokio::test]
    async fn test_context_is_cut_at_budget() {
        let settings = AnswerSettings {
            top_k: 4,
            context_chars: 20,
            temperature: 0.7,
        };
        let f = fixture(ScriptedModel::replying(["ok"]), settings);
        let artifact = completed_artifact(&f.db, "summary");
        f.store
            .index(
                &artifact.id,
                vec![ChunkInput {
                    sequence_index: 0,
                    text: format!("alpha {}", "z".repeat(100)),
                }],
            )
            .await
            .unwrap();

        f.answerer.answer(&artifact.id, "alpha").await.unwrap();

        let prompt = &f.model.prompts()[0].text;
        assert!(prompt.contains(&format!("alpha {}", "z".repeat(14))));
        assert!(!prompt.contains(&"z".repeat(15)));
    }

    #[tokio::test]
    async fn test_falls_back_to_summary_without_chunks() {
        let f = fixture(ScriptedModel::replying(["From the summary."]), AnswerSettings::default());
        let artifact = completed_artifact(&f.db, "A lecture on photosynthesis.");

        let answer = f.answerer.answer(&artifact.id, "What is it about?").await.unwrap();

        assert!(answer.used_summary);
        assert!(answer.sources.is_empty());
        assert!(f.model.prompts()[0]
            .text
            .contains("A lecture on photosynthesis."));
    }

    #[tokio::test]
    async fn test_missing_content_and_bad_input() {
        let f = fixture(ScriptedModel::replying(["unused"]), AnswerSettings::default());

        let pending = Artifact::new("p.txt", ArtifactKind::Document, 1);
        f.db.create_artifact(&pending).unwrap();
        let err = f.answerer.answer(&pending.id, "why?").await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));

        let err = f.answerer.answer("nope", "why?").await.unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));

        let err = f.answerer.answer(&pending.id, "   ").await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));

        assert!(f.model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_model_error_is_surfaced() {
        let f = fixture(ScriptedModel::failing(), AnswerSettings::default());
        let artifact = completed_artifact(&f.db, "Some summary.");

        let err = f.answerer.answer(&artifact.id, "why?").await.unwrap_err();
        assert!(matches!(err, IngestError::Model(_)));
    }
}
