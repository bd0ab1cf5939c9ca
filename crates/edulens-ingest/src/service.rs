//! Study service: the boundary operations callers use.
//!
//! Wires one storage handle and one set of capabilities into the
//! orchestrator, the embedding store, the question synthesizer and the
//! answerer, and exposes artifact, topic, question, session, Q&A and
//! statistics operations on top of them.

use crate::answer::{Answer, AnswerSettings, Answerer};
use crate::error::{IngestError, IngestResult};
use crate::extract::{DefaultExtractor, Extractor};
use crate::orchestrator::{AdvanceOutcome, Orchestrator, Submission, UploadRequest};
use crate::questions::QuestionSynthesizer;
use crate::store::EmbeddingStore;
use crate::worker::WorkerPool;
use edulens_config::{AppPaths, Config};
use edulens_core::{
    Artifact, ArtifactId, ArtifactStats, ArtifactStatus, Question, SessionId, SessionProgress,
    StoreStats, StudySession, Topic,
};
use edulens_db::Database;
use edulens_ollama::{Embedder, LanguageModel, OllamaEmbedder, OllamaModel};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The external capabilities the pipeline is built on.
#[derive(Clone)]
pub struct Capabilities {
    pub model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn Extractor>,
}

impl Capabilities {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            model,
            embedder,
            extractor,
        }
    }

    /// Ollama for generation and embeddings, built-in extractors for files.
    pub fn ollama(config: &Config) -> IngestResult<Self> {
        Ok(Self::new(
            Arc::new(OllamaModel::from_config(&config.ollama)?),
            Arc::new(OllamaEmbedder::from_config(&config.ollama)?),
            Arc::new(DefaultExtractor::from_config(&config.processing)),
        ))
    }
}

/// Entry point for every study operation.
#[derive(Clone)]
pub struct StudyService {
    db: Database,
    orchestrator: Arc<Orchestrator>,
    store: EmbeddingStore,
    questions: QuestionSynthesizer,
    answerer: Answerer,
    top_k: usize,
}

impl StudyService {
    pub fn new(
        db: Database,
        capabilities: Capabilities,
        config: &Config,
        uploads_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            &capabilities,
            &config.processing,
            uploads_dir,
        ));
        let store = orchestrator.store().clone();
        let answerer = Answerer::new(
            db.clone(),
            store.clone(),
            Arc::clone(&capabilities.model),
            AnswerSettings::from_config(&config.retrieval),
        );

        Self {
            questions: QuestionSynthesizer::from_config(capabilities.model, &config.processing),
            top_k: config.retrieval.top_k.max(1),
            db,
            orchestrator,
            store,
            answerer,
        }
    }

    /// Open the configured database and connect to Ollama.
    pub fn open(config: &Config, paths: &AppPaths) -> IngestResult<Self> {
        let db = Database::open(config.database_file(paths))?;
        let capabilities = Capabilities::ollama(config)?;
        Ok(Self::new(db, capabilities, config, config.uploads_dir(paths)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Start background workers sized from `[processing]`.
    pub fn start_workers(&self, config: &Config) -> WorkerPool {
        WorkerPool::from_config(Arc::clone(&self.orchestrator), &config.processing)
    }

    // ---- Pipeline ----

    pub fn submit(&self, request: UploadRequest) -> IngestResult<Submission> {
        self.orchestrator.submit(request)
    }

    pub async fn advance(&self, artifact_id: &str) -> IngestResult<AdvanceOutcome> {
        self.orchestrator.advance(artifact_id).await
    }

    pub fn resubmit(&self, artifact_id: &str) -> IngestResult<()> {
        self.orchestrator.resubmit(artifact_id)
    }

    pub fn recover(&self) -> IngestResult<Vec<ArtifactId>> {
        self.orchestrator.recover()
    }

    // ---- Artifacts ----

    pub fn get_artifact(&self, artifact_id: &str) -> IngestResult<Artifact> {
        Ok(self.db.get_artifact(artifact_id)?)
    }

    /// Look up an artifact by full id or unique id prefix.
    pub fn find_artifact(&self, id_or_prefix: &str) -> IngestResult<Artifact> {
        match self.db.get_artifact(id_or_prefix) {
            Ok(artifact) => Ok(artifact),
            Err(edulens_db::DbError::NotFound(_)) => {
                Ok(self.db.get_artifact_by_prefix(id_or_prefix)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Artifacts newest first, optionally only those in one status.
    pub fn list_artifacts(&self, status: Option<ArtifactStatus>) -> IngestResult<Vec<Artifact>> {
        Ok(self.db.list_artifacts(status)?)
    }

    /// Delete an artifact with its chunks, topics, questions, sessions and
    /// stored file.
    pub fn delete_artifact(&self, artifact_id: &str) -> IngestResult<Artifact> {
        self.orchestrator.delete(artifact_id)
    }

    // ---- Topics and questions ----

    /// Topics of an artifact, most confident first.
    pub fn list_topics(&self, artifact_id: &str) -> IngestResult<Vec<Topic>> {
        self.db.get_artifact(artifact_id)?;
        Ok(self.db.list_topics(artifact_id)?)
    }

    /// Look up a topic by full id or unique id prefix.
    pub fn find_topic(&self, id_or_prefix: &str) -> IngestResult<Topic> {
        match self.db.get_topic(id_or_prefix) {
            Ok(topic) => Ok(topic),
            Err(edulens_db::DbError::NotFound(_)) => Ok(self.db.get_topic_by_prefix(id_or_prefix)?),
            Err(e) => Err(e.into()),
        }
    }

    /// Generate and persist a new batch of questions for a topic.
    ///
    /// Each call appends; earlier batches are kept. An empty result is not
    /// an error, the model may simply have had nothing usable to say.
    pub async fn generate_questions(
        &self,
        topic_id: &str,
        topic_name: &str,
        artifact_id: &str,
    ) -> IngestResult<Vec<Question>> {
        let artifact = self.db.get_artifact(artifact_id)?;
        let topic = self.db.get_topic(topic_id)?;
        if topic.artifact_id != artifact.id {
            return Err(IngestError::NotFound(format!(
                "Topic {} does not belong to artifact {}",
                topic_id, artifact_id
            )));
        }

        let name = match topic_name.trim() {
            "" => topic.name.as_str(),
            name => name,
        };
        let supporting_text = self.supporting_text(&artifact, name).await;

        let questions: Vec<Question> = self
            .questions
            .synthesize(name, &supporting_text)
            .await
            .into_iter()
            .map(|draft| draft.into_question(topic.id.clone()))
            .collect();

        if questions.is_empty() {
            warn!("No questions generated for topic '{}'", name);
            return Ok(questions);
        }

        self.db.insert_questions(&questions)?;
        info!("Generated {} questions for topic '{}'", questions.len(), name);
        Ok(questions)
    }

    /// Chunks most related to the topic in document order, else the summary.
    async fn supporting_text(&self, artifact: &Artifact, topic_name: &str) -> String {
        let summary = || artifact.content_summary.clone().unwrap_or_default();

        match self.store.query(&artifact.id, topic_name, self.top_k).await {
            Ok(results) if !results.is_empty() => {
                let mut chunks: Vec<_> = results.into_iter().map(|r| r.chunk).collect();
                chunks.sort_by_key(|c| c.sequence_index);
                debug!(
                    "Grounding questions on {} chunks of {}",
                    chunks.len(),
                    artifact.short_id()
                );
                chunks
                    .into_iter()
                    .map(|c| c.text)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
            Ok(_) | Err(IngestError::NotIndexed(_)) => summary(),
            Err(e) => {
                warn!(
                    "Chunk retrieval failed for {}, using the summary: {}",
                    artifact.short_id(),
                    e
                );
                summary()
            }
        }
    }

    /// Questions of a topic, newest first.
    pub fn list_questions(&self, topic_id: &str) -> IngestResult<Vec<Question>> {
        self.db.get_topic(topic_id)?;
        Ok(self.db.list_questions(topic_id)?)
    }

    // ---- Sessions ----

    pub fn create_session(&self, artifact_id: &str, name: &str) -> IngestResult<SessionId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IngestError::Validation(
                "session name must not be empty".to_string(),
            ));
        }
        self.db.get_artifact(artifact_id)?;

        let session = StudySession::new(artifact_id.to_string(), name);
        self.db.create_session(&session)?;
        info!("Created session '{}' for artifact {}", name, artifact_id);
        Ok(session.id)
    }

    pub fn get_session(&self, session_id: &str) -> IngestResult<StudySession> {
        Ok(self.db.get_session(session_id)?)
    }

    /// Sessions of an artifact, most recently used first.
    pub fn list_sessions(&self, artifact_id: &str) -> IngestResult<Vec<StudySession>> {
        Ok(self.db.list_sessions(artifact_id)?)
    }

    pub fn update_progress(&self, session_id: &str, progress: &SessionProgress) -> IngestResult<()> {
        self.db.update_session_progress(session_id, progress)?;
        debug!("Updated progress of session {}", session_id);
        Ok(())
    }

    /// Replace a session's progress from a caller-supplied JSON object.
    pub fn update_progress_json(
        &self,
        session_id: &str,
        progress: serde_json::Value,
    ) -> IngestResult<()> {
        let progress = SessionProgress::from_json(progress)?;
        self.update_progress(session_id, &progress)
    }

    // ---- Q&A and statistics ----

    pub async fn ask(&self, artifact_id: &str, question: &str) -> IngestResult<Answer> {
        self.answerer.answer(artifact_id, question).await
    }

    pub fn get_stats(&self, artifact_id: &str) -> IngestResult<ArtifactStats> {
        Ok(self.db.artifact_stats(artifact_id)?)
    }

    pub fn store_stats(&self) -> IngestResult<StoreStats> {
        Ok(self.db.get_stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{HashEmbedder, ScriptedModel};
    use edulens_core::{Chunk, ChunkInput, TopicDraft};
    use tempfile::tempdir;

    fn service(model: ScriptedModel) -> (StudyService, Database) {
        let db = Database::open_in_memory().unwrap();
        let config = Config::default();
        let capabilities = Capabilities::new(
            Arc::new(model),
            Arc::new(HashEmbedder),
            Arc::new(DefaultExtractor::from_config(&config.processing)),
        );
        let uploads = tempdir().unwrap();
        (
            StudyService::new(db.clone(), capabilities, &config, uploads.path()),
            db,
        )
    }

    fn completed_artifact(db: &Database, summary: &str) -> (Artifact, Topic) {
        let artifact = Artifact::new("bio.txt", edulens_core::ArtifactKind::Document, 10);
        db.create_artifact(&artifact).unwrap();
        db.claim_artifact(&artifact.id, std::time::Duration::from_secs(60)).unwrap();
        let topic = TopicDraft::new("Mitosis")
            .with_confidence(0.9)
            .into_topic(artifact.id.clone());
        db.complete_artifact(
            &artifact.id,
            summary,
            std::slice::from_ref(&topic),
            &Default::default(),
        )
        .unwrap();
        (artifact, topic)
    }

    #[tokio::test]
    async fn test_generate_questions_grounds_on_chunks() {
        let (service, db) = service(ScriptedModel::replying([
            r#"[{"question": "What is mitosis?", "answer": "Cell division", "type": "short_answer"}]"#,
        ]));
        let (artifact, topic) = completed_artifact(&db, "summary");
        db.insert_chunks(&[
            Chunk::new(
                artifact.id.clone(),
                ChunkInput {
                    sequence_index: 0,
                    text: "Mitosis splits one cell into two.".to_string(),
                },
                vec![1.0; 64],
            ),
        ])
        .unwrap();

        let questions = service
            .generate_questions(&topic.id, "", &artifact.id)
            .await
            .unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].topic_id, topic.id);
        assert_eq!(service.list_questions(&topic.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_questions_model_failure_is_empty() {
        let (service, db) = service(ScriptedModel::failing());
        let (artifact, topic) = completed_artifact(&db, "Mitosis is cell division.");

        let questions = service
            .generate_questions(&topic.id, "Mitosis", &artifact.id)
            .await
            .unwrap();

        assert!(questions.is_empty());
        assert!(service.list_questions(&topic.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_questions_rejects_foreign_topic() {
        let (service, db) = service(ScriptedModel::failing());
        let (_, topic) = completed_artifact(&db, "one");
        let (other, _) = completed_artifact(&db, "two");

        let err = service
            .generate_questions(&topic.id, "Mitosis", &other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_sessions() {
        let (service, db) = service(ScriptedModel::failing());
        let (artifact, topic) = completed_artifact(&db, "summary");

        assert!(matches!(
            service.create_session(&artifact.id, " ").unwrap_err(),
            IngestError::Validation(_)
        ));
        assert!(matches!(
            service.create_session("missing", "Week 1").unwrap_err(),
            IngestError::NotFound(_)
        ));

        let id = service.create_session(&artifact.id, "Week 1").unwrap();
        service
            .update_progress_json(
                &id,
                serde_json::json!({"completed_topics": [topic.id], "correct_answers": 3}),
            )
            .unwrap();

        let session = service.get_session(&id).unwrap();
        assert_eq!(session.progress.correct_answers, 3);
        assert_eq!(session.progress.completed_topics, vec![topic.id]);

        let err = service
            .update_progress("missing", &SessionProgress::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_lookups_by_prefix() {
        let (service, db) = service(ScriptedModel::failing());
        let (artifact, topic) = completed_artifact(&db, "summary");

        assert_eq!(service.find_artifact(&artifact.id[..8]).unwrap().id, artifact.id);
        assert_eq!(service.find_topic(&topic.id[..8]).unwrap().id, topic.id);
        assert!(matches!(
            service.list_topics("missing").unwrap_err(),
            IngestError::NotFound(_)
        ));
    }
}
