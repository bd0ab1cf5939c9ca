//! Pipeline orchestrator.
//!
//! Drives one artifact through extraction, chunking and embedding,
//! summarizing and topic synthesis. The persisted status is the only
//! coordination point:
//!
//! ```text
//! pending -> processing -> completed
//!    \           \
//!     `-----------`-----> failed
//! ```
//!
//! A stage error never escapes [`Orchestrator::advance`]; it is recorded on
//! the artifact, which becomes `failed`.

use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{ExtractionError, IngestError, IngestResult};
use crate::extract::{extension_of, Extraction, Extractor};
use crate::service::Capabilities;
use crate::store::EmbeddingStore;
use crate::synthesis::truncate_chars;
use crate::topics::TopicSynthesizer;
use edulens_config::ProcessingConfig;
use edulens_core::{
    new_id, Artifact, ArtifactId, ArtifactKind, ArtifactStatus, Metadata, Stage, Topic,
};
use edulens_db::Database;
use edulens_ollama::{LanguageModel, Prompt};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cause recorded on artifacts whose claim lapsed mid-pipeline.
pub const INTERRUPTED_CAUSE: &str = "interrupted";

/// Characters of extracted text shown to the model when summarizing.
const SUMMARY_INPUT_CHARS: usize = 4000;

/// A file handed over for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    /// Where the uploaded bytes currently are.
    pub path: PathBuf,
    /// Name the user knows the file by.
    pub original_name: String,
    /// Expected kind; inferred from the name when absent.
    pub kind: Option<ArtifactKind>,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            kind: None,
        }
    }

    /// Use the file's own name as the original name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(path, name)
    }

    pub fn with_kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Result of [`Orchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub artifact_id: ArtifactId,
    /// `false` when identical content was already registered.
    pub created: bool,
}

/// What a call to [`Orchestrator::advance`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Completed { chunks: usize, topics: usize },
    Failed { stage: Stage, cause: String },
    /// The artifact was not `pending`, so nothing ran.
    Skipped { status: ArtifactStatus },
}

/// Pipeline knobs outside chunking and topic synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_upload_bytes: u64,
    pub summary_chars: usize,
    pub generate_summary: bool,
    /// How long a claim on a `processing` artifact survives without renewal.
    pub claim_lease: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            summary_chars: config.summary_chars,
            generate_summary: config.generate_summary,
            claim_lease: Duration::from_secs(config.claim_lease_seconds),
        }
    }
}

/// Keeps the claim on a `processing` artifact alive while its stages run.
///
/// Renews every third of the lease; dropping the guard stops renewal, and
/// the claim then lapses on its own if the artifact never reached a
/// terminal status.
struct ClaimLease {
    renewal: JoinHandle<()>,
}

impl ClaimLease {
    fn hold(db: Database, artifact_id: ArtifactId, lease: Duration) -> Self {
        let period = (lease / 3).max(Duration::from_millis(10));
        let renewal = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match db.renew_claim(&artifact_id, lease) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!("Failed to renew claim on {}: {}", artifact_id, e),
                }
            }
        });
        Self { renewal }
    }
}

impl Drop for ClaimLease {
    fn drop(&mut self) {
        self.renewal.abort();
    }
}

/// A stage error tagged with the stage it happened in.
struct StageFailure {
    stage: Stage,
    error: IngestError,
}

trait StageResultExt<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T, E: Into<IngestError>> StageResultExt<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}

/// Everything the stages derived, written in one transaction on completion.
struct PipelineOutput {
    summary: String,
    topics: Vec<Topic>,
    metadata: Metadata,
    chunk_count: usize,
}

/// Drives artifacts through the ingestion pipeline.
pub struct Orchestrator {
    db: Database,
    extractor: Arc<dyn Extractor>,
    model: Arc<dyn LanguageModel>,
    chunker: Chunker,
    store: EmbeddingStore,
    topics: TopicSynthesizer,
    uploads_dir: PathBuf,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        capabilities: &Capabilities,
        config: &ProcessingConfig,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store: EmbeddingStore::new(db.clone(), Arc::clone(&capabilities.embedder)),
            topics: TopicSynthesizer::from_config(Arc::clone(&capabilities.model), config),
            chunker: Chunker::new(ChunkConfig::from_processing_config(config)),
            extractor: Arc::clone(&capabilities.extractor),
            model: Arc::clone(&capabilities.model),
            uploads_dir: uploads_dir.into(),
            settings: PipelineSettings::from_config(config),
            db,
        }
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Register an upload as a `pending` artifact.
    ///
    /// The file is copied into the uploads directory as
    /// `<artifact-id>-<original-name>`. Content already registered (same
    /// SHA-256) returns the existing artifact and copies nothing.
    pub fn submit(&self, request: UploadRequest) -> IngestResult<Submission> {
        let name = request.original_name.trim();
        if name.is_empty() {
            return Err(IngestError::Validation("file name must not be empty".to_string()));
        }
        if Path::new(name).file_name() != Some(OsStr::new(name)) {
            return Err(IngestError::Validation(format!(
                "file name must not contain a path: {}",
                name
            )));
        }

        let ext = extension_of(Path::new(name));
        let inferred = ArtifactKind::from_extension(&ext).ok_or_else(|| {
            IngestError::Validation(format!("unsupported file type '{}'", ext))
        })?;
        let kind = match request.kind {
            Some(expected) if expected != inferred => {
                return Err(IngestError::Validation(format!(
                    "'{}' is not a {} file",
                    name, expected
                )))
            }
            _ => inferred,
        };

        let meta = std::fs::metadata(&request.path).map_err(|_| {
            IngestError::Validation(format!("file not found: {}", request.path.display()))
        })?;
        if !meta.is_file() {
            return Err(IngestError::Validation(format!(
                "not a regular file: {}",
                request.path.display()
            )));
        }
        let size = meta.len();
        if size > self.settings.max_upload_bytes {
            return Err(IngestError::Validation(format!(
                "{} is {} bytes, above the upload limit of {} bytes",
                name, size, self.settings.max_upload_bytes
            )));
        }

        let hash = hash_file(&request.path)?;
        if let Some(existing) = self.db.find_artifact_by_hash(&hash)? {
            info!(
                "{} is already registered as artifact {}",
                name,
                existing.short_id()
            );
            return Ok(Submission {
                artifact_id: existing.id,
                created: false,
            });
        }

        let id = new_id();
        std::fs::create_dir_all(&self.uploads_dir)?;
        let stored = self.uploads_dir.join(format!("{}-{}", id, name));
        std::fs::copy(&request.path, &stored)?;

        let artifact = Artifact::new(name, kind, size)
            .with_id(&id)
            .with_stored_path(stored.to_string_lossy())
            .with_content_hash(&hash)
            .with_metadata("format", json!(ext))
            .with_metadata("content_hash", json!(hash));

        if let Err(e) = self.db.create_artifact(&artifact) {
            if let Err(remove_err) = std::fs::remove_file(&stored) {
                warn!("Failed to remove {}: {}", stored.display(), remove_err);
            }
            return Err(e.into());
        }

        info!(
            "Registered artifact {} ({}, {}, {} bytes)",
            artifact.short_id(),
            name,
            kind,
            size
        );
        Ok(Submission {
            artifact_id: id,
            created: true,
        })
    }

    /// Run the whole pipeline for one artifact.
    ///
    /// Only a `pending` artifact is picked up; the claim is a guarded status
    /// update, so of two concurrent calls exactly one runs and the other
    /// returns [`AdvanceOutcome::Skipped`]. Stage errors end up on the
    /// artifact, not in the returned `Result`, which is an error only when
    /// the artifact is missing or its failure cannot be recorded.
    pub async fn advance(&self, artifact_id: &str) -> IngestResult<AdvanceOutcome> {
        let artifact = self.db.get_artifact(artifact_id)?;
        if !artifact.status.can_advance_to(ArtifactStatus::Processing) {
            debug!(
                "Artifact {} is {}, nothing to do",
                artifact.short_id(),
                artifact.status
            );
            return Ok(AdvanceOutcome::Skipped {
                status: artifact.status,
            });
        }

        if !self.db.claim_artifact(artifact_id, self.settings.claim_lease)? {
            let status = self.db.get_artifact(artifact_id)?.status;
            debug!("Artifact {} was claimed elsewhere", artifact.short_id());
            return Ok(AdvanceOutcome::Skipped { status });
        }
        info!(
            "Processing artifact {} ({})",
            artifact.short_id(),
            artifact.original_name
        );

        let lease = ClaimLease::hold(
            self.db.clone(),
            artifact.id.clone(),
            self.settings.claim_lease,
        );
        let result = match self.run_stages(&artifact).await {
            Ok(output) => self.commit(&artifact, output),
            Err(failure) => Err(failure),
        };
        drop(lease);

        match result {
            Ok(outcome) => Ok(outcome),
            Err(StageFailure { stage, error }) => {
                let cause = error.to_string();
                warn!(
                    "Artifact {} failed during {}: {}",
                    artifact.short_id(),
                    stage,
                    cause
                );
                if !self.db.fail_artifact(artifact_id, stage, &cause)? {
                    let status = self.db.get_artifact(artifact_id)?.status;
                    return Ok(AdvanceOutcome::Skipped { status });
                }
                Ok(AdvanceOutcome::Failed { stage, cause })
            }
        }
    }

    async fn run_stages(&self, artifact: &Artifact) -> Result<PipelineOutput, StageFailure> {
        let extraction = self.extract(artifact).await.at(Stage::Extraction)?;
        let text_chars = extraction.text.chars().count();
        debug!(
            "Extracted {} characters from {}",
            text_chars,
            artifact.short_id()
        );

        let chunks = self.chunker.chunk(&extraction.text);
        let chunk_count = self
            .store
            .index(&artifact.id, chunks)
            .await
            .at(Stage::ChunkEmbed)?;

        let summary = self.summarize(artifact, &extraction.text).await;

        let topics: Vec<Topic> = self
            .topics
            .synthesize(&extraction.text)
            .await
            .into_iter()
            .map(|draft| draft.into_topic(artifact.id.clone()))
            .collect();

        let mut metadata = artifact.upload_metadata();
        metadata.extend(extraction.metadata);
        metadata.insert("text_chars".to_string(), json!(text_chars));
        metadata.insert("chunk_count".to_string(), json!(chunk_count));

        Ok(PipelineOutput {
            summary,
            topics,
            metadata,
            chunk_count,
        })
    }

    fn commit(
        &self,
        artifact: &Artifact,
        output: PipelineOutput,
    ) -> Result<AdvanceOutcome, StageFailure> {
        let completed = self
            .db
            .complete_artifact(&artifact.id, &output.summary, &output.topics, &output.metadata)
            .at(Stage::TopicSynthesis)?;

        if !completed {
            let status = self
                .db
                .get_artifact(&artifact.id)
                .map(|a| a.status)
                .at(Stage::TopicSynthesis)?;
            warn!(
                "Artifact {} left processing before it could complete",
                artifact.short_id()
            );
            return Ok(AdvanceOutcome::Skipped { status });
        }

        info!(
            "Completed artifact {} ({} chunks, {} topics)",
            artifact.short_id(),
            output.chunk_count,
            output.topics.len()
        );
        Ok(AdvanceOutcome::Completed {
            chunks: output.chunk_count,
            topics: output.topics.len(),
        })
    }

    async fn extract(&self, artifact: &Artifact) -> IngestResult<Extraction> {
        let path = artifact
            .stored_path
            .as_ref()
            .map(PathBuf::from)
            .ok_or_else(|| {
                ExtractionError::Unsupported("artifact has no stored file".to_string())
            })?;
        let extractor = Arc::clone(&self.extractor);
        let kind = artifact.kind;

        let extraction = tokio::task::spawn_blocking(move || extractor.extract_text(kind, &path))
            .await
            .map_err(|e| ExtractionError::Interrupted(e.to_string()))??;
        Ok(extraction)
    }

    /// The artifact summary. Never fails.
    async fn summarize(&self, artifact: &Artifact, text: &str) -> String {
        if text.is_empty() {
            return format!("No text could be extracted from {}.", artifact.original_name);
        }

        if self.settings.generate_summary {
            let prompt = Prompt::new(format!(
                "Summarize the following study material in 2-3 concise sentences. Focus on the main topics and key points. Do not include any preamble, just the summary.\n\nContent:\n{}",
                truncate_chars(text, SUMMARY_INPUT_CHARS)
            ))
            .with_temperature(0.3);

            match self.model.complete(prompt).await {
                Ok(summary) if !summary.trim().is_empty() => return summary.trim().to_string(),
                Ok(_) => warn!("Model returned an empty summary, using an excerpt"),
                Err(e) => warn!("Summary generation failed, using an excerpt: {}", e),
            }
        }

        excerpt(text, self.settings.summary_chars)
    }

    /// Return a `completed` or `failed` artifact to `pending`.
    ///
    /// Results of the previous run are discarded. A `pending` artifact is
    /// left alone; a `processing` one is rejected.
    pub fn resubmit(&self, artifact_id: &str) -> IngestResult<()> {
        let artifact = self.db.get_artifact(artifact_id)?;
        match artifact.status {
            ArtifactStatus::Pending => Ok(()),
            ArtifactStatus::Processing => Err(IngestError::Validation(format!(
                "artifact {} is still processing",
                artifact.short_id()
            ))),
            ArtifactStatus::Completed | ArtifactStatus::Failed => {
                if !self.db.reset_artifact(artifact_id)? {
                    return Err(IngestError::Validation(format!(
                        "artifact {} changed state, try again",
                        artifact.short_id()
                    )));
                }
                info!(
                    "Artifact {} reset to pending (was {})",
                    artifact.short_id(),
                    artifact.status
                );
                Ok(())
            }
        }
    }

    /// Startup recovery.
    ///
    /// Artifacts left `processing` whose claim has lapsed, i.e. nobody is
    /// renewing it any more, are failed with cause [`INTERRUPTED_CAUSE`].
    /// Claims still held by a live process, this one or another sharing
    /// the database, are left alone. Returns the ids still `pending`,
    /// oldest first, for the caller to enqueue.
    pub fn recover(&self) -> IngestResult<Vec<ArtifactId>> {
        let interrupted = self.db.fail_lapsed_claims(INTERRUPTED_CAUSE, chrono::Utc::now())?;
        for id in &interrupted {
            warn!("Artifact {} was interrupted and is now failed", id);
        }

        let pending = self.db.pending_artifact_ids()?;
        if !pending.is_empty() {
            info!("{} artifacts waiting to be processed", pending.len());
        }
        Ok(pending)
    }

    /// Delete an artifact, everything derived from it, and its stored file.
    pub fn delete(&self, artifact_id: &str) -> IngestResult<Artifact> {
        let artifact = self.db.delete_artifact(artifact_id)?;

        if let Some(path) = &artifact.stored_path {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed stored file {}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove stored file {}: {}", path, e),
            }
        }

        info!(
            "Deleted artifact {} ({})",
            artifact.short_id(),
            artifact.original_name
        );
        Ok(artifact)
    }
}

/// The first `max_chars` characters of `text`, with `...` when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut.trim_end())
    } else {
        text.to_string()
    }
}

/// SHA-256 of a file, hex encoded.
fn hash_file(path: &Path) -> IngestResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DefaultExtractor;
    use crate::test_support::{HashEmbedder, ScriptedModel};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        db: Database,
        orchestrator: Orchestrator,
        uploads: TempDir,
        sources: TempDir,
    }

    fn fixture(config: ProcessingConfig) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let capabilities = Capabilities::new(
            Arc::new(ScriptedModel::replying([r#"[{"name": "Cells", "confidence": 0.9}]"#])),
            Arc::new(HashEmbedder),
            Arc::new(DefaultExtractor::from_config(&config)),
        );
        let uploads = tempdir().unwrap();
        let orchestrator = Orchestrator::new(db.clone(), &capabilities, &config, uploads.path());
        Fixture {
            db,
            orchestrator,
            uploads,
            sources: tempdir().unwrap(),
        }
    }

    impl Fixture {
        fn source(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.sources.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_submit_copies_file_and_registers_pending() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("biology.txt", b"Cells are small.");

        let submission = f.orchestrator.submit(UploadRequest::from_path(&path)).unwrap();
        assert!(submission.created);

        let artifact = f.db.get_artifact(&submission.artifact_id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Pending);
        assert_eq!(artifact.kind, ArtifactKind::Document);
        assert_eq!(artifact.original_name, "biology.txt");
        assert_eq!(artifact.size_bytes, 16);
        assert_eq!(artifact.raw_metadata["format"], "txt");

        let stored = PathBuf::from(artifact.stored_path.unwrap());
        assert_eq!(stored.parent().unwrap(), f.uploads.path());
        assert_eq!(
            stored.file_name().unwrap().to_string_lossy(),
            format!("{}-biology.txt", artifact.id)
        );
        assert_eq!(std::fs::read(&stored).unwrap(), b"Cells are small.");
    }

    #[test]
    fn test_submit_same_content_is_idempotent() {
        let f = fixture(ProcessingConfig::default());
        let first = f.source("a.txt", b"identical");
        let second = f.source("b.txt", b"identical");

        let one = f.orchestrator.submit(UploadRequest::from_path(&first)).unwrap();
        let two = f.orchestrator.submit(UploadRequest::from_path(&second)).unwrap();

        assert_eq!(one.artifact_id, two.artifact_id);
        assert!(!two.created);
        assert_eq!(f.db.list_artifacts(None).unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(f.uploads.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_submit_validation() {
        let config = ProcessingConfig {
            max_upload_bytes: 4,
            ..Default::default()
        };
        let f = fixture(config);
        let ok = f.source("ok.txt", b"tiny");
        let big = f.source("big.txt", b"too large");
        let exe = f.source("tool.exe", b"MZ");

        let cases = vec![
            UploadRequest::new(&ok, "  "),
            UploadRequest::new(&ok, "../escape.txt"),
            UploadRequest::from_path(&exe),
            UploadRequest::from_path(&ok).with_kind(ArtifactKind::AudioVideo),
            UploadRequest::from_path(&big),
            UploadRequest::new(f.sources.path().join("missing.txt"), "missing.txt"),
        ];

        for request in cases {
            let err = f.orchestrator.submit(request.clone()).unwrap_err();
            assert!(
                matches!(err, IngestError::Validation(_)),
                "{:?} gave {:?}",
                request,
                err
            );
        }
        assert!(f.db.list_artifacts(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_advance_completes_text_document() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("cells.md", b"# Cells\n\nCells   are the unit of life.\n\n\nThey divide.");
        let id = f
            .orchestrator
            .submit(UploadRequest::from_path(&path))
            .unwrap()
            .artifact_id;

        let outcome = f.orchestrator.advance(&id).await.unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Completed {
                chunks: 1,
                topics: 1
            }
        );

        let artifact = f.db.get_artifact(&id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Completed);
        assert_eq!(
            artifact.content_summary.as_deref(),
            Some("Cells\n\nCells are the unit of life.\n\nThey divide.")
        );
        assert_eq!(artifact.topics.unwrap()[0].name, "Cells");
        assert_eq!(artifact.raw_metadata["format"], "markdown");
        assert_eq!(artifact.raw_metadata["chunk_count"], 1);
        assert!(artifact.processed_at.is_some());

        let again = f.orchestrator.advance(&id).await.unwrap();
        assert_eq!(
            again,
            AdvanceOutcome::Skipped {
                status: ArtifactStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_failed_and_resubmit_resets() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("broken.pdf", b"definitely not a pdf");
        let id = f
            .orchestrator
            .submit(UploadRequest::from_path(&path))
            .unwrap()
            .artifact_id;

        let outcome = f.orchestrator.advance(&id).await.unwrap();
        assert!(matches!(
            outcome,
            AdvanceOutcome::Failed {
                stage: Stage::Extraction,
                ..
            }
        ));

        let artifact = f.db.get_artifact(&id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Failed);
        assert_eq!(artifact.failure_stage, Some(Stage::Extraction));
        assert!(artifact.failure_cause.is_some());
        assert!(artifact.content_summary.is_none());

        f.orchestrator.resubmit(&id).unwrap();
        let artifact = f.db.get_artifact(&id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Pending);
        assert!(artifact.failure_cause.is_none());
    }

    #[test]
    fn test_resubmit_rules() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("x.txt", b"x");
        let id = f
            .orchestrator
            .submit(UploadRequest::from_path(&path))
            .unwrap()
            .artifact_id;

        f.orchestrator.resubmit(&id).unwrap();
        assert_eq!(f.db.get_artifact(&id).unwrap().status, ArtifactStatus::Pending);

        f.db.claim_artifact(&id, Duration::from_secs(60)).unwrap();
        let err = f.orchestrator.resubmit(&id).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));

        let err = f.orchestrator.resubmit("missing").unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_recover_fails_interrupted_and_lists_pending() {
        let f = fixture(ProcessingConfig::default());
        let a = f.source("a.txt", b"a");
        let b = f.source("b.txt", b"b");
        let stuck = f.orchestrator.submit(UploadRequest::from_path(&a)).unwrap().artifact_id;
        let waiting = f.orchestrator.submit(UploadRequest::from_path(&b)).unwrap().artifact_id;
        f.db.claim_artifact(&stuck, Duration::ZERO).unwrap();

        let pending = f.orchestrator.recover().unwrap();

        assert_eq!(pending, vec![waiting]);
        let stuck = f.db.get_artifact(&stuck).unwrap();
        assert_eq!(stuck.status, ArtifactStatus::Failed);
        assert_eq!(stuck.failure_cause.as_deref(), Some(INTERRUPTED_CAUSE));
    }

    #[tokio::test]
    async fn test_claim_is_renewed_while_stages_run() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("a.txt", b"a");
        let id = f.orchestrator.submit(UploadRequest::from_path(&path)).unwrap().artifact_id;
        f.db.claim_artifact(&id, Duration::ZERO).unwrap();

        let lease = ClaimLease::hold(f.db.clone(), id.clone(), Duration::from_millis(60));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(f.orchestrator.recover().unwrap().is_empty());
        assert_eq!(f.db.get_artifact(&id).unwrap().status, ArtifactStatus::Processing);

        drop(lease);
        tokio::time::sleep(Duration::from_millis(100)).await;
        f.orchestrator.recover().unwrap();
        assert_eq!(f.db.get_artifact(&id).unwrap().status, ArtifactStatus::Failed);
    }

    #[test]
    fn test_delete_removes_stored_file() {
        let f = fixture(ProcessingConfig::default());
        let path = f.source("gone.txt", b"bye");
        let id = f.orchestrator.submit(UploadRequest::from_path(&path)).unwrap().artifact_id;
        let stored = f.db.get_artifact(&id).unwrap().stored_path.unwrap();

        f.orchestrator.delete(&id).unwrap();

        assert!(!Path::new(&stored).exists());
        assert!(path.exists());
        assert!(matches!(
            f.db.get_artifact(&id).unwrap_err(),
            edulens_db::DbError::NotFound(_)
        ));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdef ghij", 7), "abcdef...");
        assert_eq!(excerpt("日本語のテキスト", 3), "日本語...");
    }
}
