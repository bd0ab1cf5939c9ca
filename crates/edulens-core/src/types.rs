//! Core domain types for EduLens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique identifier for artifacts.
pub type ArtifactId = String;

/// Unique identifier for chunks.
pub type ChunkId = String;

/// Unique identifier for topics.
pub type TopicId = String;

/// Unique identifier for questions.
pub type QuestionId = String;

/// Unique identifier for study sessions.
pub type SessionId = String;

/// Opaque key-value metadata attached to an artifact.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kind of uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    AudioVideo,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Document => "document",
            ArtifactKind::AudioVideo => "audio_video",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(ArtifactKind::Document),
            "audio_video" => Some(ArtifactKind::AudioVideo),
            _ => None,
        }
    }

    /// Detect artifact kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" | "txt" | "text" | "md" | "markdown" => Some(ArtifactKind::Document),
            "mp4" | "mov" | "avi" | "wmv" | "flv" | "mkv" | "webm" | "m4v" | "mp3" | "wav"
            | "m4a" | "flac" | "ogg" | "aac" => Some(ArtifactKind::AudioVideo),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing status of an artifact.
///
/// `Pending -> Processing -> Completed`, with `Failed` reachable from either
/// in-flight state. Terminal states only move back to `Pending` through an
/// explicit resubmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Processing => "processing",
            ArtifactStatus::Completed => "completed",
            ArtifactStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ArtifactStatus::Pending),
            "processing" => Some(ArtifactStatus::Processing),
            "completed" => Some(ArtifactStatus::Completed),
            "failed" => Some(ArtifactStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ArtifactStatus::Completed | ArtifactStatus::Failed)
    }

    /// Whether the pipeline may move an artifact from `self` to `next`.
    ///
    /// Resubmission (terminal -> pending) is not a pipeline move and is
    /// checked separately by [`ArtifactStatus::can_resubmit`].
    pub fn can_advance_to(&self, next: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Completed) | (Pending, Failed) | (Processing, Failed)
        )
    }

    pub fn can_resubmit(&self) -> bool {
        self.is_terminal()
    }

    /// Validate a pipeline move, returning an error naming both states.
    pub fn check_advance(&self, next: ArtifactStatus) -> Result<()> {
        if self.can_advance_to(next) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A step of the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    ChunkEmbed,
    Summarize,
    TopicSynthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::ChunkEmbed => "chunk_embed",
            Stage::Summarize => "summarize",
            Stage::TopicSynthesis => "topic_synthesis",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "extraction" => Some(Stage::Extraction),
            "chunk_embed" => Some(Stage::ChunkEmbed),
            "summarize" => Some(Stage::Summarize),
            "topic_synthesis" => Some(Stage::TopicSynthesis),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata keys recorded at upload. Everything else in `raw_metadata` is
/// derived by a pipeline run and discarded when the artifact is resubmitted.
pub const UPLOAD_METADATA_KEYS: [&str; 2] = ["format", "content_hash"];

/// An uploaded study material item tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub original_name: String,
    pub kind: ArtifactKind,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: ArtifactStatus,
    pub content_summary: Option<String>,
    pub topics: Option<Vec<Topic>>,
    pub raw_metadata: Metadata,
    pub stored_path: Option<String>,
    pub content_hash: Option<String>,
    pub failure_stage: Option<Stage>,
    pub failure_cause: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Artifact {
    pub fn new(original_name: impl Into<String>, kind: ArtifactKind, size_bytes: u64) -> Self {
        Self {
            id: new_id(),
            original_name: original_name.into(),
            kind,
            size_bytes,
            uploaded_at: Utc::now(),
            status: ArtifactStatus::Pending,
            content_summary: None,
            topics: None,
            raw_metadata: Metadata::new(),
            stored_path: None,
            content_hash: None,
            failure_stage: None,
            failure_cause: None,
            processed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_stored_path(mut self, path: impl Into<String>) -> Self {
        self.stored_path = Some(path.into());
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.raw_metadata.insert(key.into(), value);
        self
    }

    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }

    /// The part of `raw_metadata` written at upload.
    pub fn upload_metadata(&self) -> Metadata {
        upload_metadata(&self.raw_metadata)
    }
}

/// Keep only the [`UPLOAD_METADATA_KEYS`] of `metadata`.
pub fn upload_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| UPLOAD_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Chunker output before it is embedded and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInput {
    pub sequence_index: u32,
    pub text: String,
}

/// A retrieval unit of an artifact's extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub artifact_id: ArtifactId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub sequence_index: u32,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(artifact_id: ArtifactId, input: ChunkInput, embedding: Vec<f32>) -> Self {
        Self {
            id: new_id(),
            artifact_id,
            text: input.text,
            embedding,
            sequence_index: input.sequence_index,
            created_at: Utc::now(),
        }
    }
}

/// Difficulty of a study topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TopicDifficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl TopicDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicDifficulty::Beginner => "beginner",
            TopicDifficulty::Intermediate => "intermediate",
            TopicDifficulty::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(TopicDifficulty::Beginner),
            "intermediate" => Some(TopicDifficulty::Intermediate),
            "advanced" => Some(TopicDifficulty::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for TopicDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A synthesized study subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub artifact_id: ArtifactId,
    pub name: String,
    pub description: String,
    pub key_concepts: Vec<String>,
    pub difficulty: TopicDifficulty,
    pub estimated_minutes: u32,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// A topic as produced by synthesis, before it belongs to an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDraft {
    pub name: String,
    pub description: String,
    pub key_concepts: Vec<String>,
    pub difficulty: TopicDifficulty,
    pub estimated_minutes: u32,
    pub confidence: f64,
}

impl TopicDraft {
    pub const FALLBACK_NAME: &'static str = "General Content";
    pub const FALLBACK_CONFIDENCE: f64 = 0.8;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            key_concepts: Vec::new(),
            difficulty: TopicDifficulty::Intermediate,
            estimated_minutes: 30,
            confidence: 0.5,
        }
    }

    /// The single topic used when synthesis fails.
    pub fn fallback() -> Self {
        Self {
            name: Self::FALLBACK_NAME.to_string(),
            description: "Main content from the uploaded material".to_string(),
            key_concepts: vec!["content analysis".to_string(), "study material".to_string()],
            difficulty: TopicDifficulty::Intermediate,
            estimated_minutes: 60,
            confidence: Self::FALLBACK_CONFIDENCE,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_key_concepts(mut self, concepts: Vec<String>) -> Self {
        self.key_concepts = concepts;
        self
    }

    pub fn with_difficulty(mut self, difficulty: TopicDifficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    /// Set confidence, clamped into [0, 1]. NaN becomes 0.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    pub fn into_topic(self, artifact_id: ArtifactId) -> Topic {
        Topic {
            id: new_id(),
            artifact_id,
            name: self.name,
            description: self.description,
            key_concepts: self.key_concepts,
            difficulty: self.difficulty,
            estimated_minutes: self.estimated_minutes,
            confidence: self.confidence,
            created_at: Utc::now(),
        }
    }
}

/// Format of a practice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    #[default]
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "short_answer" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Difficulty of a practice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl QuestionDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionDifficulty::Easy => "easy",
            QuestionDifficulty::Medium => "medium",
            QuestionDifficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(QuestionDifficulty::Easy),
            "medium" => Some(QuestionDifficulty::Medium),
            "hard" => Some(QuestionDifficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A practice item tied to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub topic_id: TopicId,
    pub text: String,
    pub answer: String,
    pub question_type: QuestionType,
    pub difficulty: QuestionDifficulty,
    pub options: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// A question as produced by synthesis, before it belongs to a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub text: String,
    pub answer: String,
    pub question_type: QuestionType,
    pub difficulty: QuestionDifficulty,
    pub options: Vec<String>,
}

impl QuestionDraft {
    pub fn new(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer: answer.into(),
            question_type: QuestionType::ShortAnswer,
            difficulty: QuestionDifficulty::Medium,
            options: Vec::new(),
        }
    }

    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = question_type;
        self
    }

    pub fn with_difficulty(mut self, difficulty: QuestionDifficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Options survive only on multiple choice questions.
    pub fn into_question(self, topic_id: TopicId) -> Question {
        let options = match self.question_type {
            QuestionType::MultipleChoice => Some(self.options),
            _ => None,
        };
        Question {
            id: new_id(),
            topic_id,
            text: self.text,
            answer: self.answer,
            question_type: self.question_type,
            difficulty: self.difficulty,
            options,
            created_at: Utc::now(),
        }
    }
}

/// Caller-owned progress through a study session.
///
/// The named fields cover what the study flows record; anything else a
/// caller stores is kept in `extra` and round-trips untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionProgress {
    #[serde(default)]
    pub completed_topics: Vec<TopicId>,
    #[serde(default)]
    pub answered_questions: Vec<QuestionId>,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionProgress {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidInput(
                "session progress must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// A user's study session over one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: SessionId,
    pub artifact_id: ArtifactId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub progress: SessionProgress,
}

impl StudySession {
    pub fn new(artifact_id: ArtifactId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            artifact_id,
            name: name.into(),
            created_at: now,
            last_accessed_at: now,
            progress: SessionProgress::default(),
        }
    }
}

/// Per-artifact study statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactStats {
    pub topic_count: i64,
    pub question_count: i64,
    pub session_count: i64,
    pub average_topic_confidence: f64,
}

/// Statistics about the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_artifacts: i64,
    pub artifacts_by_status: std::collections::HashMap<String, i64>,
    pub artifacts_by_kind: std::collections::HashMap<String, i64>,
    pub total_chunks: i64,
    pub total_topics: i64,
    pub total_questions: i64,
    pub total_sessions: i64,
    pub database_size_bytes: i64,
}
