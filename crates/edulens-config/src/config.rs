//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoHomeDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(ConfigError::io(path))?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoHomeDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::io(parent))?;
        }
        std::fs::write(path, contents).map_err(ConfigError::io(path))?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::io(parent))?;
        }
        std::fs::write(path, Self::default_config_string()).map_err(ConfigError::io(path))?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let p = &self.processing;
        if p.chunk_size == 0 {
            return Err(ConfigError::Invalid("processing.chunk_size must be > 0".into()));
        }
        if p.chunk_overlap >= p.chunk_size {
            return Err(ConfigError::Invalid(
                "processing.chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if p.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "processing.max_concurrent_jobs must be > 0".into(),
            ));
        }
        if p.queue_capacity == 0 {
            return Err(ConfigError::Invalid("processing.queue_capacity must be > 0".into()));
        }
        if p.claim_lease_seconds == 0 {
            return Err(ConfigError::Invalid(
                "processing.claim_lease_seconds must be > 0".into(),
            ));
        }
        if p.questions_per_topic == 0 {
            return Err(ConfigError::Invalid(
                "processing.questions_per_topic must be > 0".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".into()));
        }
        Ok(())
    }

    /// Set a single value by dotted key, e.g. `ollama.model`.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("invalid value for {}: {}", key, value)))
        }

        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["general", "data_dir"] => self.general.data_dir = Some(value.to_string()),
            ["general", "uploads_dir"] => self.general.uploads_dir = Some(value.to_string()),
            ["ollama", "host"] => self.ollama.host = value.to_string(),
            ["ollama", "model"] => self.ollama.model = value.to_string(),
            ["ollama", "embedding_model"] => self.ollama.embedding_model = value.to_string(),
            ["ollama", "timeout_seconds"] => self.ollama.timeout_seconds = parse(key, value)?,
            ["processing", "chunk_size"] => self.processing.chunk_size = parse(key, value)?,
            ["processing", "chunk_overlap"] => self.processing.chunk_overlap = parse(key, value)?,
            ["processing", "topic_input_chars"] => {
                self.processing.topic_input_chars = parse(key, value)?
            }
            ["processing", "max_topics"] => self.processing.max_topics = parse(key, value)?,
            ["processing", "question_input_chars"] => {
                self.processing.question_input_chars = parse(key, value)?
            }
            ["processing", "questions_per_topic"] => {
                self.processing.questions_per_topic = parse(key, value)?
            }
            ["processing", "summary_chars"] => self.processing.summary_chars = parse(key, value)?,
            ["processing", "generate_summary"] => {
                self.processing.generate_summary = parse(key, value)?
            }
            ["processing", "whisper_model"] => self.processing.whisper_model = value.to_string(),
            ["processing", "max_upload_bytes"] => {
                self.processing.max_upload_bytes = parse(key, value)?
            }
            ["processing", "max_concurrent_jobs"] => {
                self.processing.max_concurrent_jobs = parse(key, value)?
            }
            ["processing", "queue_capacity"] => {
                self.processing.queue_capacity = parse(key, value)?
            }
            ["processing", "claim_lease_seconds"] => {
                self.processing.claim_lease_seconds = parse(key, value)?
            }
            ["retrieval", "top_k"] => self.retrieval.top_k = parse(key, value)?,
            ["retrieval", "context_chars"] => self.retrieval.context_chars = parse(key, value)?,
            ["retrieval", "temperature"] => self.retrieval.temperature = parse(key, value)?,
            ["ui", "color"] => self.ui.color = parse(key, value)?,
            ["ui", "date_format"] => self.ui.date_format = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.validate()
    }

    /// Resolve the data directory, honouring the `general.data_dir` override.
    pub fn data_dir(&self, paths: &AppPaths) -> PathBuf {
        match &self.general.data_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => paths.data_dir.clone(),
        }
    }

    /// Resolve where uploaded files are stored.
    pub fn uploads_dir(&self, paths: &AppPaths) -> PathBuf {
        match &self.general.uploads_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => self.data_dir(paths).join("uploads"),
        }
    }

    /// Resolve the database file.
    pub fn database_file(&self, paths: &AppPaths) -> PathBuf {
        match &self.general.data_dir {
            Some(_) => self.data_dir(paths).join(AppPaths::DATABASE_FILE_NAME),
            None => paths.database_file.clone(),
        }
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# EduLens Configuration
# Study material ingestion and knowledge pipeline

[general]
# Data directory for the database and uploads
# data_dir = "~/.local/share/edulens"
# uploads_dir = "~/.local/share/edulens/uploads"

[ollama]
# Ollama server address
host = "http://localhost:11434"

# Model for topics, questions, summaries and answers
model = "mistral"

# Model for generating embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds
timeout_seconds = 120

[processing]
# Text chunking for retrieval (characters)
chunk_size = 1000
chunk_overlap = 0

# Characters of extracted text sent to topic synthesis
topic_input_chars = 4000
max_topics = 8

# Characters of supporting text sent to question synthesis
question_input_chars = 3000
questions_per_topic = 5

# Summary excerpt length; set generate_summary to ask the model instead
summary_chars = 500
generate_summary = false

# Whisper model size: tiny, base, small, medium, large
whisper_model = "base"

# Uploads larger than this are rejected (bytes)
max_upload_bytes = 104857600

# Worker pool
max_concurrent_jobs = 2
queue_capacity = 32

# A running artifact renews its claim; recovery only fails lapsed claims
claim_lease_seconds = 60

[retrieval]
# Chunks retrieved per question
top_k = 4

# Characters of retrieved context sent to the model
context_chars = 4000
temperature = 0.7

[ui]
# Enable colored output
color = true

# Date format (strftime)
date_format = "%Y-%m-%d %H:%M"
"#
        .to_string()
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
    pub uploads_dir: Option<String>,
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub topic_input_chars: usize,
    pub max_topics: usize,
    pub question_input_chars: usize,
    pub questions_per_topic: usize,
    pub summary_chars: usize,
    pub generate_summary: bool,
    pub whisper_model: String,
    pub max_upload_bytes: u64,
    pub max_concurrent_jobs: usize,
    pub queue_capacity: usize,
    /// How long a claim on a `processing` artifact lasts without renewal.
    /// Startup recovery only fails artifacts whose claim has lapsed.
    pub claim_lease_seconds: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            topic_input_chars: 4000,
            max_topics: 8,
            question_input_chars: 3000,
            questions_per_topic: 5,
            summary_chars: 500,
            generate_summary: false,
            whisper_model: "base".to_string(),
            max_upload_bytes: 100 * 1024 * 1024,
            max_concurrent_jobs: 2,
            queue_capacity: 32,
            claim_lease_seconds: 60,
        }
    }
}

/// Chunks retrieved per question unless `retrieval.top_k` says otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub context_chars: usize,
    pub temperature: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            context_chars: 4000,
            temperature: 0.7,
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
    pub date_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: true,
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}
