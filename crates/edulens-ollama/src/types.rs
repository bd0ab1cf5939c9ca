//! Wire types for the Ollama HTTP API.

use serde::{Deserialize, Serialize};

/// One entry of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagList {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// Body of `POST /api/embed`. A single request embeds the whole batch.
#[derive(Debug, Serialize)]
pub(crate) struct EmbedBatch<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedBatchReply {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

/// Body of `POST /api/generate`. Always sent with `stream: false`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SamplingOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: false,
            options: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sample at `temperature` instead of the model's default.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options = Some(SamplingOptions {
            temperature: Some(temperature),
        });
        self
    }
}

/// The `options` object of a generate request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Non-streaming reply of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    pub response: String,
}

/// Ollama reports failures as `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiFailure {
    pub error: String,
}
