//! Capability traits the pipeline depends on, with Ollama-backed implementations.

use crate::client::OllamaClient;
use crate::error::{OllamaError, OllamaResult};
use crate::types::GenerateRequest;
use async_trait::async_trait;
use edulens_config::OllamaConfig;
use tracing::debug;

/// A single text-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system: None,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce a completion for the prompt.
    async fn complete(&self, prompt: Prompt) -> OllamaResult<String>;
}

/// Interface implemented by embedding backends.
///
/// All vectors from one embedder share a dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// [`LanguageModel`] served by an Ollama generation model.
#[derive(Clone)]
pub struct OllamaModel {
    client: OllamaClient,
    model: String,
}

impl OllamaModel {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Ok(Self::new(OllamaClient::from_config(config)?, &config.model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, prompt: Prompt) -> OllamaResult<String> {
        let mut request = GenerateRequest::new(&self.model, prompt.text);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = prompt.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.generate(request).await?;
        debug!(
            model = %self.model,
            chars = response.response.len(),
            "Completion finished"
        );

        if response.response.trim().is_empty() {
            return Err(OllamaError::EmptyResponse);
        }
        Ok(response.response)
    }
}

/// [`Embedder`] served by an Ollama embedding model.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Ok(Self::new(
            OllamaClient::from_config(config)?,
            &config.embedding_model,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        self.client.embed_batch(&self.model, texts).await
    }
}
