//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::*;
use edulens_config::OllamaConfig;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Self::with_timeout(&config.host, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a new client with default settings.
    pub fn new(host: impl Into<String>) -> OllamaResult<Self> {
        Self::with_timeout(&host.into(), Duration::from_secs(120))
    }

    fn with_timeout(host: &str, timeout: Duration) -> OllamaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OllamaError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Names of the models the server has pulled.
    pub async fn list_models(&self) -> OllamaResult<Vec<ModelTag>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, None).await?;

        let tags: TagList = response.json().await?;
        Ok(tags.models)
    }

    /// True when `model` is pulled, with or without an explicit tag.
    pub async fn has_model(&self, model: &str) -> OllamaResult<bool> {
        let tagged = format!("{}:", model);
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&tagged)))
    }

    /// Embed one text.
    pub async fn embed(&self, model: &str, text: &str) -> OllamaResult<Vec<f32>> {
        let mut vectors = self.embed_batch(model, &[text.to_string()]).await?;
        vectors.pop().ok_or(OllamaError::EmptyResponse)
    }

    /// Embed a batch of texts in a single request.
    ///
    /// The reply must hold one vector per input, all of the same dimension.
    pub async fn embed_batch(&self, model: &str, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.host);
        debug!(model = %model, inputs = texts.len(), "Requesting embeddings");

        let response = self
            .client
            .post(&url)
            .json(&EmbedBatch { model, input: texts })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, Some(model)).await?;

        let reply: EmbedBatchReply = response.json().await?;
        if reply.embeddings.len() != texts.len() {
            return Err(OllamaError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                reply.embeddings.len()
            )));
        }
        let expected = reply.embeddings[0].len();
        if expected == 0 {
            return Err(OllamaError::EmptyResponse);
        }
        if let Some(bad) = reply.embeddings.iter().find(|v| v.len() != expected) {
            return Err(OllamaError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        Ok(reply.embeddings)
    }

    /// Generate text (non-streaming).
    pub async fn generate(&self, request: GenerateRequest) -> OllamaResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, Some(&request.model)).await?;

        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response)
    }

    fn send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OllamaError::Http(e)
        }
    }

    async fn check_status(&self, response: Response, model: Option<&str>) -> OllamaResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiFailure>(&text)
            .map(|e| e.error)
            .unwrap_or(text);

        if let Some(model) = model {
            if status.as_u16() == 404 || message.contains("not found") {
                return Err(OllamaError::ModelNotFound {
                    model: model.to_string(),
                });
            }
        }

        Err(OllamaError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let config = OllamaConfig::default();
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.host(), "http://localhost:11434");

        let client = OllamaClient::new("http://example:1234/").unwrap();
        assert_eq!(client.host(), "http://example:1234");
    }

    #[test]
    fn test_generate_request_builder() {
        let request = GenerateRequest::new("mistral", "Hello, world!")
            .with_system("You are a helpful tutor.")
            .with_temperature(0.7);

        assert_eq!(request.model, "mistral");
        assert!(!request.stream);
        assert!(request.system.is_some());

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], json!(0.7f32));
    }

    #[tokio::test]
    async fn test_generate_roundtrip() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{"model": "mistral", "stream": false}"#);
                then.status(200).json_body(json!({
                    "model": "mistral",
                    "response": "Photosynthesis converts light to energy.",
                    "done": true
                }));
            })
            .await;

        let client = OllamaClient::new(server.base_url()).unwrap();
        let response = client
            .generate(GenerateRequest::new("mistral", "Explain photosynthesis"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.response, "Photosynthesis converts light to energy.");
    }

    #[tokio::test]
    async fn test_missing_model_maps_to_model_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404)
                    .json_body(json!({"error": "model 'nomic-embed-text' not found"}));
            })
            .await;

        let client = OllamaClient::new(server.base_url()).unwrap();
        let err = client.embed("nomic-embed-text", "text").await.unwrap_err();
        assert!(matches!(err, OllamaError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_error_message_extracted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).json_body(json!({"error": "out of memory"}));
            })
            .await;

        let client = OllamaClient::new(server.base_url()).unwrap();
        let err = client
            .generate(GenerateRequest::new("mistral", "hi"))
            .await
            .unwrap_err();
        match err {
            OllamaError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "out of memory");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_short_embedding_reply_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200).json_body(json!({"embeddings": [[0.5, 0.5]]}));
            })
            .await;

        let client = OllamaClient::new(server.base_url()).unwrap();
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = client.embed_batch("m", &texts).await.unwrap_err();
        assert!(matches!(err, OllamaError::Malformed(_)));
        assert!(client.embed_batch("m", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_models_and_has_model() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/tags");
                then.status(200)
                    .json_body(json!({"models": [{"name": "mistral:latest"}]}));
            })
            .await;

        let client = OllamaClient::new(server.base_url()).unwrap();
        assert!(client.is_available().await);
        assert!(client.has_model("mistral").await.unwrap());
        assert!(!client.has_model("llama3").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        assert!(!client.is_available().await);
        let err = client.embed("m", "t").await.unwrap_err();
        assert!(matches!(err, OllamaError::ServerNotRunning { .. }));
    }
}
