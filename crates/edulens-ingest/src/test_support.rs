//! Deterministic stand-ins for the model and embedding capabilities.

use async_trait::async_trait;
use edulens_ollama::{Embedder, LanguageModel, OllamaError, OllamaResult, Prompt};
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) const DIMENSIONS: usize = 64;

/// Bag-of-words embedding: each lowercased word is hashed into a slot.
pub(crate) struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let slot = word
                .to_lowercase()
                .bytes()
                .fold(7u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
            vector[slot as usize % DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }
}

/// Replays canned responses in order, then fails.
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<OllamaResult<String>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub(crate) fn replying<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self::replying(Vec::<String>::new())
    }

    pub(crate) fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: Prompt) -> OllamaResult<String> {
        self.prompts.lock().unwrap().push(prompt);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(OllamaError::ServerNotRunning {
                    host: "scripted".to_string(),
                })
            })
    }
}
