//! Topic synthesis.
//!
//! Degrades instead of failing: any model or parse problem yields the
//! single fallback topic.

use crate::synthesis::{parse_json_array, truncate_chars};
use edulens_config::ProcessingConfig;
use edulens_core::{TopicDifficulty, TopicDraft};
use edulens_ollama::{LanguageModel, Prompt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str =
    "You are an experienced teacher who organises study material into topics. Reply with JSON only.";

#[derive(Debug, Deserialize)]
struct RawTopic {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "keyConcepts", alias = "key_concepts")]
    key_concepts: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(
        default,
        rename = "estimatedTime",
        alias = "estimated_time",
        alias = "estimatedMinutes",
        alias = "estimated_minutes"
    )]
    estimated_minutes: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl RawTopic {
    fn into_draft(self) -> Option<TopicDraft> {
        let name = self.name?.trim().to_string();
        if name.is_empty() {
            return None;
        }

        let mut draft = TopicDraft::new(name)
            .with_description(self.description.unwrap_or_default().trim())
            .with_key_concepts(
                self.key_concepts
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            );

        if let Some(difficulty) = self.difficulty.as_deref().and_then(TopicDifficulty::from_str) {
            draft = draft.with_difficulty(difficulty);
        }
        if let Some(minutes) = self.estimated_minutes.filter(|m| m.is_finite() && *m > 0.0) {
            draft = draft.with_estimated_minutes(minutes.round().min(u32::MAX as f64) as u32);
        }
        if let Some(confidence) = self.confidence {
            draft = draft.with_confidence(confidence);
        }
        Some(draft)
    }
}

/// Derives study topics from extracted text.
#[derive(Clone)]
pub struct TopicSynthesizer {
    model: Arc<dyn LanguageModel>,
    input_chars: usize,
    max_topics: usize,
}

impl TopicSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, input_chars: usize, max_topics: usize) -> Self {
        Self {
            model,
            input_chars,
            max_topics: max_topics.max(1),
        }
    }

    pub fn from_config(model: Arc<dyn LanguageModel>, config: &ProcessingConfig) -> Self {
        Self::new(model, config.topic_input_chars, config.max_topics)
    }

    /// Topics for `text`, most confident first.
    ///
    /// Only the first `input_chars` characters are shown to the model. Never
    /// empty: failures yield [`TopicDraft::fallback`].
    pub async fn synthesize(&self, text: &str) -> Vec<TopicDraft> {
        let excerpt = truncate_chars(text.trim(), self.input_chars);
        if excerpt.is_empty() {
            debug!("No text to synthesize topics from, using fallback topic");
            return vec![TopicDraft::fallback()];
        }

        let prompt = Prompt::new(build_prompt(excerpt))
            .with_system(SYSTEM_PROMPT)
            .with_temperature(0.3);

        let response = match self.model.complete(prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Topic synthesis failed, using fallback topic: {}", e);
                return vec![TopicDraft::fallback()];
            }
        };

        match self.parse(&response) {
            Some(topics) => {
                info!("Synthesized {} topics", topics.len());
                topics
            }
            None => {
                warn!("Could not parse topics from model response, using fallback topic");
                vec![TopicDraft::fallback()]
            }
        }
    }

    /// Parse a model response. `None` when nothing usable was found.
    fn parse(&self, response: &str) -> Option<Vec<TopicDraft>> {
        let mut topics: Vec<TopicDraft> = parse_json_array::<RawTopic>(response)?
            .into_iter()
            .filter_map(RawTopic::into_draft)
            .collect();

        if topics.is_empty() {
            return None;
        }

        topics.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        topics.truncate(self.max_topics);
        Some(topics)
    }
}

fn build_prompt(content: &str) -> String {
    format!(
        r#"Identify the main study topics in the educational content below.
For each topic give a short name, a one-sentence description, the key concepts it covers,
a difficulty of beginner, intermediate or advanced, the estimated study time in minutes,
and your confidence between 0 and 1 that it is a real topic of the material.

Return a JSON array and nothing else, shaped like:
[{{"name": "Topic name", "description": "What it covers", "keyConcepts": ["concept"],
  "difficulty": "intermediate", "estimatedTime": 30, "confidence": 0.9}}]

Aim for 3 to 8 topics.

Content:
{}"#,
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    fn synthesizer(model: ScriptedModel) -> (TopicSynthesizer, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        (TopicSynthesizer::new(model.clone(), 4000, 8), model)
    }

    #[tokio::test]
    async fn test_parses_and_orders_by_confidence() {
        let (synth, _) = synthesizer(ScriptedModel::replying([r#"Here you go:
```json
[
  {"name": "Osmosis", "description": "Water movement", "keyConcepts": ["membrane"], "difficulty": "beginner", "estimatedTime": 20, "confidence": 0.6},
  {"name": "Mitosis", "difficulty": "advanced", "confidence": 1.7},
  {"description": "nameless"}
]
```"#]));

        let topics = synth.synthesize("Cells divide. Water moves.").await;

        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].name, "Mitosis");
        assert_eq!(topics[0].confidence, 1.0);
        assert_eq!(topics[0].difficulty, TopicDifficulty::Advanced);
        assert_eq!(topics[1].name, "Osmosis");
        assert_eq!(topics[1].key_concepts, vec!["membrane".to_string()]);
        assert_eq!(topics[1].estimated_minutes, 20);
    }

    #[tokio::test]
    async fn test_brackets_in_preamble_do_not_hide_topics() {
        let (synth, _) = synthesizer(ScriptedModel::replying([
            "Here are the topics [as JSON]:\n[{\"name\": \"Mitosis\", \"confidence\": 0.9}]",
        ]));

        let topics = synth.synthesize("Cells divide.").await;

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name, "Mitosis");
        assert_eq!(topics[0].confidence, 0.9);
    }

    #[tokio::test]
    async fn test_model_error_yields_fallback() {
        let (synth, _) = synthesizer(ScriptedModel::failing());
        let topics = synth.synthesize("Some content").await;

        assert_eq!(topics, vec![TopicDraft::fallback()]);
        assert_eq!(topics[0].confidence, 0.8);
    }

    #[tokio::test]
    async fn test_unparsable_or_empty_response_yields_fallback() {
        let (synth, _) = synthesizer(ScriptedModel::replying(["I cannot help with that.", "[]"]));

        assert_eq!(synth.synthesize("Content").await, vec![TopicDraft::fallback()]);
        assert_eq!(synth.synthesize("Content").await, vec![TopicDraft::fallback()]);
    }

    #[tokio::test]
    async fn test_input_is_truncated_to_prefix() {
        let model = Arc::new(ScriptedModel::replying([r#"[{"name": "A"}]"#]));
        let synth = TopicSynthesizer::new(model.clone(), 10, 8);

        synth.synthesize("0123456789TAIL").await;

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].text.contains("0123456789"));
        assert!(!prompts[0].text.contains("TAIL"));
    }

    #[tokio::test]
    async fn test_caps_topic_count() {
        let many: Vec<String> = (0..12)
            .map(|i| format!(r#"{{"name": "T{}", "confidence": 0.5}}"#, i))
            .collect();
        let response = format!("[{}]", many.join(","));
        let model = Arc::new(ScriptedModel::replying([response.as_str()]));
        let synth = TopicSynthesizer::new(model, 4000, 3);

        let topics = synth.synthesize("text").await;
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0].name, "T0");
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let (synth, model) = synthesizer(ScriptedModel::replying(["unused"]));
        assert_eq!(synth.synthesize("   ").await, vec![TopicDraft::fallback()]);
        assert!(model.prompts().is_empty());
    }
}
