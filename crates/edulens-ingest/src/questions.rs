//! Practice question synthesis.
//!
//! Unlike topic synthesis there is no fallback content: a model or parse
//! failure yields no questions, which callers treat as "try again later".

use crate::synthesis::{parse_json_array, truncate_chars};
use edulens_config::ProcessingConfig;
use edulens_core::{QuestionDifficulty, QuestionDraft, QuestionType};
use edulens_ollama::{LanguageModel, Prompt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str =
    "You are an experienced teacher writing practice questions for students. Reply with JSON only.";

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default, alias = "text")]
    question: Option<String>,
    #[serde(default)]
    answer: Option<serde_json::Value>,
    #[serde(default, rename = "type", alias = "question_type")]
    question_type: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    options: Vec<serde_json::Value>,
}

impl RawQuestion {
    fn into_draft(self) -> Option<QuestionDraft> {
        let text = self.question?.trim().to_string();
        if text.is_empty() {
            return None;
        }

        // Models answer true/false questions with JSON booleans often enough
        let answer = match self.answer {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let question_type = self
            .question_type
            .as_deref()
            .and_then(QuestionType::from_str)
            .unwrap_or_default();
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(QuestionDifficulty::from_str)
            .unwrap_or_default();
        let options = self
            .options
            .into_iter()
            .map(|o| match o {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|o| !o.is_empty())
            .collect();

        Some(
            QuestionDraft::new(text, answer)
                .with_type(question_type)
                .with_difficulty(difficulty)
                .with_options(options),
        )
    }
}

/// Generates practice questions for a topic.
#[derive(Clone)]
pub struct QuestionSynthesizer {
    model: Arc<dyn LanguageModel>,
    input_chars: usize,
    target_count: usize,
}

impl QuestionSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, input_chars: usize, target_count: usize) -> Self {
        Self {
            model,
            input_chars,
            target_count: target_count.max(1),
        }
    }

    pub fn from_config(model: Arc<dyn LanguageModel>, config: &ProcessingConfig) -> Self {
        Self::new(model, config.question_input_chars, config.questions_per_topic)
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Up to `target_count` questions about `topic_name`, grounded on
    /// `supporting_text`. Empty on any failure.
    pub async fn synthesize(&self, topic_name: &str, supporting_text: &str) -> Vec<QuestionDraft> {
        let excerpt = truncate_chars(supporting_text.trim(), self.input_chars);
        if excerpt.is_empty() {
            debug!("No supporting text for topic '{}'", topic_name);
            return Vec::new();
        }

        let prompt = Prompt::new(build_prompt(topic_name, excerpt, self.target_count))
            .with_system(SYSTEM_PROMPT)
            .with_temperature(0.7);

        let response = match self.model.complete(prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Question generation failed for '{}': {}", topic_name, e);
                return Vec::new();
            }
        };

        let Some(raw) = parse_json_array::<RawQuestion>(&response) else {
            warn!("Could not parse questions for '{}'", topic_name);
            return Vec::new();
        };

        let questions: Vec<QuestionDraft> = raw
            .into_iter()
            .filter_map(RawQuestion::into_draft)
            .take(self.target_count)
            .collect();

        info!(
            "Generated {} questions for topic '{}'",
            questions.len(),
            topic_name
        );
        questions
    }
}

fn build_prompt(topic_name: &str, content: &str, count: usize) -> String {
    format!(
        r#"Write {count} study questions about the topic "{topic}" based on the content below.
Mix multiple choice, true/false and short answer questions.

Return a JSON array and nothing else, shaped like:
[{{"question": "Question text", "answer": "Correct answer",
  "type": "multiple_choice", "difficulty": "medium",
  "options": ["A", "B", "C", "D"]}}]

Use "type" values multiple_choice, true_false or short_answer and "difficulty"
values easy, medium or hard. Only multiple choice questions need "options".

Content:
{content}"#,
        count = count,
        topic = topic_name,
        content = content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    #[tokio::test]
    async fn test_parses_mixed_question_types() {
        let model = Arc::new(ScriptedModel::replying([r#"[
  {"question": "Which organelle makes ATP?", "answer": "Mitochondria", "type": "multiple_choice",
   "difficulty": "easy", "options": ["Nucleus", "Mitochondria", "Ribosome"]},
  {"question": "Plants respire.", "answer": true, "type": "true-false", "options": ["x"]},
  {"question": "Define osmosis.", "answer": "Water diffusion", "type": "essay", "difficulty": "brutal"},
  {"answer": "orphan"}
]"#]));
        let synth = QuestionSynthesizer::new(model, 3000, 5);

        let questions = synth.synthesize("Cells", "Cells make ATP in mitochondria.").await;

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].question_type, QuestionType::MultipleChoice);
        assert_eq!(questions[0].options.len(), 3);
        assert_eq!(questions[0].difficulty, QuestionDifficulty::Easy);
        assert_eq!(questions[1].question_type, QuestionType::TrueFalse);
        assert_eq!(questions[1].answer, "true");
        assert_eq!(questions[2].question_type, QuestionType::ShortAnswer);
        assert_eq!(questions[2].difficulty, QuestionDifficulty::Medium);
    }

    #[tokio::test]
    async fn test_failure_yields_no_questions() {
        let synth = QuestionSynthesizer::new(Arc::new(ScriptedModel::failing()), 3000, 5);
        assert!(synth.synthesize("Cells", "content").await.is_empty());

        let synth =
            QuestionSynthesizer::new(Arc::new(ScriptedModel::replying(["not json"])), 3000, 5);
        assert!(synth.synthesize("Cells", "content").await.is_empty());
    }

    #[tokio::test]
    async fn test_caps_at_target_count_and_names_topic() {
        let many: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"question": "Q{}?", "answer": "A"}}"#, i))
            .collect();
        let response = format!("[{}]", many.join(","));
        let model = Arc::new(ScriptedModel::replying([response.as_str()]));
        let synth = QuestionSynthesizer::new(model.clone(), 3000, 5);

        let questions = synth.synthesize("Photosynthesis", "Light to sugar.").await;

        assert_eq!(questions.len(), 5);
        assert_eq!(questions[0].text, "Q0?");
        assert!(model.prompts()[0].text.contains("\"Photosynthesis\""));
    }
}
