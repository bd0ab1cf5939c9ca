//! Prompt assembly for retrieval-augmented answers.

use serde::{Deserialize, Serialize};

/// Length of the excerpt kept in a [`SourceReference`].
pub const EXCERPT_CHARS: usize = 200;

/// A retrieved chunk offered to the model as context.
#[derive(Debug, Clone)]
pub struct ContextItem {
    /// The text content of the chunk.
    pub content: String,
    /// Cosine similarity to the question.
    pub similarity: f32,
    /// Position of the chunk within its artifact.
    pub sequence_index: u32,
}

/// A reference to a chunk used in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub sequence_index: u32,
    pub similarity: f32,
    pub excerpt: String,
}

impl SourceReference {
    pub fn from_context(item: &ContextItem) -> Self {
        Self {
            sequence_index: item.sequence_index,
            similarity: item.similarity,
            excerpt: truncate_content(&item.content, EXCERPT_CHARS),
        }
    }
}

/// Concatenate context in rank order, stopping at `budget_chars` characters.
///
/// The item that crosses the budget is cut rather than dropped, so the
/// best match always contributes something.
pub fn join_context(context: &[ContextItem], budget_chars: usize) -> String {
    let mut joined = String::new();
    let mut used = 0usize;

    for item in context {
        if used >= budget_chars {
            break;
        }
        if !joined.is_empty() {
            joined.push_str("\n\n");
        }
        let remaining = budget_chars - used;
        let piece: String = item.content.chars().take(remaining).collect();
        used += piece.chars().count();
        joined.push_str(&piece);
    }

    joined
}

/// Build the RAG prompt with context.
pub fn build_rag_prompt(question: &str, context: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("Use the following study material to answer the question. If the material doesn't contain relevant information, say so.\n\n");
    prompt.push_str("Material:\n");
    prompt.push_str("─────────────────────────────────────\n");
    prompt.push_str(context);
    prompt.push_str("\n─────────────────────────────────────\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question));
    prompt.push_str("Answer:");

    prompt
}

/// Build the system prompt for RAG.
pub fn build_system_prompt() -> String {
    r#"You are a patient tutor answering a student's questions about their own study material.

Guidelines:
- Base your answers on the material provided
- If the material doesn't contain enough information, acknowledge that
- Be concise but thorough
- Do not make up information not present in the material"#
        .to_string()
}

/// Truncate content to `max_chars` characters, adding an ellipsis if needed.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
