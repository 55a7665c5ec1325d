use std::sync::Arc;

use crate::llm::client::ModelClient;
use crate::llm::{ChatBackend, ModelError};

/// Characters of page text shown to the model; a fixed cap, not content-aware.
pub const MAX_EXCERPT_CHARS: usize = 2000;

/// Two-valued relevance decision for one document.
pub trait RelevanceClassifier {
    async fn is_relevant(&self, question: &str, body_text: &str) -> Result<bool, ModelError>;
}

/// Asks the model for a bare Yes/No and accepts any answer containing "yes".
#[derive(Debug)]
pub struct LlmRelevanceFilter<B> {
    llm: Arc<ModelClient<B>>,
}

impl<B: ChatBackend> LlmRelevanceFilter<B> {
    pub fn new(llm: Arc<ModelClient<B>>) -> Self {
        Self { llm }
    }
}

impl<B: ChatBackend> RelevanceClassifier for LlmRelevanceFilter<B> {
    async fn is_relevant(&self, question: &str, body_text: &str) -> Result<bool, ModelError> {
        let answer = self
            .llm
            .chat(&relevance_prompt(question, body_text), false, false)
            .await?;
        Ok(is_affirmative(&answer))
    }
}

fn relevance_prompt(question: &str, body_text: &str) -> String {
    let excerpt = match body_text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((end, _)) => &body_text[..end],
        None => body_text,
    };
    format!(
        "Is the following article relevant to the query: \"{question}\"?\n\
         Respond only with 'Yes' or 'No' with no explanation.\n\n\
         --- Article Content ---\n{excerpt}"
    )
}

/// Case-insensitive "yes" anywhere in the answer. Anything else, including
/// an empty or garbled answer, is a no.
pub fn is_affirmative(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}
