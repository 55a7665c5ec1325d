//! Language-model access: backend seam, rate limiting, and conversation context.

pub mod client;
pub mod context;
pub mod openai;
pub mod rate_limit;

use serde::{Deserialize, Serialize};

use crate::gemini::GeminiBackend;
use openai::OpenAiCompatBackend;

/// Failure of a single model call. Never retried inside the client.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model API rate limit exceeded")]
    RateLimited,

    #[error("model API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("model API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Transport to a remote chat model.
/// Implemented by the HTTP backends for production; mock implementations used in tests.
pub trait ChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError>;
}

/// The configured backend. One client type covers every provider; only the
/// transport differs.
#[derive(Debug, Clone)]
pub enum LlmBackend {
    OpenAiCompat(OpenAiCompatBackend),
    Gemini(GeminiBackend),
}

impl ChatBackend for LlmBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        match self {
            Self::OpenAiCompat(b) => b.complete(messages).await,
            Self::Gemini(b) => b.complete(messages).await,
        }
    }
}

#[derive(Clone)]
pub struct ApiKey(pub(crate) String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey("sk-secret".into());
        assert_eq!(format!("{key:?}"), "[REDACTED]");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }
}
