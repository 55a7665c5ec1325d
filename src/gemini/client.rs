use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::response::{build_request, extract_text};
use super::types::{ApiError, GenerateContentResponse};
use crate::llm::{ApiKey, ChatBackend, ChatMessage, ModelError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(http: Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key: ApiKey(api_key),
            model,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
    ) -> Result<GenerateContentResponse, ModelError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let request = build_request(messages);

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(ModelError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "Gemini API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(ModelError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(model = %self.model, "gemini call complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

impl ChatBackend for GeminiBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        let response = self.generate(messages).await?;
        extract_text(&response).ok_or(ModelError::EmptyResponse)
    }
}

fn classify_api_error(err: &ApiError) -> ModelError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => ModelError::RateLimited,
        Some(403) => ModelError::QuotaExhausted(message),
        Some(code) => ModelError::Api { code, message },
        None => ModelError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
