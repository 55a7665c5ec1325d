use tracing::warn;

use super::types::{Content, GenerateContentRequest, GenerateContentResponse, Part};
use crate::llm::{ChatMessage, Role};

/// Maps a chat history onto Gemini's request shape: the system message
/// becomes `systemInstruction`, assistant turns use the `model` role.
pub fn build_request(messages: &[ChatMessage]) -> GenerateContentRequest {
    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(messages.len());

    for message in messages {
        let part = Part {
            text: message.content.clone(),
        };
        match message.role {
            Role::System => {
                system_instruction = Some(Content {
                    parts: vec![part],
                    role: None,
                });
            }
            Role::User => contents.push(Content {
                parts: vec![part],
                role: Some("user".to_string()),
            }),
            Role::Assistant => contents.push(Content {
                parts: vec![part],
                role: Some("model".to_string()),
            }),
        }
    }

    GenerateContentRequest {
        contents,
        system_instruction,
    }
}

/// Concatenated text of the first candidate, if any.
pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty());

    if text.is_none() {
        let reason = candidate.and_then(|c| c.finish_reason.as_deref());
        warn!(reason, "Gemini returned empty answer (safety filter or empty response)");
    }

    text
}
