use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::context::ConversationContext;
use super::rate_limit::RateLimiter;
use super::{ChatBackend, ChatMessage, ModelError};

/// Rate-limited model client with an optional rolling conversation history.
///
/// History is owned by this instance for the length of one run; callers that
/// reuse a client across unrelated conversations must call
/// [`ModelClient::clear_context`] in between.
#[derive(Debug)]
pub struct ModelClient<B> {
    backend: B,
    limiter: RateLimiter,
    context: Mutex<ConversationContext>,
}

impl<B: ChatBackend> ModelClient<B> {
    pub fn new(backend: B, limiter: RateLimiter, max_context_length: usize) -> Self {
        Self {
            backend,
            limiter,
            context: Mutex::new(ConversationContext::new(max_context_length)),
        }
    }

    /// Sends `prompt` and returns the trimmed response text.
    ///
    /// With `use_context`, the outbound list is the current history followed by
    /// the prompt. With `add_to_history`, the prompt and the response are
    /// appended as user/assistant turns once the call succeeds.
    pub async fn chat(
        &self,
        prompt: &str,
        use_context: bool,
        add_to_history: bool,
    ) -> Result<String, ModelError> {
        let mut messages = if use_context {
            self.context().messages()
        } else {
            Vec::new()
        };
        messages.push(ChatMessage::user(prompt));

        self.limiter.acquire().await;
        debug!(messages = messages.len(), "model call");
        let response = self.backend.complete(&messages).await?;
        let response = response.trim().to_string();

        if add_to_history {
            let mut ctx = self.context();
            ctx.push(ChatMessage::user(prompt));
            ctx.push(ChatMessage::assistant(response.clone()));
        }

        Ok(response)
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    fn context(&self) -> MutexGuard<'_, ConversationContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[allow(dead_code)] // Multi-turn API; the research run only makes stateless calls.
impl<B: ChatBackend> ModelClient<B> {
    /// Blocking form of [`ModelClient::chat`] on a private current-thread runtime.
    ///
    /// Must not be called from inside an async task: nesting runtimes panics.
    pub fn chat_blocking(
        &self,
        prompt: &str,
        use_context: bool,
        add_to_history: bool,
    ) -> Result<String, ModelError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.chat(prompt, use_context, add_to_history))
    }

    pub fn set_system_message(&self, content: impl Into<String>) {
        self.context().set_system_message(content);
    }

    pub fn clear_context(&self) {
        self.context().clear();
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.context().messages()
    }
}
