use std::sync::Arc;

use tracing::{info, warn};

use crate::llm::client::ModelClient;
use crate::llm::{ChatBackend, ModelError};

/// Turns a research question into a handful of short web-search queries.
#[derive(Debug)]
pub struct QueryExpander<B> {
    llm: Arc<ModelClient<B>>,
}

impl<B: ChatBackend> QueryExpander<B> {
    pub fn new(llm: Arc<ModelClient<B>>) -> Self {
        Self { llm }
    }

    /// Stateless: no conversation history is sent or recorded. A blank answer,
    /// or one that yields no queries, is returned as an empty list, not an error.
    pub async fn expand(&self, question: &str) -> Result<Vec<String>, ModelError> {
        let answer = match self.llm.chat(&expansion_prompt(question), false, false).await {
            Ok(answer) => answer,
            Err(ModelError::EmptyResponse) => String::new(),
            Err(e) => return Err(e),
        };
        let queries = parse_queries(&answer);
        if queries.is_empty() {
            warn!("model answer contained no search queries");
        } else {
            info!(?queries, "expanded question into search queries");
        }
        Ok(queries)
    }
}

fn expansion_prompt(question: &str) -> String {
    format!(
        r#"You are a search query generator for research on a given topic. Extract the most
important keywords from the user's request and produce a list of diverse, effective
search queries (1 to 5 words each) that a search engine can use to find highly
relevant information.

Cover different facets of the original request. Keep every query concise and directly searchable.
Return 3 to 5 queries as a comma-separated list. Do not include any other text or formatting.

Example:
Original Query: "What are the latest breakthroughs in renewable energy technology?"
Output: renewable energy breakthroughs, latest renewable energy, renewable energy technology, green energy innovations

Example:
Original Query: "How to train a dog to sit and stay?"
Output: train dog sit, dog training stay, teaching dog commands, basic dog obedience

Original Query: "{question}"
Output:"#
    )
}

/// Reads queries from the last non-empty line only, so reasoning preambles
/// before the answer are ignored.
pub fn parse_queries(answer: &str) -> Vec<String> {
    let Some(line) = answer.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    line.split(',')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use crate::llm::rate_limit::RateLimiter;
    use crate::llm::openai::OpenAiCompatBackend;
    use reqwest::Client;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedReply {
        reply: Result<&'static str, ()>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ChatBackend for FixedReply {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply
                .map(str::to_string)
                .map_err(|()| ModelError::Api {
                    code: 500,
                    message: "boom".into(),
                })
        }
    }

    fn expander(reply: Result<&'static str, ()>) -> QueryExpander<FixedReply> {
        let backend = FixedReply {
            reply,
            seen: Mutex::new(Vec::new()),
        };
        let llm = ModelClient::new(backend, RateLimiter::new(10, Duration::from_secs(60)), 10);
        QueryExpander::new(Arc::new(llm))
    }

    fn openai_client(server: &MockServer) -> ModelClient<OpenAiCompatBackend> {
        let backend = OpenAiCompatBackend::new(
            Client::new(),
            "test-key".into(),
            "test-model".into(),
            server.uri(),
        );
        ModelClient::new(backend, RateLimiter::new(10, Duration::from_secs(60)), 10)
    }

    #[test]
    fn parses_comma_separated_queries() {
        assert_eq!(
            parse_queries("Oregon hiking trails, best Oregon trails ,Oregon trail guide"),
            ["Oregon hiking trails", "best Oregon trails", "Oregon trail guide"]
        );
    }

    #[test]
    fn uses_only_last_non_empty_line() {
        let answer = "<think>\nThe user wants hikes, maybe waterfalls, coast\n</think>\n\nhikes, waterfalls\n\n  \n";
        assert_eq!(parse_queries(answer), ["hikes", "waterfalls"]);
    }

    #[test]
    fn drops_empty_tokens() {
        assert_eq!(parse_queries("a,, ,b,"), ["a", "b"]);
    }

    #[test]
    fn blank_answer_yields_no_queries() {
        assert!(parse_queries("").is_empty());
        assert!(parse_queries("\n \n").is_empty());
        assert!(parse_queries(" , ,").is_empty());
    }

    #[test]
    fn prompt_embeds_question() {
        let prompt = expansion_prompt("best hiking trails in Oregon");
        assert!(prompt.contains("Original Query: \"best hiking trails in Oregon\""));
        assert!(prompt.contains("comma-separated"));
    }

    #[tokio::test]
    async fn expand_is_stateless() {
        let expander = expander(Ok("a, b, c"));
        expander.llm.set_system_message("sys");

        let queries = expander.expand("question").await.unwrap();

        assert_eq!(queries, ["a", "b", "c"]);
        assert_eq!(expander.llm.history().len(), 1);
        let seen = expander.llm.backend().seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
    }

    #[tokio::test]
    async fn blank_backend_reply_yields_no_queries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "\n \n"}}]
            })))
            .mount(&server)
            .await;

        let expander = QueryExpander::new(Arc::new(openai_client(&server)));
        let queries = expander.expand("best hiking trails in Oregon").await.unwrap();

        assert!(queries.is_empty());
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let expander = expander(Err(()));
        let err = expander.expand("question").await.unwrap_err();
        assert!(matches!(err, ModelError::Api { code: 500, .. }));
    }
}
