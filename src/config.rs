//! Runtime configuration from environment variables (after `.env`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;

use crate::gemini::{self, GeminiBackend};
use crate::llm::openai::{self, OpenAiCompatBackend};
use crate::llm::{ApiKey, LlmBackend};
use crate::search::aggregate::{DEFAULT_PER_QUERY_LIMIT, DEFAULT_TOTAL_CAP};

const DEFAULT_RATE_MAX_CALLS: usize = 30;
const DEFAULT_RATE_PERIOD_SECS: u64 = 60;
const DEFAULT_MAX_CONTEXT: usize = 10;
/// Longest accepted rate window: one day.
const MAX_RATE_PERIOD_SECS: u64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} not set")]
    ApiKeyNotSet { var: &'static str },

    #[error("unknown RESEARCH_LLM_PROVIDER {0:?} (expected groq, openai, or gemini)")]
    UnknownProvider(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Which chat API to talk to, with its credentials.
#[derive(Debug, Clone)]
pub enum LlmSettings {
    OpenAiCompat {
        api_key: ApiKey,
        model: String,
        base_url: String,
    },
    Gemini {
        api_key: ApiKey,
        model: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub rate_max_calls: usize,
    pub rate_period: Duration,
    pub max_context: usize,
    pub results_per_query: usize,
    pub max_results: usize,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = get("RESEARCH_LLM_PROVIDER").unwrap_or_else(|| "groq".to_string());
        let llm = match provider.to_ascii_lowercase().as_str() {
            "groq" | "openai" => {
                let api_key = get("GROQ_API_KEY")
                    .or_else(|| get("OPENAI_API_KEY"))
                    .ok_or(ConfigError::ApiKeyNotSet {
                        var: "GROQ_API_KEY",
                    })?;
                LlmSettings::OpenAiCompat {
                    api_key: ApiKey(api_key),
                    model: get("RESEARCH_LLM_MODEL")
                        .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
                    base_url: get("RESEARCH_LLM_BASE_URL")
                        .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
                }
            }
            "gemini" => {
                let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::ApiKeyNotSet {
                    var: "GEMINI_API_KEY",
                })?;
                LlmSettings::Gemini {
                    api_key: ApiKey(api_key),
                    model: get("GEMINI_MODEL")
                        .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
                }
            }
            _ => return Err(ConfigError::UnknownProvider(provider)),
        };

        let number = |var: &'static str, default| parse_or(get(var), var, default);

        Ok(Self {
            llm,
            rate_max_calls: number("RESEARCH_RATE_MAX_CALLS", DEFAULT_RATE_MAX_CALLS)?,
            rate_period: rate_period(get("RESEARCH_RATE_PERIOD_SECS"))?,
            max_context: number("RESEARCH_MAX_CONTEXT", DEFAULT_MAX_CONTEXT)?,
            results_per_query: number("RESEARCH_RESULTS_PER_QUERY", DEFAULT_PER_QUERY_LIMIT)?,
            max_results: number("RESEARCH_MAX_RESULTS", DEFAULT_TOTAL_CAP)?,
            output_dir: get("RESEARCH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    pub fn backend(&self, http: Client) -> LlmBackend {
        match &self.llm {
            LlmSettings::OpenAiCompat {
                api_key,
                model,
                base_url,
            } => LlmBackend::OpenAiCompat(OpenAiCompatBackend::new(
                http,
                api_key.0.clone(),
                model.clone(),
                base_url.clone(),
            )),
            LlmSettings::Gemini { api_key, model } => {
                LlmBackend::Gemini(GeminiBackend::new(http, api_key.0.clone(), model.clone()))
            }
        }
    }

    pub fn model(&self) -> &str {
        match &self.llm {
            LlmSettings::OpenAiCompat { model, .. } | LlmSettings::Gemini { model, .. } => model,
        }
    }
}

/// Rate window in seconds, from 1 up to [`MAX_RATE_PERIOD_SECS`].
fn rate_period(value: Option<String>) -> Result<Duration, ConfigError> {
    let var = "RESEARCH_RATE_PERIOD_SECS";
    let secs = parse_or(value.clone(), var, DEFAULT_RATE_PERIOD_SECS)?;
    if !(1..=MAX_RATE_PERIOD_SECS).contains(&secs) {
        return Err(ConfigError::InvalidNumber {
            var,
            value: value.unwrap_or_default(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or<T: FromStr>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value: v }),
    }
}
