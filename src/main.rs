mod config;
mod fetch;
mod gemini;
mod llm;
mod output;
mod research;
mod search;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use config::Config;
use fetch::{ContentFetcher, HttpRenderer};
use llm::client::ModelClient;
use llm::rate_limit::RateLimiter;
use research::ResearchPipeline;
use research::expand::QueryExpander;
use research::relevance::LlmRelevanceFilter;
use search::{DuckDuckGoBackend, ResultAggregator};

pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; research-agent/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("research_agent=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    let question = prompt("Ask your research question: ").await?;
    if question.is_empty() {
        return Err("research question must not be empty".into());
    }

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;

    info!(model = %config.model(), "starting research run");

    let llm = Arc::new(ModelClient::new(
        config.backend(http.clone()),
        RateLimiter::new(config.rate_max_calls, config.rate_period),
        config.max_context,
    ));
    let pipeline = ResearchPipeline::new(
        QueryExpander::new(llm.clone()),
        ResultAggregator::new(
            DuckDuckGoBackend::new(http.clone()),
            config.results_per_query,
            config.max_results,
        ),
        ContentFetcher::new(HttpRenderer::new(http)),
        LlmRelevanceFilter::new(llm),
    );

    let json = pipeline.run(&question).await?;
    let path = output::write_report(&config.output_dir, &json, chrono::Local::now())?;

    println!("\nResearch completed. Results saved to: {}", path.display());
    Ok(())
}

async fn prompt(message: &str) -> std::io::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}
