//! One research run: expand the question, search, then fetch and filter.

pub mod expand;
pub mod relevance;

use std::fmt;

use tracing::{debug, info, warn};

use crate::fetch::ssrf::redact_url_credentials;
use crate::fetch::{ContentFetcher, PageRenderer};
use crate::llm::{ChatBackend, ModelError};
use crate::output::{ResearchRecord, to_json};
use crate::search::{ResultAggregator, SearchBackend};
use expand::QueryExpander;
use relevance::RelevanceClassifier;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("model call failed: {0}")]
    ModelCallFailed(#[from] ModelError),

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stages of a run, entered strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Expanding,
    Aggregating,
    FetchingAndFiltering,
    Formatting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Expanding => "expanding",
            Self::Aggregating => "aggregating",
            Self::FetchingAndFiltering => "fetching-and-filtering",
            Self::Formatting => "formatting",
            Self::Done => "done",
        })
    }
}

fn enter(stage: Stage) {
    info!(%stage, "pipeline stage");
}

#[derive(Debug)]
pub struct ResearchPipeline<B, S, P, C> {
    expander: QueryExpander<B>,
    aggregator: ResultAggregator<S>,
    fetcher: ContentFetcher<P>,
    classifier: C,
}

impl<B, S, P, C> ResearchPipeline<B, S, P, C>
where
    B: ChatBackend,
    S: SearchBackend,
    P: PageRenderer,
    C: RelevanceClassifier,
{
    pub fn new(
        expander: QueryExpander<B>,
        aggregator: ResultAggregator<S>,
        fetcher: ContentFetcher<P>,
        classifier: C,
    ) -> Self {
        Self {
            expander,
            aggregator,
            fetcher,
            classifier,
        }
    }

    /// Runs the whole pipeline and returns the JSON report.
    ///
    /// Only a failed query expansion aborts the run. Search, fetch, and
    /// relevance failures each drop the affected item and nothing else.
    pub async fn run(&self, question: &str) -> Result<String, PipelineError> {
        let records = self.collect(question).await?;

        enter(Stage::Formatting);
        let json = to_json(&records)?;

        enter(Stage::Done);
        info!(records = records.len(), "research run finished");
        Ok(json)
    }

    /// Relevant sources in search-result order.
    pub async fn collect(&self, question: &str) -> Result<Vec<ResearchRecord>, PipelineError> {
        enter(Stage::Expanding);
        let queries = self.expander.expand(question).await?;

        enter(Stage::Aggregating);
        let results = self.aggregator.aggregate(&queries).await;

        enter(Stage::FetchingAndFiltering);
        let mut records = Vec::new();
        for result in &results {
            let url = redact_url_credentials(&result.url);
            debug!(%url, title = %result.title, snippet = %result.snippet, "processing result");

            let document = self.fetcher.fetch(&result.url).await;
            if !document.is_usable() {
                debug!(%url, title = %document.title, "no usable text, skipping");
                continue;
            }

            match self.classifier.is_relevant(question, &document.body_text).await {
                Ok(true) => {
                    info!(%url, "relevant");
                    records.push(ResearchRecord {
                        title: document.title,
                        url: result.url.clone(),
                    });
                }
                Ok(false) => debug!(%url, "not relevant"),
                Err(e) => warn!(%url, error = %e, "relevance check failed, dropping result"),
            }
        }

        Ok(records)
    }
}
