//! Web search: backend seam, DuckDuckGo scraper, and multi-query aggregation.

pub mod aggregate;
pub mod duckduckgo;

pub use aggregate::ResultAggregator;
pub use duckduckgo::DuckDuckGoBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search failed: status {0}")]
    Status(u16),

    #[error("could not parse search results: {0}")]
    Parse(String),
}

/// Text search over some web index.
/// Implemented by `DuckDuckGoBackend` for production; mock implementations used in tests.
pub trait SearchBackend {
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError>;
}
