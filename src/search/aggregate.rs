use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use super::{SearchBackend, SearchResult};

pub const DEFAULT_PER_QUERY_LIMIT: usize = 10;
pub const DEFAULT_TOTAL_CAP: usize = 50;
/// Pause between consecutive queries; the search backend has no published quota.
const QUERY_PACING: Duration = Duration::from_secs(1);

/// Runs several queries against one backend and merges the hits, unique by
/// URL in first-seen order, never more than `total_cap`.
#[derive(Debug)]
pub struct ResultAggregator<S> {
    backend: S,
    per_query_limit: usize,
    total_cap: usize,
}

impl<S: SearchBackend> ResultAggregator<S> {
    pub fn new(backend: S, per_query_limit: usize, total_cap: usize) -> Self {
        Self {
            backend,
            per_query_limit,
            total_cap,
        }
    }

    pub async fn aggregate(&self, queries: &[String]) -> Vec<SearchResult> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if results.len() >= self.total_cap {
                break;
            }
            if i > 0 {
                tokio::time::sleep(QUERY_PACING).await;
            }

            let hits = match self.backend.text_search(query, self.per_query_limit).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(%query, error = %e, "search failed, skipping query");
                    continue;
                }
            };

            for hit in hits {
                if !hit.url.is_empty() && seen.insert(hit.url.clone()) {
                    results.push(hit);
                    if results.len() >= self.total_cap {
                        break;
                    }
                }
            }
        }

        info!(unique = results.len(), queries = queries.len(), "search aggregation finished");
        results
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &S {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Returns canned hits per query and records every query issued.
    struct MockSearch {
        hits: HashMap<String, Result<Vec<&'static str>, u16>>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl MockSearch {
        fn new(entries: &[(&str, Result<Vec<&'static str>, u16>)]) -> Self {
            Self {
                hits: entries
                    .iter()
                    .map(|(q, r)| (q.to_string(), r.clone()))
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn issued(&self) -> Vec<String> {
            self.queries.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
        }
    }

    impl SearchBackend for MockSearch {
        async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
            self.queries.lock().unwrap().push((query.to_string(), limit));
            match self.hits.get(query) {
                Some(Ok(urls)) => Ok(urls
                    .iter()
                    .take(limit)
                    .map(|u| SearchResult {
                        url: u.to_string(),
                        title: String::new(),
                        snippet: String::new(),
                    })
                    .collect()),
                Some(Err(code)) => Err(SearchError::Status(*code)),
                None => Ok(Vec::new()),
            }
        }
    }

    fn queries(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|q| q.to_string()).collect()
    }

    fn urls(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.url.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_queries_are_deduplicated() {
        let backend = MockSearch::new(&[("a", Ok(vec!["x", "y"])), ("b", Ok(vec!["x", "y"]))]);
        let aggregator = ResultAggregator::new(backend, 10, 50);

        let results = aggregator.aggregate(&queries(&["a", "a", "b"])).await;

        assert_eq!(urls(&results), ["x", "y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn preserves_first_seen_order() {
        let backend = MockSearch::new(&[("a", Ok(vec!["3", "1"])), ("b", Ok(vec!["2", "1", "4"]))]);
        let aggregator = ResultAggregator::new(backend, 10, 50);

        let results = aggregator.aggregate(&queries(&["a", "b"])).await;

        assert_eq!(urls(&results), ["3", "1", "2", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_within_query_at_cap_and_skips_remaining_queries() {
        let backend = MockSearch::new(&[
            ("a", Ok(vec!["1", "2"])),
            ("b", Ok(vec!["3", "4", "5"])),
            ("c", Ok(vec!["6"])),
        ]);
        let aggregator = ResultAggregator::new(backend, 10, 3);

        let results = aggregator.aggregate(&queries(&["a", "b", "c"])).await;

        assert_eq!(urls(&results), ["1", "2", "3"]);
        assert_eq!(aggregator.backend.issued(), ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_query_does_not_abort_aggregation() {
        let backend = MockSearch::new(&[("a", Err(503)), ("b", Ok(vec!["z"]))]);
        let aggregator = ResultAggregator::new(backend, 10, 50);

        let results = aggregator.aggregate(&queries(&["a", "b"])).await;

        assert_eq!(urls(&results), ["z"]);
        assert_eq!(aggregator.backend.issued(), ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_urls_are_ignored() {
        let backend = MockSearch::new(&[("a", Ok(vec!["", "x"]))]);
        let aggregator = ResultAggregator::new(backend, 10, 50);

        let results = aggregator.aggregate(&queries(&["a"])).await;

        assert_eq!(urls(&results), ["x"]);
    }

    #[tokio::test(start_paused = true)]
    async fn passes_per_query_limit_to_backend() {
        let backend = MockSearch::new(&[("a", Ok(vec!["1", "2", "3"]))]);
        let aggregator = ResultAggregator::new(backend, 2, 50);

        let results = aggregator.aggregate(&queries(&["a"])).await;

        assert_eq!(results.len(), 2);
        assert_eq!(aggregator.backend.queries.lock().unwrap()[0].1, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn paces_between_queries_only() {
        let backend = MockSearch::new(&[]);
        let aggregator = ResultAggregator::new(backend, 10, 50);
        let start = tokio::time::Instant::now();

        aggregator.aggregate(&queries(&["a", "b", "c"])).await;

        assert_eq!(start.elapsed(), QUERY_PACING * 2);
    }

    #[tokio::test]
    async fn no_queries_no_searches() {
        let backend = MockSearch::new(&[]);
        let aggregator = ResultAggregator::new(backend, 10, 50);

        assert!(aggregator.aggregate(&[]).await.is_empty());
        assert!(aggregator.backend.issued().is_empty());
    }
}
