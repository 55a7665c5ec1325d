//! DuckDuckGo HTML endpoint. Needs no API key and no JavaScript.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::{SearchBackend, SearchError, SearchResult};

const API_BASE: &str = "https://html.duckduckgo.com";

#[derive(Debug, Clone)]
pub struct DuckDuckGoBackend {
    http: Client,
    base_url: String,
}

impl DuckDuckGoBackend {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

impl SearchBackend for DuckDuckGoBackend {
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .http
            .post(format!("{}/html/", self.base_url))
            .form(&[("q", query)])
            .header("User-Agent", crate::USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let results = parse_results(&html, limit)?;
        debug!(query, count = results.len(), "duckduckgo results parsed");
        Ok(results)
    }
}

pub(crate) fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result:not(.result--ad), .web-result:not(.result--ad)")?;
    let link_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        if results.len() >= limit {
            break;
        }
        let Some(link) = element.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(SearchResult {
            url,
            title,
            snippet,
        });
    }

    Ok(results)
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// Resolves `//duckduckgo.com/l/?uddg=<target>` wrappers to the target URL.
fn unwrap_redirect(href: &str) -> Option<String> {
    let full = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&full).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full)
    }
}
