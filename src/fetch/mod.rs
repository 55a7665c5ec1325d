//! Page retrieval and readable-text extraction, tolerant of per-URL failure.

pub mod extractor;
pub mod http;
pub mod ssrf;

use std::time::Duration;

use tracing::{debug, warn};

pub use http::HttpRenderer;
use ssrf::redact_url_credentials;

/// Hard cap on loading one page, whatever the renderer does internally.
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("blocked: internal/private host not allowed")]
    InternalHost,

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("page load timed out after {}s", PAGE_LOAD_TIMEOUT.as_secs())]
    Timeout,
}

impl FetchError {
    /// Short name of the failure kind, used in the title of a failed document.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidScheme | Self::InvalidUrl(_) => "InvalidUrl",
            Self::InternalHost => "BlockedHost",
            Self::Http(e) if e.is_timeout() => "Timeout",
            Self::Http(e) if e.is_connect() => "ConnectionError",
            Self::Http(_) => "NetworkError",
            Self::DnsResolution(_) => "DnsError",
            Self::Status(_) => "HttpStatus",
            Self::TooLarge => "TooLarge",
            Self::UnsupportedContentType(_) => "UnsupportedContent",
            Self::Timeout => "Timeout",
        }
    }
}

/// A loaded page as the rendering backend sees it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub final_url: String,
    pub title: String,
    pub html: String,
}

/// Loads a URL into HTML plus the document title.
/// Implemented by `HttpRenderer` for production; mock implementations used in tests.
pub trait PageRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError>;
}

/// Outcome of fetching one URL. An empty `body_text` means "nothing usable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub url: String,
    pub title: String,
    pub body_text: String,
}

impl FetchedDocument {
    fn failed(url: &str, err: &FetchError) -> Self {
        Self {
            url: url.to_string(),
            title: format!("Scraping Error: {}", err.category()),
            body_text: String::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.body_text.is_empty()
    }
}

#[derive(Debug)]
pub struct ContentFetcher<P> {
    renderer: P,
}

impl<P: PageRenderer> ContentFetcher<P> {
    pub fn new(renderer: P) -> Self {
        Self { renderer }
    }

    /// Never fails: errors become a document with an empty body and an
    /// error-category title.
    pub async fn fetch(&self, url: &str) -> FetchedDocument {
        let outcome = tokio::time::timeout(PAGE_LOAD_TIMEOUT, self.renderer.render(url))
            .await
            .unwrap_or(Err(FetchError::Timeout));

        match outcome {
            Ok(page) => {
                let body_text = extractor::extract_body_text(&page.html);
                debug!(
                    url = %redact_url_credentials(url),
                    final_url = %redact_url_credentials(&page.final_url),
                    chars = body_text.chars().count(),
                    "page fetched"
                );
                FetchedDocument {
                    url: url.to_string(),
                    title: page.title,
                    body_text,
                }
            }
            Err(e) => {
                warn!(url = %redact_url_credentials(url), error = %e, "error scraping page");
                FetchedDocument::failed(url, &e)
            }
        }
    }
}
