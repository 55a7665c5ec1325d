//! Plain-HTTP rendering backend.
//!
//! Returns the document as served, without running scripts: the equivalent
//! of waiting for DOM-parsed rather than network idle. Each request and its
//! response body live only for the duration of one `render` call.

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::extractor::extract_title;
use super::ssrf::{DnsResolver, TokioDnsResolver, guard_url};
use super::{FetchError, MAX_RESPONSE_BYTES, PAGE_LOAD_TIMEOUT, PageRenderer, RenderedPage};

#[derive(Debug, Clone)]
pub struct HttpRenderer<R = TokioDnsResolver> {
    http: Client,
    resolver: R,
}

impl HttpRenderer {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            resolver: TokioDnsResolver,
        }
    }
}

impl<R: DnsResolver> PageRenderer for HttpRenderer<R> {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        guard_url(url, &self.resolver).await?;

        let (final_url, html) = download(&self.http, url).await?;

        // Redirects may land on an internal host.
        if final_url != url {
            guard_url(&final_url, &self.resolver).await?;
        }

        Ok(RenderedPage {
            title: extract_title(&html).unwrap_or_default(),
            final_url,
            html,
        })
    }
}

async fn download(client: &Client, url: &str) -> Result<(String, String), FetchError> {
    let mut response = client
        .get(url)
        .header("User-Agent", crate::USER_AGENT)
        .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5")
        .timeout(PAGE_LOAD_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);
    if let Some(ct) = &content_type
        && !is_textual(ct)
    {
        return Err(FetchError::UnsupportedContentType(ct.clone()));
    }

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(FetchError::TooLarge);
    }

    let final_url = response.url().to_string();
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    let html = decode_body(&body, content_type.as_deref());
    debug!(url = %final_url, bytes = body.len(), "page downloaded");
    Ok((final_url, html))
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    matches!(
        mime,
        "" | "text/html" | "application/xhtml+xml" | "text/plain"
    )
}

/// Decodes using the `charset` parameter of the content type, falling back
/// to UTF-8 (with replacement) when absent or unknown.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| {
            ct.split(';')
                .filter_map(|param| param.trim().strip_prefix("charset="))
                .next()
        })
        .and_then(|label| Encoding::for_label(label.trim_matches('"').as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}
