//! HTTP fetch pipeline that never fails.
//!
//! ### Request
//! - One GET per call with a fixed timeout (default 10s).
//! - Browser-like `User-Agent`, since some servers reject default client identifiers.
//! - At most `max_bytes` of the body are read (default 5MB); the rest is
//!   ignored, so a huge page is cut short instead of failing.
//! - Bytes are decoded with the `Content-Type` charset, UTF-8 when absent.
//!
//! ### Failure policy
//! - Network errors, timeouts, non-2xx statuses and unreadable bodies are
//!   turned into an [`ERROR_TITLE`] result instead of an `Err`.
//! - The placeholder is cacheable, so a broken URL is not retried on every
//!   request. Callers that want a retry must ask again explicitly.

pub mod url;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use reqwest::{Client, header};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use url::{UrlError, validate_url};

use crate::extract::{ExtractedPage, extract_page};
use scrapecache_core::AppConfig;
use scrapecache_core::config::BROWSER_USER_AGENT;

/// Title stored when a fetch fails.
pub const ERROR_TITLE: &str = "Error scraping page";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Chrome)
    pub user_agent: String,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Body bytes read before the rest is ignored (default: 5MB)
    pub max_bytes: usize,

    /// Maximum characters of extracted text (default: 100,000)
    pub max_content_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            max_bytes: 5 * 1024 * 1024,
            max_content_chars: 100_000,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_bytes: config.max_bytes,
            max_content_chars: config.max_content_chars,
        }
    }
}

/// Why a fetch produced a placeholder instead of page content.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(Arc<reqwest::Error>),

    /// Request exceeded the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or protocol error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Server answered with a non-2xx status.
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    /// Body could not be read or parsed.
    #[error("failed to read response: {0}")]
    Body(String),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() { FetchError::Timeout(timeout) } else { FetchError::Network(Arc::new(err)) }
    }
}

/// Outcome of one fetch, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub title: String,
    pub content: String,
    /// Set when `title`/`content` are the error placeholder.
    pub failed: bool,
}

impl FetchResult {
    /// Placeholder recorded in place of page content when a fetch fails.
    pub fn failure(err: &FetchError) -> Self {
        Self { title: ERROR_TITLE.to_string(), content: format!("Failed to scrape: {err}"), failed: true }
    }
}

impl From<ExtractedPage> for FetchResult {
    fn from(page: ExtractedPage) -> Self {
        Self { title: page.title, content: page.content, failed: false }
    }
}

/// Retrieves a page and reduces it to title and text.
///
/// Implementations must not fail: every error becomes a [`FetchResult`]
/// with `failed` set.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Undecoded response body and the charset the server declared for it.
struct RawBody {
    bytes: Bytes,
    charset: Option<String>,
}

impl RawBody {
    /// Decode with the declared charset; unknown or missing labels fall back to UTF-8.
    fn decode(&self) -> String {
        let encoding = self
            .charset
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.bytes);
        text.into_owned()
    }
}

/// `charset` parameter of a `Content-Type` value, unquoted.
fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim().eq_ignore_ascii_case("charset").then_some(value.trim().trim_matches('"'))
    })
}

/// HTTP fetcher backed by reqwest.
pub struct PageFetcher {
    http: Client,
    config: FetchConfig,
}

impl PageFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Client(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    async fn download(&self, url: &str) -> Result<RawBody, FetchError> {
        let timeout = self.config.timeout;
        let mut response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let charset = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .map(str::to_owned);

        let limit = self.config.max_bytes;
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() { FetchError::Timeout(timeout) } else { FetchError::Body(e.to_string()) }
        })? {
            let room = limit - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                tracing::debug!(url, limit, "body exceeds max_bytes, ignoring the rest");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawBody { bytes: body.freeze(), charset })
    }

    /// Fetch and extract, surfacing the failure reason.
    pub async fn try_fetch(&self, url: &str) -> Result<ExtractedPage, FetchError> {
        let start = Instant::now();
        let body = self.download(url).await?;
        let fetch_ms = start.elapsed().as_millis() as u64;

        let max_chars = self.config.max_content_chars;
        let page = tokio::task::spawn_blocking(move || extract_page(&body.decode(), max_chars))
            .await
            .map_err(|e| FetchError::Body(format!("extraction aborted: {e}")))?;

        tracing::debug!(
            url,
            fetch_ms,
            extract_ms = start.elapsed().as_millis() as u64 - fetch_ms,
            chars = page.content.chars().count(),
            "fetched page"
        );

        Ok(page)
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        match self.try_fetch(url).await {
            Ok(page) => page.into(),
            Err(err) => {
                tracing::error!(url, error = %err, "error scraping page");
                FetchResult::failure(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NO_TITLE;
    use axum::{Router, http::StatusCode, response::Html, routing::get};
    use std::net::SocketAddr;

    const PAGE: &str = "<html><head><title>Fixture Page</title></head>\
        <body><h1>Hello</h1><p>fixture body text</p></body></html>";

    async fn serve_fixtures() -> SocketAddr {
        let app = Router::new()
            .route("/", get(|| async { Html(PAGE) }))
            .route("/untitled", get(|| async { Html("<p>no head here</p>") }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Html(PAGE)
                }),
            )
            .route("/big", get(|| async { Html("x".repeat(4096)) }))
            .route(
                "/latin1",
                get(|| async {
                    (
                        [(axum::http::header::CONTENT_TYPE, "text/html; charset=iso-8859-1")],
                        b"<title>Caf\xe9</title><p>na\xefve</p>".as_slice(),
                    )
                }),
            )
            .route(
                "/agent",
                get(|headers: axum::http::HeaderMap| async move {
                    let agent = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Html(format!("<title>{agent}</title>"))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn fetcher() -> PageFetcher {
        PageFetcher::new(FetchConfig { timeout: Duration::from_millis(300), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, BROWSER_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_content_chars, 100_000);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 2_500, max_content_chars: 10, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(2_500));
        assert_eq!(config.max_content_chars, 10);
    }

    #[test]
    fn test_failure_placeholder() {
        let result = FetchResult::failure(&FetchError::Status(reqwest::StatusCode::NOT_FOUND));
        assert_eq!(result.title, ERROR_TITLE);
        assert_eq!(result.content, "Failed to scrape: HTTP error: 404 Not Found");
        assert!(result.failed);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/")).await;

        assert!(!result.failed);
        assert_eq!(result.title, "Fixture Page");
        assert_eq!(result.content, "Fixture Page\nHello\nfixture body text");
    }

    #[tokio::test]
    async fn test_fetch_without_title() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/untitled")).await;

        assert!(!result.failed);
        assert_eq!(result.title, NO_TITLE);
        assert_eq!(result.content, "no head here");
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/agent")).await;
        assert_eq!(result.title, BROWSER_USER_AGENT);
    }

    #[tokio::test]
    async fn test_fetch_404_becomes_placeholder() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/missing")).await;

        assert!(result.failed);
        assert_eq!(result.title, ERROR_TITLE);
        assert!(result.content.contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_becomes_placeholder() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/slow")).await;

        assert!(result.failed);
        assert_eq!(result.title, ERROR_TITLE);
        assert!(result.content.contains("timed out"), "content: {}", result.content);
    }

    #[tokio::test]
    async fn test_fetch_large_body_is_cut_short() {
        let addr = serve_fixtures().await;
        let fetcher = PageFetcher::new(FetchConfig { max_bytes: 1024, ..Default::default() }).unwrap();
        let result = fetcher.fetch(&format!("http://{addr}/big")).await;

        assert!(!result.failed);
        assert_eq!(result.content, "x".repeat(1024));
    }

    #[tokio::test]
    async fn test_fetch_decodes_declared_charset() {
        let addr = serve_fixtures().await;
        let result = fetcher().fetch(&format!("http://{addr}/latin1")).await;

        assert!(!result.failed);
        assert_eq!(result.title, "Café");
        assert_eq!(result.content, "Café\nnaïve");
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(charset_from_content_type("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_from_content_type("text/html;Charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_raw_body_decode_falls_back_to_utf8() {
        let body = RawBody { bytes: Bytes::from_static("naïve".as_bytes()), charset: Some("bogus".into()) };
        assert_eq!(body.decode(), "naïve");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_becomes_placeholder() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetcher().fetch(&format!("http://{addr}/")).await;
        assert!(result.failed);
        assert!(result.content.starts_with("Failed to scrape: "));
    }

    #[tokio::test]
    async fn test_try_fetch_reports_status() {
        let addr = serve_fixtures().await;
        let err = fetcher().try_fetch(&format!("http://{addr}/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == reqwest::StatusCode::NOT_FOUND));
    }
}
