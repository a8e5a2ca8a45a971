//! Human-readable titles for URLs.
//!
//! Resolution never fails: a fetched `<title>` wins, then a title synthesized
//! from a known service's URL layout, then the capitalized domain.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::core::link::{TitleSource, domain_of};

static HTML_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());

static NOISE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*-\s*(?:google\s+docs|google\s+sheets|figma|clickup)\s*$").unwrap()
});

static GOOGLE_DOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/document/d/([a-zA-Z0-9_-]+)").unwrap());

static GOOGLE_SHEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap());

static FIGMA_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?:file|design|proto|board)/([a-zA-Z0-9]+)/([^/]+)").unwrap());

static CLICKUP_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/t/(?:[0-9]+/)?([a-zA-Z0-9-]+)").unwrap());

/// A title and how much it can be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub title: String,
    pub source: TitleSource,
}

/// Best-effort remote title lookup. Any failure is `None`.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    async fn fetch_title(&self, url: &Url) -> Option<String>;
}

#[async_trait]
impl<T: TitleFetcher + ?Sized> TitleFetcher for std::sync::Arc<T> {
    async fn fetch_title(&self, url: &Url) -> Option<String> {
        (**self).fetch_title(url).await
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {0}")]
    Status(reqwest::StatusCode),
}

/// Fetches the page over HTTP and reads its `<title>`.
#[derive(Debug, Clone)]
pub struct HttpTitleFetcher {
    http: Client,
}

impl HttpTitleFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http })
    }

    pub async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self
            .http
            .get(url.as_str())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(timeout_or_http)?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status()));
        }
        resp.text().await.map_err(timeout_or_http)
    }
}

fn timeout_or_http(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &Url) -> Option<String> {
        match self.fetch_page(url).await {
            Ok(body) => extract_html_title(&body),
            Err(e) => {
                log::warn!("Failed to fetch title for {}: {}", url, e);
                None
            }
        }
    }
}

/// Text of the first `<title>` element, entity-decoded and whitespace-collapsed.
pub fn extract_html_title(html: &str) -> Option<String> {
    let raw = HTML_TITLE_RE.captures(html)?.get(1)?.as_str();
    let decoded = raw
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ");
    let title = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Drop the product name some services append to every page title.
pub fn strip_noise_suffix(title: &str) -> String {
    NOISE_SUFFIX_RE.replace(title.trim(), "").trim().to_string()
}

/// Title synthesized from the URL layout of a known service.
pub fn pattern_title(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path();

    if host == "docs.google.com" || host == "sheets.google.com" {
        if let Some(caps) = GOOGLE_DOC_RE.captures(path) {
            return Some(format!("Google Doc ({}...)", prefix(&caps[1], 8)));
        }
        if let Some(caps) = GOOGLE_SHEET_RE.captures(path) {
            return Some(format!("Google Sheet ({}...)", prefix(&caps[1], 8)));
        }
    }

    if host == "figma.com" || host.ends_with(".figma.com") {
        let caps = FIGMA_FILE_RE.captures(path)?;
        let slug = urlencoding::decode(&caps[2]).ok()?;
        let name = slug.replace('-', " ").trim().to_string();
        return (!name.is_empty()).then_some(name);
    }

    if host == "clickup.com" || host.ends_with(".clickup.com") {
        let caps = CLICKUP_TASK_RE.captures(path)?;
        return Some(format!("ClickUp Task {}", &caps[1]));
    }

    None
}

/// The host name without `www.`, first letter upper-cased.
pub fn domain_title(url: &Url) -> String {
    let domain = domain_of(url);
    let mut chars = domain.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => url.as_str().to_string(),
    }
}

/// Everything short of a network fetch.
pub fn fallback_title(url: &Url) -> ResolvedTitle {
    match pattern_title(url) {
        Some(title) => ResolvedTitle {
            title,
            source: TitleSource::Pattern,
        },
        None => ResolvedTitle {
            title: domain_title(url),
            source: TitleSource::Domain,
        },
    }
}

fn prefix(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i])
}

/// Runs the fetch-then-fallback chain with a bounded wait on the fetcher.
#[derive(Debug, Clone)]
pub struct TitleResolver<F> {
    fetcher: F,
    timeout: Duration,
}

impl<F: TitleFetcher> TitleResolver<F> {
    pub fn new(fetcher: F, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    pub async fn resolve(&self, url: &Url) -> ResolvedTitle {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch_title(url)).await {
            Ok(Some(raw)) => {
                let title = strip_noise_suffix(&raw);
                if !title.is_empty() {
                    log::debug!("Fetched title for {}: {:?}", url, title);
                    return ResolvedTitle {
                        title,
                        source: TitleSource::Fetched,
                    };
                }
            }
            Ok(None) => {}
            Err(_) => log::warn!("Title fetch for {} gave up after {:?}", url, self.timeout),
        }
        fallback_title(url)
    }
}
