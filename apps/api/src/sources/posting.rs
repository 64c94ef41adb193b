//! Job posting URL → plain text.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
        .expect("valid script pattern")
});

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(p|div|li|ul|ol|br|h[1-6]|tr|section|article)\b[^>]*>")
        .expect("valid block tag pattern")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag pattern"));

static INLINE_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\f\v]+").expect("valid space pattern"));

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid blank line pattern"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid posting URL '{0}'")]
    InvalidUrl(String),

    #[error("fetching the posting failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("posting page returned status {0}")]
    Status(u16),

    #[error("posting page contains no readable text")]
    Empty,
}

#[async_trait]
pub trait PostingFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpPostingFetcher {
    http: reqwest::Client,
}

impl HttpPostingFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }
}

#[async_trait]
impl PostingFetcher for HttpPostingFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let html = response.text().await?;
        debug!("Fetched {} bytes of HTML from {url}", html.len());

        let text = html_to_text(&html);
        if text.is_empty() {
            return Err(FetchError::Empty);
        }
        info!("Posting fetched from {url}: {} chars of text", text.len());
        Ok(text)
    }
}

/// Drops scripts and styles, turns block tags into line breaks, strips the
/// remaining markup and collapses whitespace.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let with_breaks = BLOCK_TAG.replace_all(&without_scripts, "\n");
    let stripped = TAG.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);
    let single_spaced = INLINE_SPACE.replace_all(&decoded, " ");
    let lines: Vec<&str> = single_spaced.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
