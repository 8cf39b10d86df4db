//! HTTP-backed page session
//!
//! Documents are fetched with a reqwest client built from `[browser]`:
//! - configured user agent, request and connect timeouts
//! - gzip/brotli decoding, redirects followed by reqwest
//! - a settle delay after each navigation
//!
//! `click` resolves the element's navigation target (`href`, `data-href`,
//! `data-url`, or an `<option value>` that looks like a URL) and loads it.

use super::links::resolve_link;
use super::PageClient;
use crate::config::BrowserConfig;
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Builds an HTTP client with the configured user agent and timeouts
///
/// # Arguments
///
/// * `config` - The browser configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &BrowserConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

/// Page session that navigates by fetching documents over HTTP
pub struct HttpPageClient {
    client: Client,
    settle: Duration,
    current: Option<LoadedPage>,
    closed: bool,
}

impl HttpPageClient {
    /// Creates a session from the browser configuration
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        Ok(Self {
            client,
            settle: Duration::from_millis(config.settle_ms),
            current: None,
            closed: false,
        })
    }

    /// Sends a GET and returns the final URL and body of a successful response
    async fn get(&self, url: &str) -> Result<(String, String)> {
        if self.closed {
            return Err(ScrapeError::NoPage);
        }

        Url::parse(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok((final_url, body))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> ScrapeError {
    if error.is_timeout() {
        ScrapeError::Timeout {
            url: url.to_string(),
        }
    } else {
        ScrapeError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl PageClient for HttpPageClient {
    async fn load(&mut self, url: &str) -> Result<()> {
        debug!("Loading {}", url);

        let (final_url, html) = self.get(url).await?;
        self.current = Some(LoadedPage {
            url: final_url,
            html,
        });

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        Ok(())
    }

    fn current_html(&self) -> Result<String> {
        self.current
            .as_ref()
            .map(|page| page.html.clone())
            .ok_or(ScrapeError::NoPage)
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|page| page.url.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let page = self.current.as_ref().ok_or(ScrapeError::NoPage)?;
        let target = click_target(&page.html, &page.url, selector)?;

        debug!("Click on '{}' navigates to {}", selector, target);
        self.load(&target).await
    }

    async fn fetch_document(&self, url: &str) -> Result<String> {
        debug!("Fetching document {}", url);
        let (_, body) = self.get(url).await?;
        Ok(body)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!("Closing page session");
        }
        self.current = None;
        self.closed = true;
        Ok(())
    }
}

/// Resolves the URL a click on the first element matching `selector` leads to
fn click_target(html: &str, page_url: &str, selector: &str) -> Result<String> {
    let parsed = Selector::parse(selector).map_err(|e| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;

    let document = Html::parse_document(html);
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| ScrapeError::MissingElement {
            selector: selector.to_string(),
        })?;

    let base = Url::parse(page_url)?;
    let attrs = element.value();

    let mut candidates = vec![attrs.attr("href"), attrs.attr("data-href"), attrs.attr("data-url")];
    if let Some(value) = attrs.attr("value") {
        if value.starts_with('/') || value.starts_with("http://") || value.starts_with("https://") {
            candidates.push(Some(value));
        }
    }

    candidates
        .into_iter()
        .flatten()
        .find_map(|href| resolve_link(href, &base))
        .ok_or_else(|| ScrapeError::Navigation {
            url: page_url.to_string(),
            message: format!("element '{}' has no navigation target", selector),
        })
}
