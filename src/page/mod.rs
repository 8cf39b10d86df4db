//! Page session abstraction
//!
//! The scraper drives a single page session through the `PageClient` trait:
//! - `load` navigates to a URL and waits for the settle delay
//! - `current_html` / `current_url` expose the loaded document
//! - `find_links` returns anchors whose absolute URL matches a pattern
//! - `click` follows the navigation target of an element
//! - `close` ends the session
//!
//! `HttpPageClient` is the bundled implementation; it fetches documents with
//! reqwest and treats clicks as navigation to the element's target URL.

mod http;
mod links;
mod text;

pub use http::{build_http_client, HttpPageClient};
pub use links::{find_links_matching, resolve_link};
pub use text::{normalize_whitespace, slugify, strip_noise_html, title_from_slug, visible_text};

use crate::{Result, ScrapeError};
use async_trait::async_trait;
use regex::Regex;

/// An anchor found on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL
    pub href: String,

    /// Whitespace-normalized anchor text
    pub text: String,
}

/// A navigable page session
#[async_trait]
pub trait PageClient: Send + Sync {
    /// Navigates to `url`, replacing the current document
    async fn load(&mut self, url: &str) -> Result<()>;

    /// HTML of the current document
    fn current_html(&self) -> Result<String>;

    /// URL of the current document after redirects, if any page is loaded
    fn current_url(&self) -> Option<String>;

    /// Activates the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Fetches a document without navigating (used for sitemaps)
    async fn fetch_document(&self, url: &str) -> Result<String>;

    /// Ends the session; further calls fail with `NoPage`
    async fn close(&mut self) -> Result<()>;

    /// Anchors on the current page whose absolute URL matches `pattern`
    fn find_links(&self, pattern: &Regex) -> Result<Vec<PageLink>> {
        let base = self.current_url().ok_or(ScrapeError::NoPage)?;
        let html = self.current_html()?;
        Ok(find_links_matching(&html, &base, pattern))
    }
}
