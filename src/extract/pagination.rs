//! Program list pagination
//!
//! A university page lists only the first slice of its programs and shows a
//! marker such as `Items 1-10 of 86`. The remaining slices live on the
//! programs page (`site.programs-page-template`), numbered from 2.

use super::heuristics::{pagination_range, PaginationRange};
use crate::config::Config;
use crate::page::{visible_text, PageClient};

/// Reads the follow-on program list pages of a university
#[derive(Debug, Clone)]
pub struct ProgramPager {
    base_url: String,
    template: String,
    max_pages: u32,
}

impl ProgramPager {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.site.base_url.trim_end_matches('/').to_string(),
            template: config.site.programs_page_template.clone(),
            max_pages: config.extraction.max_program_pages,
        }
    }

    /// URL of program list page `page` for university `university_id`
    pub fn page_url(&self, university_id: &str, page: u32) -> String {
        let path = self
            .template
            .replace("{id}", university_id)
            .replace("{page}", &page.to_string());
        format!("{}{}", self.base_url, path)
    }

    /// Fetches program list pages 2.. after `first_html`
    ///
    /// Stops at the page whose range reaches the total, at `max-program-pages`,
    /// at a page without a marker (kept), at a page that does not advance the
    /// range (dropped), or at the first fetch error. Returns the extra pages in
    /// order; empty when the first page has no marker or is already complete.
    pub async fn collect(
        &self,
        page: &dyn PageClient,
        university_id: &str,
        first_html: &str,
    ) -> Vec<String> {
        let Some(mut range) = page_range(first_html) else {
            return Vec::new();
        };

        let mut pages = Vec::new();
        for number in 2..=self.max_pages {
            if range.is_last() {
                break;
            }

            let url = self.page_url(university_id, number);
            let html = match page.fetch_document(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Program page {} failed: {}", url, e);
                    break;
                }
            };

            match page_range(&html) {
                None => {
                    tracing::debug!("No pagination marker on {}", url);
                    pages.push(html);
                    break;
                }
                Some(next) if next.start <= range.end => {
                    tracing::debug!(
                        "Program page {} repeats items {}-{}, stopping",
                        number,
                        next.start,
                        next.end
                    );
                    break;
                }
                Some(next) => {
                    tracing::debug!(
                        "Program page {}: items {}-{} of {}",
                        number,
                        next.start,
                        next.end,
                        next.total
                    );
                    pages.push(html);
                    range = next;
                }
            }
        }

        if !pages.is_empty() {
            tracing::info!(
                "Read {} extra program pages for university {} ({} of {} items)",
                pages.len(),
                university_id,
                range.end.min(range.total),
                range.total
            );
        }

        pages
    }
}

fn page_range(html: &str) -> Option<PaginationRange> {
    pagination_range(&visible_text(html, &[]))
}
