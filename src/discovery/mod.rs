//! Country and university discovery
//!
//! Countries come from one of three sources, tried in order:
//! - the country dropdown on the listing page (`country-source = "dropdown"`)
//! - LLM-proposed country filters, each validated by navigating to it
//! - the fixed `[[country]]` list from the configuration
//!
//! Universities are the anchors of a country listing whose URL matches the
//! university pattern, with the site sitemap as fallback when the listing
//! yields nothing. Navigation failures are logged and count as zero items.

mod countries;
mod sitemap;
mod universities;

pub use countries::{
    code_from_url, countries_from_dropdown, country_from_navigation, country_url,
    fixed_countries, parse_filter_candidates, FilterCandidate, COUNTRY_FILTER_PROMPT,
};
pub use sitemap::extract_loc_values;
pub use universities::{universities_from_links, universities_from_urls};

use crate::config::{Config, CountryEntry, CountrySource, SiteConfig};
use crate::llm::{truncate_to_char_boundary, LlmClient};
use crate::page::{resolve_link, strip_noise_html, PageClient};
use crate::record::{CountryRef, UniversityRef};
use crate::{ConfigError, Result};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Finds countries and university pages on the listing site
pub struct LinkDiscoverer {
    site: SiteConfig,
    source: CountrySource,
    fixed: Vec<CountryEntry>,
    max_universities: Option<usize>,
    html_limit: usize,
    country_pattern: Regex,
    university_pattern: Regex,
}

impl LinkDiscoverer {
    /// Creates a discoverer, compiling the configured URL patterns
    pub fn new(config: &Config) -> Result<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ConfigError::InvalidPattern(format!("Invalid {}: {}", name, e)))
        };

        Ok(Self {
            country_pattern: compile("country-url-pattern", &config.site.country_url_pattern)?,
            university_pattern: compile("university-pattern", &config.site.university_pattern)?,
            site: config.site.clone(),
            source: config.discovery.country_source,
            fixed: config.countries.clone(),
            max_universities: config.discovery.max_universities_per_country,
            html_limit: config.ai.html_limit,
        })
    }

    /// Absolute URL of the listing page
    pub fn listing_url(&self) -> String {
        format!(
            "{}{}",
            self.site.base_url.trim_end_matches('/'),
            self.site.listing_path
        )
    }

    /// Discovers the countries to scrape
    ///
    /// # Arguments
    ///
    /// * `page` - The page session
    /// * `llm` - LLM used for the AI fallback, if available
    ///
    /// # Returns
    ///
    /// The countries in discovery order, deduplicated by code. Empty when
    /// every source fails.
    pub async fn discover_countries(
        &self,
        page: &mut dyn PageClient,
        llm: Option<&dyn LlmClient>,
    ) -> Vec<CountryRef> {
        let mut countries = Vec::new();

        if self.source != CountrySource::Fixed {
            let listing_url = self.listing_url();

            match page.load(&listing_url).await {
                Ok(()) => {
                    if self.source == CountrySource::Dropdown {
                        countries = self.dropdown_countries(page);
                    }

                    if countries.is_empty() {
                        match llm {
                            Some(llm) => {
                                countries = self.ai_countries(page, llm, &listing_url).await;
                            }
                            None => tracing::info!(
                                "No LLM available, skipping AI country discovery"
                            ),
                        }
                    }
                }
                Err(e) => tracing::warn!("Failed to load listing page {}: {}", listing_url, e),
            }
        }

        if countries.is_empty() && !self.fixed.is_empty() {
            tracing::info!("Using {} configured countries", self.fixed.len());
            countries = fixed_countries(&self.fixed, &self.site);
        }

        tracing::info!("Discovered {} countries", countries.len());
        countries
    }

    fn dropdown_countries(&self, page: &dyn PageClient) -> Vec<CountryRef> {
        let html = match page.current_html() {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("No listing HTML available: {}", e);
                return Vec::new();
            }
        };

        let countries = countries_from_dropdown(&html, &self.site, &self.country_pattern);
        tracing::info!("Country dropdown yielded {} countries", countries.len());
        countries
    }

    /// Asks the LLM for country filters and keeps those that navigate somewhere
    async fn ai_countries(
        &self,
        page: &mut dyn PageClient,
        llm: &dyn LlmClient,
        listing_url: &str,
    ) -> Vec<CountryRef> {
        let html = match page.current_html() {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("No listing HTML available for AI discovery: {}", e);
                return Vec::new();
            }
        };

        let cleaned = strip_noise_html(&html);
        let snippet = truncate_to_char_boundary(&cleaned, self.html_limit);
        let user = format!("Listing page URL: {}\n\nHTML:\n{}", listing_url, snippet);

        let reply = match llm.complete(COUNTRY_FILTER_PROMPT, &user).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("AI country discovery failed: {}", e);
                return Vec::new();
            }
        };

        let Some(candidates) = parse_filter_candidates(&reply) else {
            tracing::warn!("AI country discovery returned malformed JSON");
            return Vec::new();
        };

        tracing::info!("AI proposed {} country filter candidates", candidates.len());

        let base = page
            .current_url()
            .unwrap_or_else(|| listing_url.to_string());
        let Ok(base_url) = Url::parse(&base) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut countries = Vec::new();

        for candidate in &candidates {
            let navigated = match candidate.url.as_deref().and_then(|u| resolve_link(u, &base_url)) {
                Some(target) => page.load(&target).await,
                None => page.click(candidate.selector.trim()).await,
            };

            match navigated {
                Ok(()) => {
                    let landed = page.current_url().unwrap_or_default();
                    if landed.is_empty() || landed == base {
                        tracing::debug!(
                            "Candidate '{}' did not change the page URL",
                            candidate.selector
                        );
                    } else if let Some(country) =
                        country_from_navigation(&landed, candidate, &self.country_pattern)
                    {
                        if seen.insert(country.code.clone()) {
                            tracing::debug!("Accepted country {} ({})", country.name, country.code);
                            countries.push(country);
                        }
                    }
                }
                Err(e) => tracing::debug!("Candidate '{}' failed: {}", candidate.selector, e),
            }

            // Back to the listing so the next selector applies to the right document
            if page.current_url().as_deref() != Some(base.as_str()) {
                if let Err(e) = page.load(listing_url).await {
                    tracing::warn!("Failed to reload listing page: {}", e);
                    break;
                }
            }
        }

        tracing::info!("AI country discovery accepted {} countries", countries.len());
        countries
    }

    /// Discovers the university pages of a country
    ///
    /// Falls back to the sitemap when the country listing has no matching
    /// links. The result is capped by `max-universities-per-country`.
    pub async fn discover_universities(
        &self,
        page: &mut dyn PageClient,
        country: &CountryRef,
    ) -> Vec<UniversityRef> {
        let mut universities = match page.load(&country.source_url).await {
            Ok(()) => match page.find_links(&self.university_pattern) {
                Ok(links) => {
                    universities_from_links(&links, &self.university_pattern, &country.code)
                }
                Err(e) => {
                    tracing::warn!("Failed to read links of {}: {}", country.source_url, e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", country.source_url, e);
                Vec::new()
            }
        };

        if universities.is_empty() {
            tracing::info!(
                "No university links on {}, trying sitemap",
                country.source_url
            );
            universities = self.sitemap_universities(&*page, &country.code).await;
        }

        if let Some(max) = self.max_universities {
            universities.truncate(max);
        }

        tracing::info!(
            "Found {} universities for {}",
            universities.len(),
            country.name
        );
        universities
    }

    async fn sitemap_universities(
        &self,
        page: &dyn PageClient,
        country_code: &str,
    ) -> Vec<UniversityRef> {
        let sitemap_url = format!(
            "{}{}",
            self.site.base_url.trim_end_matches('/'),
            self.site.sitemap_path
        );

        match page.fetch_document(&sitemap_url).await {
            Ok(xml) => {
                let locs = extract_loc_values(&xml);
                let universities = universities_from_urls(
                    &locs,
                    &self.university_pattern,
                    country_code,
                    self.site.sitemap_limit,
                );
                tracing::info!(
                    "Sitemap listed {} URLs, {} universities",
                    locs.len(),
                    universities.len()
                );
                universities
            }
            Err(e) => {
                tracing::warn!("Failed to fetch sitemap {}: {}", sitemap_url, e);
                Vec::new()
            }
        }
    }
}
