use crate::config::{CountryEntry, SiteConfig};
use crate::page::{normalize_whitespace, slugify, title_from_slug};
use crate::record::CountryRef;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;

/// Option texts that label the dropdown rather than name a country
const PLACEHOLDER_VALUES: &[&str] = &["0", "-", "all", "any", "none", "select", "choose"];

/// System prompt for locating country filters on the listing page
pub const COUNTRY_FILTER_PROMPT: &str = r#"You are analyzing the HTML of a university listing page.
Find the elements that filter the listing by country: dropdown options, country links or buttons.

Return ONLY a JSON array, with no commentary, where each item is:
{"selector": "a valid CSS selector for the element", "url": "the URL it navigates to, if visible in the HTML", "text": "the country name"}

Rules:
- Only use valid CSS selectors (no "or", no pseudo-text matching)
- Include one item per country you can find
- Return [] if there is no country filter"#;

/// A country filter candidate proposed by the LLM
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterCandidate {
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Absolute URL of a country listing for `code`
pub fn country_url(site: &SiteConfig, code: &str) -> String {
    format!(
        "{}{}",
        site.base_url.trim_end_matches('/'),
        site.country_url_template.replace("{code}", code)
    )
}

/// Reads country options from the listing page dropdown
///
/// Option values may be bare codes (`turkey`) or country URLs/paths, in
/// which case `country_pattern` extracts the code. Empty and placeholder
/// options are skipped; countries are deduplicated by code.
pub fn countries_from_dropdown(
    html: &str,
    site: &SiteConfig,
    country_pattern: &Regex,
) -> Vec<CountryRef> {
    let Ok(selector) = Selector::parse(&site.country_dropdown_selector) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut countries = Vec::new();

    for option in document.select(&selector) {
        let value = option.value().attr("value").unwrap_or_default().trim();
        let text = normalize_whitespace(&option.text().collect::<String>());

        if value.is_empty() || is_placeholder(value) || is_placeholder(&text) {
            continue;
        }

        let code = if value.contains('/') {
            match code_from_url(value, country_pattern) {
                Some(code) => code,
                None => continue,
            }
        } else {
            value.to_lowercase()
        };

        if code.is_empty() || !seen.insert(code.clone()) {
            continue;
        }

        let name = if text.is_empty() {
            title_from_slug(&code)
        } else {
            text
        };

        countries.push(CountryRef {
            name,
            source_url: country_url(site, &code),
            code,
        });
    }

    countries
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    PLACEHOLDER_VALUES.contains(&lower.as_str())
        || lower.starts_with("select ")
        || lower.starts_with("choose ")
        || lower.starts_with("all countries")
}

/// Extracts the country code from a country listing URL
pub fn code_from_url(url: &str, country_pattern: &Regex) -> Option<String> {
    country_pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|code| !code.is_empty())
}

/// Parses the LLM reply into filter candidates; `None` when malformed
pub fn parse_filter_candidates(reply: &str) -> Option<Vec<FilterCandidate>> {
    let value = crate::llm::extract_json_array(reply)?;
    let items = value.as_array()?;

    // Items that do not fit the shape are skipped rather than failing the batch
    Some(
        items
            .iter()
            .filter_map(|item| serde_json::from_value::<FilterCandidate>(item.clone()).ok())
            .filter(|candidate| {
                !candidate.selector.trim().is_empty()
                    || candidate.url.as_deref().is_some_and(|u| !u.trim().is_empty())
            })
            .collect(),
    )
}

/// Builds a country from a candidate whose navigation changed the page URL
pub fn country_from_navigation(
    landed_url: &str,
    candidate: &FilterCandidate,
    country_pattern: &Regex,
) -> Option<CountryRef> {
    let text = candidate
        .text
        .as_deref()
        .map(normalize_whitespace)
        .unwrap_or_default();

    let code = code_from_url(landed_url, country_pattern).or_else(|| {
        let slug = slugify(&text);
        (!slug.is_empty()).then_some(slug)
    })?;

    let name = if text.is_empty() {
        title_from_slug(&code)
    } else {
        text
    };

    Some(CountryRef {
        name,
        code,
        source_url: landed_url.to_string(),
    })
}

/// Countries from the configured fixed list
pub fn fixed_countries(entries: &[CountryEntry], site: &SiteConfig) -> Vec<CountryRef> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.code.clone()))
        .map(|entry| CountryRef {
            name: entry.name.clone(),
            code: entry.code.clone(),
            source_url: country_url(site, &entry.code),
        })
        .collect()
}
