//! Link extraction for the current page

use super::text::normalize_whitespace;
use super::PageLink;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Returns the anchors of `html` whose absolute URL matches `pattern`
///
/// Links are resolved against `base_url`; anchors with a `download`
/// attribute and non-HTTP schemes are skipped. Order follows the document
/// and duplicates are kept, so callers decide how to deduplicate.
///
/// # Example
///
/// ```
/// use regex::Regex;
/// use unipage_scout::page::find_links_matching;
///
/// let html = r#"<a href="/en/42/bilkent">Bilkent</a><a href="/about">About</a>"#;
/// let pattern = Regex::new(r"/en/(\d+)/").unwrap();
/// let links = find_links_matching(html, "https://example.com/", &pattern);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].href, "https://example.com/en/42/bilkent");
/// ```
pub fn find_links_matching(html: &str, base_url: &str, pattern: &Regex) -> Vec<PageLink> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(absolute) = resolve_link(href, &base) {
            if pattern.is_match(&absolute) {
                links.push(PageLink {
                    href: absolute,
                    text: normalize_whitespace(&element.text().collect::<String>()),
                });
            }
        }
    }

    links
}

/// Absolute http(s) URL for `href`, or `None` for script, mail, data and
/// fragment-only links
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    const SKIPPED_SCHEMES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}
