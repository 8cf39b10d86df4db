use crate::page::{title_from_slug, PageLink};
use crate::record::UniversityRef;
use regex::Regex;
use std::collections::HashSet;

/// Turns matching anchors into university references
///
/// Capture 1 of `pattern` is the id and capture 2 the slug. References are
/// deduplicated by URL and keep first-seen order; the anchor text is the
/// name, falling back to a title built from the slug.
pub fn universities_from_links(
    links: &[PageLink],
    pattern: &Regex,
    country_code: &str,
) -> Vec<UniversityRef> {
    let mut seen = HashSet::new();
    let mut universities = Vec::new();

    for link in links {
        if !seen.insert(link.href.as_str()) {
            continue;
        }

        if let Some(university) = university_ref(&link.href, &link.text, pattern, country_code) {
            universities.push(university);
        }
    }

    universities
}

/// University references from sitemap URLs, capped at `limit` matches
pub fn universities_from_urls(
    urls: &[String],
    pattern: &Regex,
    country_code: &str,
    limit: usize,
) -> Vec<UniversityRef> {
    let mut seen = HashSet::new();
    let mut universities = Vec::new();

    for url in urls {
        if universities.len() >= limit {
            break;
        }

        if !seen.insert(url.as_str()) {
            continue;
        }

        if let Some(university) = university_ref(url, "", pattern, country_code) {
            universities.push(university);
        }
    }

    universities
}

fn university_ref(url: &str, text: &str, pattern: &Regex, country_code: &str) -> Option<UniversityRef> {
    let caps = pattern.captures(url)?;
    let id = caps.get(1)?.as_str().to_string();
    let slug = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let name = if text.trim().is_empty() {
        title_from_slug(slug)
    } else {
        text.trim().to_string()
    };

    Some(UniversityRef {
        id,
        name,
        url: url.to_string(),
        country_code: country_code.to_string(),
    })
}
