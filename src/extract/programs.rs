//! Heuristic study program discovery
//!
//! Program pages are linked from the university page with `/programs/` in
//! their URL. The level comes from keywords in the link text or URL (or the
//! enclosing block), the faculty from the nearest enclosing block whose id
//! or class mentions a faculty.

use super::heuristics::element_text;
use crate::record::{CatalogProgram, ProgramCatalog};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Study level named in `text`, as a catalog level
pub fn program_level(text: &str) -> Option<&'static str> {
    static ABBREVIATIONS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

    let lower = text.to_lowercase();
    if lower.contains("bachelor") || lower.contains("undergraduate") {
        return Some("Bachelor");
    }
    if lower.contains("doctor") || lower.contains("phd") {
        return Some("Doctorate");
    }
    if lower.contains("master") {
        return Some("Master");
    }

    let abbreviations = ABBREVIATIONS.get_or_init(|| {
        [
            (r"\b(?:BSc|BA|BEng|BBA|LLB)\b", "Bachelor"),
            (r"\b(?:MSc|MA|MBA|MEng|LLM)\b", "Master"),
        ]
        .into_iter()
        .map(|(pattern, level)| (Regex::new(pattern).expect("valid regex"), level))
        .collect()
    });

    abbreviations
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, level)| *level)
}

/// Programs linked from the page, grouped by level and faculty
pub fn heuristic_programs(document: &Html) -> ProgramCatalog {
    let mut catalog = ProgramCatalog::new();
    let Ok(anchors) = Selector::parse(r#"a[href*="/programs/"]"#) else {
        return catalog;
    };

    for anchor in document.select(&anchors) {
        let name = element_text(&anchor);
        if name.is_empty() {
            continue;
        }

        let href = anchor.value().attr("href").unwrap_or_default();
        let level = program_level(&name)
            .or_else(|| program_level(href))
            .or_else(|| enclosing_level(&anchor))
            .unwrap_or("Unknown");
        let faculty = enclosing_faculty(&anchor).unwrap_or_else(|| "General".to_string());

        catalog.insert(level, &faculty, CatalogProgram::named(name));
    }

    catalog
}

fn marker(element: &ElementRef<'_>) -> String {
    let attrs = element.value();
    format!(
        "{} {} {}",
        attrs.id().unwrap_or_default(),
        attrs.attr("class").unwrap_or_default(),
        attrs.attr("data-level").unwrap_or_default()
    )
}

fn enclosing_level(anchor: &ElementRef<'_>) -> Option<&'static str> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| program_level(&marker(&ancestor)))
}

fn enclosing_faculty(anchor: &ElementRef<'_>) -> Option<String> {
    let headings = Selector::parse("h2, h3, h4, h5, .faculty-name").ok()?;

    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| marker(ancestor).to_lowercase().contains("faculty"))
        .and_then(|block| {
            block
                .select(&headings)
                .map(|heading| element_text(&heading))
                .find(|text| !text.is_empty())
        })
}
