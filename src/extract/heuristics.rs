//! Selector and regex based field extraction
//!
//! These helpers read a parsed document and never fail: a field that cannot
//! be found is simply absent and the caller applies its default.

use crate::page::normalize_whitespace;
use crate::record::Fee;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-normalized text of an element
pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// A labelled value from the page's quick-facts area
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub value: String,
    /// First link inside the value, if any
    pub href: Option<String>,
}

/// Label/value pairs gathered from 2-cell table rows, `dt`/`dd` pairs and
/// `Label: value` list items
#[derive(Debug, Clone, Default)]
pub struct QuickFacts {
    facts: Vec<(String, Fact)>,
}

impl QuickFacts {
    pub fn from_document(document: &Html) -> Self {
        let mut facts = Vec::new();

        if let Some(rows) = selector("tr") {
            for row in document.select(&rows) {
                let cells: Vec<ElementRef<'_>> = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                    .collect();

                if let [label, value] = cells.as_slice() {
                    push_fact(&mut facts, &element_text(label), value);
                }
            }
        }

        if let Some(terms) = selector("dt") {
            for term in document.select(&terms) {
                let definition = term
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .next()
                    .filter(|sibling| sibling.value().name() == "dd");

                if let Some(definition) = definition {
                    push_fact(&mut facts, &element_text(&term), &definition);
                }
            }
        }

        if let (Some(items), Some(nested)) = (selector("li"), selector("li")) {
            for item in document.select(&items) {
                if item.select(&nested).next().is_some() {
                    continue;
                }

                let text = element_text(&item);
                if let Some((label, value)) = text.split_once(':') {
                    let label = label.trim();
                    let value = value.trim();
                    if !label.is_empty() && label.len() <= 40 && !value.is_empty() {
                        facts.push((
                            normalize_label(label),
                            Fact {
                                value: value.to_string(),
                                href: first_href(&item),
                            },
                        ));
                    }
                }
            }
        }

        Self { facts }
    }

    /// First fact whose label equals one of `labels` (case-insensitive)
    pub fn get(&self, labels: &[&str]) -> Option<&Fact> {
        self.facts
            .iter()
            .find(|(label, fact)| !fact.value.is_empty() && labels.contains(&label.as_str()))
            .map(|(_, fact)| fact)
    }
}

fn push_fact(facts: &mut Vec<(String, Fact)>, label: &str, value: &ElementRef<'_>) {
    let label = normalize_label(label);
    if label.is_empty() {
        return;
    }
    facts.push((
        label,
        Fact {
            value: element_text(value),
            href: first_href(value),
        },
    ));
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}

fn first_href(element: &ElementRef<'_>) -> Option<String> {
    let anchors = selector("a[href]")?;
    element
        .select(&anchors)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Text of the first non-empty element matching `css`
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    let parsed = selector(css)?;
    document
        .select(&parsed)
        .map(|element| element_text(&element))
        .find(|text| !text.is_empty())
}

/// `content` of the first `<meta>` whose `name` or `property` is one of `names`
pub fn meta_content(document: &Html, names: &[&str]) -> Option<String> {
    let metas = selector("meta[content]")?;
    for name in names {
        for meta in document.select(&metas) {
            let attrs = meta.value();
            let key = attrs.attr("name").or_else(|| attrs.attr("property"));
            if key.is_some_and(|key| key.eq_ignore_ascii_case(name)) {
                let content = attrs.attr("content").unwrap_or_default().trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }
    }
    None
}

/// First part of a `City, Country` location value
pub fn city_from_location(location: &str) -> Option<String> {
    location
        .split(',')
        .next()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(str::to_string)
}

/// First description-like element longer than `min_length` characters
pub fn description(document: &Html, min_length: usize) -> Option<String> {
    let parsed = selector("[class*=description], [id*=description], .about, #about")?;
    document
        .select(&parsed)
        .map(|element| element_text(&element))
        .find(|text| text.chars().count() > min_length)
}

/// Elements whose id/class contains `keyword`, plus the parents of headings
/// mentioning it, in document order without duplicates
fn sections<'a>(document: &'a Html, keyword: &str) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    if let Some(marked) = selector(&format!("[id*={k}], [class*={k}]", k = keyword)) {
        for element in document.select(&marked) {
            if seen.insert(element.id()) {
                found.push(element);
            }
        }
    }

    if let Some(headings) = selector("h1, h2, h3, h4, h5, h6") {
        for heading in document.select(&headings) {
            if !element_text(&heading).to_lowercase().contains(keyword) {
                continue;
            }
            if let Some(parent) = heading.parent().and_then(ElementRef::wrap) {
                if seen.insert(parent.id()) {
                    found.push(parent);
                }
            }
        }
    }

    found
}

/// Row texts inside a section; the whole section when it has no rows
fn section_rows(section: &ElementRef<'_>) -> Vec<String> {
    let rows: Vec<String> = selector("tr, li, p, dd")
        .map(|rows| {
            section
                .select(&rows)
                .map(|row| element_text(&row))
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        vec![element_text(section)]
    } else {
        rows
    }
}

/// Tuition fees keyed by study level (`general` when no level is named)
pub fn tuition_fees(document: &Html) -> BTreeMap<String, Fee> {
    let mut fees = BTreeMap::new();
    for section in sections(document, "tuition") {
        for row in section_rows(&section) {
            if let Some(fee) = parse_fee(&row) {
                fees.entry(fee_level(&row).to_string()).or_insert(fee);
            }
        }
    }
    fees
}

/// Rankings keyed by source
pub fn rankings(document: &Html) -> BTreeMap<String, u32> {
    let mut ranks = BTreeMap::new();
    for section in sections(document, "rank") {
        for row in section_rows(&section) {
            if let (Some(source), Some(rank)) = (ranking_source(&row), parse_rank(&row)) {
                ranks.entry(source.to_string()).or_insert(rank);
            }
        }
    }
    ranks
}

/// Parses an amount, currency and period out of a fee text
///
/// A currency marker is required. Four-digit years are skipped when another
/// amount is present.
pub fn parse_fee(text: &str) -> Option<Fee> {
    let currency = parse_currency(text)?;

    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    let amounts: Vec<(f64, bool)> = cached(&AMOUNT, r"\d[\d,]*(?:\.\d+)?")
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str().trim_end_matches(',');
            let value: f64 = raw.replace(',', "").parse().ok()?;
            Some((value, is_year(raw)))
        })
        .collect();

    let amount = amounts
        .iter()
        .find(|(_, year)| !year)
        .or_else(|| amounts.first())
        .map(|(value, _)| *value)?;

    let lower = text.to_lowercase();
    let period = if lower.contains("semester") {
        "semester"
    } else if lower.contains("month") {
        "month"
    } else {
        "year"
    };

    Some(Fee {
        amount,
        currency: currency.to_string(),
        period: period.to_string(),
    })
}

fn parse_currency(text: &str) -> Option<&'static str> {
    static CODE: OnceLock<Regex> = OnceLock::new();
    if let Some(code) = cached(&CODE, r"\b(USD|EUR|GBP|TRY|CHF|CAD|AUD)\b")
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        return match code.as_str() {
            "USD" => Some("USD"),
            "EUR" => Some("EUR"),
            "GBP" => Some("GBP"),
            "TRY" => Some("TRY"),
            "CHF" => Some("CHF"),
            "CAD" => Some("CAD"),
            _ => Some("AUD"),
        };
    }

    if text.contains('$') {
        Some("USD")
    } else if text.contains('€') {
        Some("EUR")
    } else if text.contains('£') {
        Some("GBP")
    } else if text.contains('₺') {
        Some("TRY")
    } else {
        None
    }
}

fn is_year(raw: &str) -> bool {
    raw.len() == 4
        && raw
            .parse::<u32>()
            .map(|value| (1900..=2100).contains(&value))
            .unwrap_or(false)
}

/// Study level named in a fee row
pub fn fee_level(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("bachelor") || lower.contains("undergraduate") {
        "bachelor"
    } else if lower.contains("doctor") || lower.contains("phd") || lower.contains("ph.d") {
        "doctorate"
    } else if lower.contains("master") || lower.contains("graduate") {
        "master"
    } else {
        "general"
    }
}

/// Ranking source named in a row, as a record key
pub fn ranking_source(text: &str) -> Option<&'static str> {
    static SOURCES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let sources = SOURCES.get_or_init(|| {
        [
            (r"\bQS\b", "QS_World_University_Rankings"),
            (r"Times Higher|\bTHE\b", "THE_Ranking"),
            (r"\bARWU\b|(?i:shanghai)", "ARWU"),
            (r"(?i)\bU\.?\s?S\.?\s+News\b", "US_News"),
        ]
        .into_iter()
        .map(|(pattern, key)| (Regex::new(pattern).expect("valid regex"), key))
        .collect()
    });

    sources
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, key)| *key)
}

/// First number in a ranking row that is not a year
pub fn parse_rank(text: &str) -> Option<u32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    cached(&NUMBER, r"\d+")
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|raw| !is_year(raw))
        .find_map(|raw| raw.parse().ok())
}

/// Item range shown by a pagination marker such as `Items 1-10 of 86`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl PaginationRange {
    pub fn is_last(&self) -> bool {
        self.end >= self.total
    }
}

/// First pagination marker in `text`
pub fn pagination_range(text: &str) -> Option<PaginationRange> {
    static ITEMS: OnceLock<Regex> = OnceLock::new();
    let caps = cached(&ITEMS, r"(?i)\bitems?\s+(\d+)\s*[-–]\s*(\d+)\s+of\s+(\d+)").captures(text)?;
    let number = |index: usize| caps.get(index)?.as_str().parse::<usize>().ok();

    Some(PaginationRange {
        start: number(1)?,
        end: number(2)?,
        total: number(3)?,
    })
}

/// Total from a pagination marker such as `Items 1-10 of 86`
pub fn expected_program_count(text: &str) -> Option<usize> {
    pagination_range(text)
        .map(|range| range.total)
        .filter(|count| *count > 0)
}
