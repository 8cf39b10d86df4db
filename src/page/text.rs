//! Text helpers for turning page HTML into prompt-sized input

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;

/// Collapses every whitespace run into a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase slug: runs of non-alphanumeric characters become a single `_`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Human-readable title from a URL slug (`bilkent-university` → `Bilkent University`)
pub fn title_from_slug(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes `<script>`, `<style>`, `<noscript>` blocks and HTML comments
pub fn strip_noise_html(html: &str) -> String {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    let noise = NOISE.get_or_init(|| {
        Regex::new(
            r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<!--.*?-->",
        )
        .expect("valid regex")
    });
    noise.replace_all(html, "").into_owned()
}

/// Visible text of a document, whitespace-normalized
///
/// Text inside `script`, `style`, `noscript`, `template` and any element
/// named in `skip_tags` is dropped.
pub fn visible_text(html: &str, skip_tags: &[&str]) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_text(document.root_element(), skip_tags, &mut parts);
    normalize_whitespace(&parts.join(" "))
}

fn collect_text(element: ElementRef<'_>, skip_tags: &[&str], parts: &mut Vec<String>) {
    let tag = element.value().name();
    if matches!(tag, "script" | "style" | "noscript" | "template") || skip_tags.contains(&tag) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text.to_string()),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, skip_tags, parts);
                }
            }
            _ => {}
        }
    }
}
