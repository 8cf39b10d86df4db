//! Sitemap `loc` extraction

use regex::Regex;
use std::sync::OnceLock;

/// Returns every `<loc>` text value of a sitemap or sitemap index
///
/// Namespace prefixes (`<sm:loc>`) and CDATA sections are tolerated and the
/// predefined XML entities are unescaped. Empty values are skipped.
pub fn extract_loc_values(xml: &str) -> Vec<String> {
    static LOC: OnceLock<Regex> = OnceLock::new();
    let loc = LOC.get_or_init(|| {
        Regex::new(r"(?is)<(?:[a-z_][\w.-]*:)?loc\b[^>]*>(.*?)</(?:[a-z_][\w.-]*:)?loc\s*>")
            .expect("valid regex")
    });

    loc.captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_xml(strip_cdata(m.as_str().trim()).trim()))
        .filter(|value| !value.is_empty())
        .collect()
}

fn strip_cdata(value: &str) -> &str {
    value
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(value)
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
