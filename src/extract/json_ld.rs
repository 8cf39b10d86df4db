//! JSON-LD lookups for organization/university metadata

use scraper::{Html, Selector};
use serde_json::Value;

/// Organization fields found in `application/ld+json` blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdOrganization {
    pub locality: Option<String>,
    pub country: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

/// Collects organization fields from every JSON-LD block of the document
///
/// Blocks that fail to parse are ignored. `@graph` arrays and top-level
/// arrays are flattened; the first non-empty value of each field wins.
pub fn organization(document: &Html) -> JsonLdOrganization {
    let mut org = JsonLdOrganization::default();
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return org;
    };

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };

        for node in flatten_nodes(&value) {
            if org.locality.is_none() {
                org.locality = node
                    .get("address")
                    .and_then(first_address)
                    .and_then(|address| string_field(address, "addressLocality"));
            }
            if org.country.is_none() {
                org.country = node
                    .get("address")
                    .and_then(first_address)
                    .and_then(|address| address.get("addressCountry"))
                    .and_then(named_string);
            }
            if org.url.is_none() {
                org.url = string_field(node, "url");
            }
            if org.description.is_none() {
                org.description = string_field(node, "description");
            }
        }
    }

    org
}

fn flatten_nodes(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten_nodes).collect(),
        Value::Object(map) => {
            let mut nodes = vec![value];
            if let Some(graph) = map.get("@graph") {
                nodes.extend(flatten_nodes(graph));
            }
            nodes
        }
        _ => Vec::new(),
    }
}

fn first_address(address: &Value) -> Option<&Value> {
    match address {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(address),
        _ => None,
    }
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A plain string, or the `name` of an object such as `{"@type": "Country", "name": "Turkey"}`
fn named_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => string_field(value, "name"),
        _ => None,
    }
}
