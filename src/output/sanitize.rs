/// Maximum length of a sanitized path segment, in characters
pub const MAX_SEGMENT_CHARS: usize = 100;

/// Turns an arbitrary name into a safe single path segment
///
/// - `<>:"/\|?*`, control characters and whitespace become `_`
/// - runs of `_` collapse into one
/// - leading and trailing `_` and `.` are trimmed
/// - the result is capped at 100 characters
/// - an empty result becomes `Unknown`
///
/// # Example
///
/// ```
/// use unipage_scout::output::sanitize_segment;
///
/// assert_eq!(sanitize_segment("Bilkent University"), "Bilkent_University");
/// assert_eq!(sanitize_segment("Foo: Bar/Baz"), "Foo_Bar_Baz");
/// assert_eq!(sanitize_segment(".."), "Unknown");
/// ```
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars() {
        let mapped = if is_illegal(c) { '_' } else { c };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    let capped: String = trim_segment(&out).chars().take(MAX_SEGMENT_CHARS).collect();
    let cleaned = trim_segment(&capped);

    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
        || c.is_control()
        || c.is_whitespace()
}

fn trim_segment(segment: &str) -> &str {
    segment.trim_matches(|c| c == '_' || c == '.')
}
