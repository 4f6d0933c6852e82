use std::collections::HashSet;

/// Strips all HTML tags from a string, leaving only the plain text content.
/// ammonia re-escapes the text it keeps, so entities are decoded back to plain characters.
pub fn strip_all_html(input: &str) -> String {
    let cleaned = ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).into_owned()
}

/// Cleaned and trimmed text, or `None` when nothing is left.
pub fn clean_text(input: &str) -> Option<String> {
    let cleaned = strip_all_html(input.trim());
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
