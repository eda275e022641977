//! Small string helpers shared by the transformation modules.

/// Return at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
