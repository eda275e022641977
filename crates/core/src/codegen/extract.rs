/// Strip Markdown code fences wrapping a model response.
///
/// Removes an opening fence line (three backticks plus an optional language
/// tag) and a closing fence line, then trims. Text without fences comes back
/// trimmed but otherwise unchanged, so the function is idempotent.
pub fn strip_code_fences(response: &str) -> String {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        match rest.split_once('\n') {
            Some((tag, body)) if is_language_tag(tag) => text = body,
            None if is_language_tag(rest) => text = "",
            _ => {}
        }
    }

    let trimmed = text.trim_end();
    if let Some(body) = trimmed.strip_suffix("```") {
        if body.is_empty() || body.ends_with('\n') {
            text = body;
        }
    }

    text.trim().to_string()
}

fn is_language_tag(tag: &str) -> bool {
    tag.trim_end()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.' | '#'))
}
