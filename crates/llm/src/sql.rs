//! Cleanup of model-generated SQL.

use peoplesay_engine::TranslationError;

/// Strip markdown fences and surrounding prose noise from a model answer
/// and check that what remains is a query.
///
/// Only shape is checked here; the read-only guard in the store decides
/// whether the statement may run.
pub fn clean_sql(raw: &str) -> Result<String, TranslationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TranslationError::EmptyOutput);
    }

    let body = fenced_block(text).unwrap_or(text).trim();
    let body = body
        .strip_prefix("SQL:")
        .or_else(|| body.strip_prefix("sql:"))
        .unwrap_or(body)
        .trim();

    if body.is_empty() {
        return Err(TranslationError::EmptyOutput);
    }
    if !body.to_ascii_uppercase().contains("SELECT") {
        return Err(TranslationError::Unparseable(preview(body)));
    }
    Ok(body.to_string())
}

/// Contents of the first ``` fence, language tag dropped.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let end = after.find("```").unwrap_or(after.len());
    let inner = &after[..end];

    match inner.find('\n') {
        // language tag runs to the end of the opening line
        Some(newline) => Some(&inner[newline + 1..]),
        // one-line fence: ```sql SELECT 1```
        None => Some(strip_language_tag(inner)),
    }
}

fn strip_language_tag(inner: &str) -> &str {
    let trimmed = inner.trim_start();
    let word_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let word = &trimmed[..word_end];
    if ["sql", "sqlite", "postgresql"].iter().any(|tag| word.eq_ignore_ascii_case(tag)) {
        &trimmed[word_end..]
    } else {
        trimmed
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
