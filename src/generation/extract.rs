//! Pull a JSON object out of free-form model output.
//!
//! Models wrap their answer in prose or code fences, so we scan for the first
//! brace-balanced span that parses as a JSON object. Brace matching is aware of
//! string literals and escapes, so braces inside `"body"` text don't confuse it.

use serde_json::{Map, Value};

/// Byte range of the balanced `{...}` span starting at `start`, if it closes.
fn balanced_span(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// The first balanced JSON object in `text`, parsed.
///
/// A balanced candidate that isn't valid JSON is skipped and scanning resumes
/// at the next opening brace.
pub fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    let mut from = 0;
    while let Some(rel) = text[from..].find('{') {
        let start = from + rel;
        if let Some(end) = balanced_span(text, start)
            && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..end])
        {
            return Some(map);
        }
        from = start + 1;
    }
    None
}
