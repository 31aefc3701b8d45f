//! Tolerant parsing of free-form model replies.
//!
//! Models wrap their JSON in prose or code fences. The reply is scanned for
//! the first balanced `{...}` span; braces inside string literals are
//! ignored.

use chrono::NaiveDate;
use serde_json::Value;

use super::ExtractionError;
use crate::order::NewOrder;

/// Returns the first balanced `{...}` span of `text`.
///
/// Scanning starts at each `{` in order; a start whose braces never close is
/// skipped in favor of the next one.
pub fn find_json_object(text: &str) -> Option<&str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

/// Byte length of the balanced object at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a model reply into a candidate order, defaulting missing fields.
pub fn parse_reply(text: &str, today: NaiveDate) -> Result<NewOrder, ExtractionError> {
    let span = find_json_object(text).ok_or(ExtractionError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(ExtractionError::NoJsonObject)?;
    Ok(NewOrder::from_json_object(object, today))
}
