//! Tolerant JSON extraction and parsing for structured responses.

use serde::de::DeserializeOwned;
use tracing::warn;

use super::{Operation, RequestError};

/// Characters of raw model output kept in logs for a malformed response.
const RAW_PREVIEW_CHARS: usize = 500;

/// Extract a JSON object from potentially noisy model output.
///
/// Handles:
/// - Pure JSON responses
/// - JSON wrapped in markdown code fences
/// - JSON embedded in prose
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') {
        if let Some(end) = find_matching_brace(trimmed) {
            return &trimmed[..end];
        }
    }

    if let Some(start) = trimmed.find('{') {
        let remainder = &trimmed[start..];
        if let Some(end) = find_matching_brace(remainder) {
            return &remainder[..end];
        }
    }

    trimmed
}

/// Find the byte offset just past the brace closing the object that opens at
/// offset 0. Braces inside `"..."` are not counted.
fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' && in_string {
            escape = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match c {
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

/// Parse a structured response, logging the raw text when it does not fit `T`.
pub(crate) fn parse_structured<T: DeserializeOwned>(
    operation: Operation,
    raw: &str,
) -> Result<T, RequestError> {
    serde_json::from_str(extract_json(raw)).map_err(|e| {
        let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        warn!(
            operation = operation.as_str(),
            error = %e,
            raw = %preview,
            "malformed structured response"
        );
        RequestError::MalformedResponse {
            operation,
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Shape {
        x: i64,
    }

    #[test]
    fn pure_json_passes_through() {
        let input = r#"{"recommended": "XGBoost", "options": []}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let input = "```json\n{\"x\": 1}\n```";
        assert_eq!(extract_json(input), "{\"x\": 1}");
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let wrapped = r#"Sure: {"desc": "a {b} c", "x": 2} done"#;
        assert_eq!(extract_json(wrapped), r#"{"desc": "a {b} c", "x": 2}"#);

        let escaped = r#"{"title": "say \"}\" twice"}"#;
        assert_eq!(extract_json(escaped), escaped);
    }

    #[test]
    fn parse_structured_reports_operation() {
        let ok: Shape = parse_structured(Operation::GenerateMetrics, "{\"x\": 4}").unwrap();
        assert_eq!(ok.x, 4);

        let err = parse_structured::<Shape>(Operation::GenerateMetrics, "not json").unwrap_err();
        match err {
            RequestError::MalformedResponse { operation, .. } => {
                assert_eq!(operation, Operation::GenerateMetrics)
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }
}
