use crate::utils::error::{AnalysisError, Result};
use serde_json::Value;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Extracts the `response` text from a non-streaming `/api/generate` body.
/// JSON string escapes (`\n`, `\"`, `\uXXXX`) are decoded by the parser.
pub fn parse_generate_response(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body).map_err(|e| AnalysisError::NoResponseField {
        detail: format!("body is not valid JSON ({})", e),
    })?;

    match value.get("response") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(AnalysisError::NoResponseField {
            detail: format!("`response` is {}, expected a string", json_kind(other)),
        }),
        None => {
            let detail = match value.get("error").and_then(Value::as_str) {
                Some(err) => format!("server reported an error: {}", err),
                None => "no `response` field in the server reply".to_string(),
            };
            Err(AnalysisError::NoResponseField { detail })
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Removes `<think>...</think>` reasoning blocks emitted by thinking models.
/// A leading `</think>` without an opening tag drops everything before it,
/// and an unclosed `<think>` drops everything after it.
pub fn strip_thinking(text: &str) -> String {
    let mut rest = text;

    if let Some(close) = rest.find(THINK_CLOSE) {
        let opens_first = rest.find(THINK_OPEN).is_some_and(|open| open < close);
        if !opens_first {
            rest = &rest[close + THINK_CLOSE.len()..];
        }
    }

    let mut out = String::with_capacity(rest.len());
    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(end) => rest = &after_open[end + THINK_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Splits on `\r\n`, `\n` or `\r`. Trailing blank lines are dropped.
pub fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect();

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_escaped_newline() {
        let text = parse_generate_response(r#"{"response":"A\nB","done":true}"#).unwrap();
        assert_eq!(text, "A\nB");
        assert_eq!(split_lines(&text), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_escaped_quotes_and_unicode() {
        let text =
            parse_generate_response(r#"{"model":"llama2","response":"say \"hi\" é","done":true}"#)
                .unwrap();
        assert_eq!(text, "say \"hi\" é");
    }

    #[test]
    fn test_missing_field_is_no_response_error() {
        let err = parse_generate_response(r#"{"done":true}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::NoResponseField { .. }));
    }

    #[test]
    fn test_server_error_body_is_reported() {
        let err = parse_generate_response(r#"{"error":"model 'x' not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model 'x' not found"));
    }

    #[test]
    fn test_malformed_json_is_no_response_error() {
        for body in ["", "<html>502 Bad Gateway</html>", r#"{"response": "#] {
            let err = parse_generate_response(body).unwrap_err();
            assert!(matches!(err, AnalysisError::NoResponseField { .. }), "{}", body);
        }
    }

    #[test]
    fn test_non_string_response_is_rejected() {
        let err = parse_generate_response(r#"{"response":42}"#).unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_strip_thinking_blocks() {
        assert_eq!(
            strip_thinking("<think>\nlet me look\n</think>\n\nSales rise in Q4."),
            "Sales rise in Q4."
        );
        assert_eq!(
            strip_thinking("Intro <think>a</think>middle<think>b</think> end"),
            "Intro middle end"
        );
        assert_eq!(strip_thinking("reasoning only</think>Answer"), "Answer");
        assert_eq!(strip_thinking("Answer<think>cut off"), "Answer");
        assert_eq!(strip_thinking("plain text"), "plain text");
        assert_eq!(strip_thinking("<think>never closed"), "");
    }

    #[test]
    fn test_split_lines_handles_all_breaks() {
        assert_eq!(split_lines("a\r\nb\rc\nd\n\n"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }
}
