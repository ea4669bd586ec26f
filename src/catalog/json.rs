//! Path-aware JSON decoding for catalog responses.
//!
//! Catalog pages are one long minified line holding hundreds of shows, so a
//! bare serde error ("line 1 column 48213") is useless. Decoding goes through
//! `serde_path_to_error` and failures carry the record path and a short excerpt
//! around the offending byte.

use std::fmt;

use serde::de::DeserializeOwned;

/// Characters of body shown on each side of the error position.
const EXCERPT_RADIUS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Serde path to the failing value, e.g. `[17].premiered`, or `.` at the root.
    pub path: String,
    pub reason: String,
    pub line: usize,
    pub column: usize,
    pub excerpt: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_empty() && self.path != "." {
            write!(f, "at '{}': ", self.path)?;
        }
        write!(
            f,
            "{} (line {} col {}) near `{}`",
            self.reason, self.line, self.column, self.excerpt
        )
    }
}

impl std::error::Error for DecodeError {}

/// Decode `body`, reporting the failing path and an excerpt on error.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, DecodeError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let (line, column) = (inner.line(), inner.column());

        let message = inner.to_string();
        let location = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&location).unwrap_or(&message);

        DecodeError {
            path,
            reason: describe_mismatch(message),
            line,
            column,
            excerpt: excerpt(body, line, column),
        }
    })
}

/// Turn serde's "invalid type: null, expected a string" into
/// "expected a string, got null". Other messages pass through.
fn describe_mismatch(message: &str) -> String {
    message
        .strip_prefix("invalid type: ")
        .and_then(|rest| rest.split_once(", expected "))
        .map(|(actual, expected)| format!("expected {expected}, got {actual}"))
        .unwrap_or_else(|| message.to_owned())
}

/// Up to `EXCERPT_RADIUS` chars either side of (`line`, `column`), both 1-based.
fn excerpt(body: &str, line: usize, column: usize) -> String {
    let Some(text) = body.lines().nth(line.saturating_sub(1)) else {
        return String::new();
    };

    // serde_json columns count bytes; snap to char boundaries.
    let at = column.saturating_sub(1).min(text.len());
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let pivot = chars.partition_point(|(i, _)| *i < at);
    let start = pivot.saturating_sub(EXCERPT_RADIUS);
    let end = (pivot + EXCERPT_RADIUS).min(chars.len());

    chars[start..end].iter().map(|(_, c)| c).collect::<String>().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::models::ShowRecord;

    #[test]
    fn test_describe_mismatch_reorders_serde_message() {
        assert_eq!(
            describe_mismatch("invalid type: null, expected a string"),
            "expected a string, got null"
        );
        assert_eq!(describe_mismatch("expected value"), "expected value");
    }

    #[test]
    fn test_null_name_reports_record_path() {
        let json = r#"[
            {"id": 1, "name": "Under the Dome", "premiered": "2013-06-24", "genres": ["Drama"]},
            {"id": 2, "name": null, "premiered": "2014-09-21", "genres": []}
        ]"#;

        let err = decode_json::<Vec<ShowRecord>>(json).unwrap_err();
        assert_eq!(err.path, "[1].name");
        assert_eq!(err.line, 3);
        assert!(err.reason.starts_with("expected a string"));
        assert!(err.to_string().contains("[1].name"));
    }

    #[test]
    fn test_bad_date_points_at_field() {
        let json = r#"[{"id": 3, "name": "Person of Interest", "premiered": "sometime"}]"#;
        let err = decode_json::<Vec<ShowRecord>>(json).unwrap_err();
        assert_eq!(err.path, "[0].premiered");
        assert!(err.excerpt.contains("sometime"));
    }

    #[test]
    fn test_excerpt_is_char_safe_on_minified_body() {
        let name = "Ünïcödé ".repeat(20);
        let json = format!(r#"[{{"id": 4, "name": "{name}", "genres": 7}}]"#);
        let err = decode_json::<Vec<ShowRecord>>(&json).unwrap_err();
        assert_eq!(err.path, "[0].genres");
        assert!(err.excerpt.contains("genres"));
    }

    #[test]
    fn test_malformed_body_has_no_path() {
        let err = decode_json::<Vec<ShowRecord>>("<html>502</html>").unwrap_err();
        assert!(!err.to_string().starts_with("at '"));
        assert_eq!(err.line, 1);
    }
}
