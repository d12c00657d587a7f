//! Structured hint extraction from block comments.
//!
//! OLAP frontends annotate generated MDX with comments of the form
//! `/* KEY: value */`. The recognized key set is closed; anything else is
//! an ordinary comment and ignored. Hints attach to query metadata and
//! never change semantics.

use serde::{Deserialize, Serialize};

use crate::lexer::{CommentCapture, Span};

/// Recognized hint keys. `MATRIX_*` is a prefix family.
const RECOGNIZED_KEYS: &[&str] = &[
    "OPTIMIZER",
    "HINT",
    "EXECUTION_MODE",
    "CACHE",
    "CACHE_MODE",
    "STORAGE_ENGINE_HINT",
    "TARGET_LEVEL",
    "QUERY_TIMEOUT",
    "QUERY_PRIORITY",
    "RECURSION_LIMIT",
    "ORG_MODEL",
    "PARALLEL_EXECUTION",
    "FILTER_EARLY",
];

/// One harvested hint. `key` is stored uppercase as matched; `value` is
/// the text after the colon, trimmed, verbatim otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub key: String,
    pub value: String,
    #[serde(skip)]
    pub span: Span,
}

impl Hint {
    /// Free-form label form used in metadata (`KEY: value`).
    pub fn label(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

fn is_recognized(key: &str) -> bool {
    RECOGNIZED_KEYS.iter().any(|k| *k == key) || key.starts_with("MATRIX_")
}

/// Scan captured comment bodies for recognized `KEY: value` hints.
/// One comment may carry several hints, one per line.
pub fn extract(comments: &[CommentCapture]) -> Vec<Hint> {
    let mut hints = Vec::new();
    for comment in comments {
        for line in comment.text.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_uppercase();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                continue;
            }
            if is_recognized(&key) {
                hints.push(Hint {
                    key,
                    value: value.trim().to_string(),
                    span: comment.span,
                });
            }
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(text: &str) -> CommentCapture {
        CommentCapture {
            text: text.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn recognized_key_is_extracted() {
        let hints = extract(&[capture(" OPTIMIZER: use_aggregates ")]);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].key, "OPTIMIZER");
        assert_eq!(hints[0].value, "use_aggregates");
    }

    #[test]
    fn matrix_prefix_family_is_recognized() {
        let hints = extract(&[capture("MATRIX_DENSITY: sparse")]);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].key, "MATRIX_DENSITY");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let hints = extract(&[capture("NOTE: just a comment"), capture("no colon here")]);
        assert!(hints.is_empty());
    }

    #[test]
    fn key_match_is_case_insensitive_and_value_verbatim() {
        let hints = extract(&[capture("cache_mode:  WriteBack ")]);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].key, "CACHE_MODE");
        assert_eq!(hints[0].value, "WriteBack");
    }

    #[test]
    fn several_hints_in_one_comment() {
        let hints = extract(&[capture("QUERY_TIMEOUT: 30\nQUERY_PRIORITY: high")]);
        assert_eq!(hints.len(), 2);
    }

    #[test]
    fn member_paths_are_not_hints() {
        // A colon inside an ordinary sentence must not produce a hint
        // unless the key side matches the closed set.
        let hints = extract(&[capture("generated by Necto: do not edit")]);
        assert!(hints.is_empty());
    }
}
