//! Payload Extractor
//!
//! Pulls the OpenAPI document out of a free-form completion. The document
//! is located by the first occurrence of the literal `openapi`; anything
//! before it (prose, an opening code fence) is discarded, and a closing
//! fence on the last line is removed.
//!
//! The marker scan is a heuristic. If `openapi` appears in prose ahead of
//! the real document, extraction anchors on the prose.

use std::fmt;

/// Literal marking the start of the payload
pub const PAYLOAD_MARKER: &str = "openapi";

/// Markdown code fence
pub const CODE_FENCE: &str = "```";

/// Message recorded when the response holds no payload
pub const NOT_GENERATED_MESSAGE: &str =
    "An OpenAPI v3 specification cannot be generated for this Apex class.";

/// Outcome of payload extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Text from the marker onward, closing fence removed
    Payload(String),
    /// The marker never appeared
    NotGenerated,
}

impl ExtractionResult {
    /// Text to persist: the payload, or the failure message
    pub fn as_str(&self) -> &str {
        match self {
            ExtractionResult::Payload(payload) => payload,
            ExtractionResult::NotGenerated => NOT_GENERATED_MESSAGE,
        }
    }

    /// True when a payload was found
    pub fn is_payload(&self) -> bool {
        matches!(self, ExtractionResult::Payload(_))
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove a closing code fence standing on the last non-blank line
///
/// Returns the input unchanged when the text does not end with a fence
/// line. A fence that shares its line with other text is not a fence line.
pub fn strip_trailing_fence(text: &str) -> &str {
    let trimmed = text.trim_end();
    match trimmed.strip_suffix(CODE_FENCE) {
        Some(before) if before.is_empty() || before.ends_with('\n') => before,
        _ => text,
    }
}

/// Extract the payload from a full completion
///
/// # Examples
/// ```
/// use prompt_lab::extract::{extract, ExtractionResult, NOT_GENERATED_MESSAGE};
///
/// let result = extract("Here you go:\n```yaml\nopenapi: 3.0.0\n```");
/// assert_eq!(result, ExtractionResult::Payload("openapi: 3.0.0\n".to_string()));
/// assert_eq!(extract("no marker here").as_str(), NOT_GENERATED_MESSAGE);
/// ```
pub fn extract(full_text: &str) -> ExtractionResult {
    match full_text.find(PAYLOAD_MARKER) {
        Some(index) => {
            let payload = strip_trailing_fence(&full_text[index..]);
            ExtractionResult::Payload(payload.to_string())
        }
        None => ExtractionResult::NotGenerated,
    }
}

/// YAML syntax problems in a payload, if any
///
/// Diagnostics only: a payload that fails to parse is still a payload.
pub fn yaml_diagnostics(payload: &str) -> Option<String> {
    match serde_yaml::from_str::<serde_yaml::Value>(payload) {
        Ok(_) => None,
        Err(err) => Some(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preamble_discarded() {
        let result = extract("Sure! openapi: 3.0.0\ninfo: {}");
        assert_eq!(result, ExtractionResult::Payload("openapi: 3.0.0\ninfo: {}".to_string()));
    }

    #[test]
    fn test_fence_line_removed() {
        assert_eq!(strip_trailing_fence("a: 1\n```"), "a: 1\n");
        assert_eq!(strip_trailing_fence("a: 1\n```\n\n"), "a: 1\n");
        assert_eq!(strip_trailing_fence("```"), "");
    }

    #[test]
    fn test_glued_fence_kept() {
        assert_eq!(strip_trailing_fence("a: 1```"), "a: 1```");
    }

    #[test]
    fn test_only_one_fence_removed() {
        assert_eq!(strip_trailing_fence("a: 1\n```\n```"), "a: 1\n```\n");
    }

    #[test]
    fn test_inner_fence_untouched() {
        let text = "openapi: 3.0.0\n```\ninfo: {}";
        assert_eq!(extract(text), ExtractionResult::Payload(text.to_string()));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let result = extract("I will write the openapi spec.\nopenapi: 3.0.0");
        assert_eq!(result.as_str(), "openapi spec.\nopenapi: 3.0.0");
    }

    #[test]
    fn test_not_generated() {
        assert_eq!(extract(""), ExtractionResult::NotGenerated);
        assert!(!extract("OpenAPI in caps").is_payload());
        assert_eq!(ExtractionResult::NotGenerated.to_string(), NOT_GENERATED_MESSAGE);
    }

    #[test]
    fn test_yaml_diagnostics() {
        assert_eq!(yaml_diagnostics("openapi: 3.0.0\ninfo:\n  title: A\n"), None);
        assert!(yaml_diagnostics("openapi: [3.0.0\n").is_some());
    }
}
