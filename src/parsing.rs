//! Parsing utilities for narrative model output.
//!
//! The model is told to answer with a bare JSON object, but frequently wraps
//! it in a markdown fence anyway. [`strip_code_fences`] removes a leading
//! `` ```json `` and a trailing `` ``` ``; [`parse_story_draft`] then requires
//! the remainder to be the story object. Anything else is
//! [`StoryError::MalformedOutput`], which the retry policy treats as transient.

use crate::error::{Result, StoryError};
use crate::story::StoryDraft;
use tracing::debug;

const OPEN_FENCE: &str = "```json";
const CLOSE_FENCE: &str = "```";

/// Strip a leading `` ```json `` fence and a trailing `` ``` `` fence, if present.
///
/// Each fence is removed independently, and the result is trimmed.
///
/// # Example
///
/// ```
/// use storybook_pipeline::parsing::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(OPEN_FENCE) {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix(CLOSE_FENCE) {
        body = rest;
    }
    body.trim()
}

/// Parse raw model output into a [`StoryDraft`].
///
/// The error carries only the parser message; the raw text is logged at `debug`.
pub fn parse_story_draft(text: &str) -> Result<StoryDraft> {
    let body = strip_code_fences(text);
    serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, raw = truncate(body, 200), "unparseable story output");
        StoryError::MalformedOutput(e.to_string())
    })
}

/// First `max` characters of `text`.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = r#"{
        "title": "Leo and the Moon",
        "moral": "Curiosity lights the way.",
        "story": ["Leo looked up.", "The moon winked."],
        "imagePrompts": ["Leo, a boy with a yellow raincoat, waving at a winking moon"]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let draft = parse_story_draft(STORY).unwrap();
        assert_eq!(draft.title, "Leo and the Moon");
        assert_eq!(draft.story.len(), 2);
        assert_eq!(draft.image_prompts.len(), 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", STORY);
        let draft = parse_story_draft(&fenced).unwrap();
        assert_eq!(draft.moral, "Curiosity lights the way.");
    }

    #[test]
    fn test_parse_fenced_with_surrounding_whitespace() {
        let fenced = format!("\n  ```json{}```  \n", STORY);
        assert!(parse_story_draft(&fenced).is_ok());
    }

    #[test]
    fn test_only_trailing_fence() {
        assert_eq!(strip_code_fences("{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = parse_story_draft("Sure! Here is your story: Once upon a time...").unwrap_err();
        assert!(matches!(err, StoryError::MalformedOutput(_)));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = parse_story_draft(r#"{"title": "T", "story": []}"#).unwrap_err();
        assert!(err.to_string().contains("moral"));
    }

    #[test]
    fn test_error_omits_raw_text() {
        let err = parse_story_draft("Mia counted 1429 stars before bed.").unwrap_err();
        assert!(!err.to_string().contains("1429"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
