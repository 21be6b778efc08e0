//! Prompt construction and response parsing for LLM tag extraction.
//!
//! The expected model output is a JSON array of tag strings. Models wrap
//! output in markdown fences or prose often enough that extraction scans for
//! the array boundaries instead of parsing the whole response; when no JSON
//! array is present at all, the response is split on commas and newlines as a
//! best-effort recovery.

/// Prompt template for tag extraction.
///
/// Designed for model-agnostic compatibility with clear, explicit
/// instructions. Includes few-shot examples demonstrating the expected
/// output format and a vocabulary section so the model prefers tags already
/// in use across the corpus.
const PROMPT_TEMPLATE: &str = r#"Extract relevant tags from the note content below. Return ONLY a JSON array of tag strings. Do not include any explanatory text.

INSTRUCTIONS:
1. Focus on what the note is ABOUT (primary topics), not things merely mentioned in passing
2. Extract 3-7 tags depending on note complexity
3. Use lowercase for all tags
4. Use hyphens instead of spaces (e.g., "machine-learning" not "machine learning")
5. Avoid special characters; use only alphanumeric and hyphens
6. If an EXISTING TAG fits the note, reuse it exactly instead of inventing a variant

EXAMPLES:

Input: "Learning async Rust. The tokio runtime makes concurrent programming much easier than manual thread management."
Output: ["async", "rust", "tokio", "concurrency"]

Input: "Debugging a Python script. Used print statements but should switch to proper logging."
Output: ["debugging", "python", "logging"]

Input: "Meeting notes: discussed Q4 roadmap. Need to prioritize authentication feature and database migration."
Output: ["meeting-notes", "roadmap", "authentication", "database"]

EXISTING TAGS:
{vocabulary}

NOTE CONTENT:
{content}

JSON OUTPUT:"#;

/// Builds the tag-extraction prompt for a document body.
///
/// The vocabulary is rendered as a comma-separated list; when empty, the
/// model is told there are no existing tags yet.
#[must_use]
pub fn build_prompt(body: &str, vocabulary: &[String]) -> String {
    let vocabulary_text = if vocabulary.is_empty() {
        "(none yet)".to_string()
    } else {
        vocabulary.join(", ")
    };

    PROMPT_TEMPLATE
        .replace("{vocabulary}", &vocabulary_text)
        .replace("{content}", body)
}

/// Parses a raw model response into a list of tag strings.
///
/// Tries JSON array extraction first; when no array can be found or parsed,
/// falls back to splitting on commas and newlines, trimming list bullets,
/// quotes, and leading hashes from each fragment. Returns an empty list when
/// nothing usable remains; the caller decides whether that is an error.
#[must_use]
pub fn parse_tag_response(response: &str) -> Vec<String> {
    if let Some(json_str) = extract_json_array(response)
        && let Some(tags) = parse_tag_array(&json_str)
    {
        return tags;
    }

    split_fallback(response)
}

/// Extracts a JSON array from model response, handling various output formats.
///
/// Handles:
/// - Clean JSON response (no wrapping)
/// - Markdown code block wrapping (```json ... ```)
/// - Explanatory text before/after the array
fn extract_json_array(response: &str) -> Option<String> {
    let trimmed = response.trim();

    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;

    if start <= end {
        Some(trimmed[start..=end].to_string())
    } else {
        None
    }
}

/// Parses a JSON array of strings. Non-string elements are skipped rather
/// than failing the whole response.
fn parse_tag_array(json_str: &str) -> Option<Vec<String>> {
    let json_value: serde_json::Value = serde_json::from_str(json_str).ok()?;
    let array = json_value.as_array()?;

    Some(
        array
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Best-effort recovery for non-JSON responses: split on commas and newlines,
/// strip list bullets, surrounding quotes, and leading hash marks.
fn split_fallback(response: &str) -> Vec<String> {
    response
        .split(['\n', ','])
        .map(|fragment| {
            fragment
                .trim()
                .trim_start_matches(['-', '*'])
                .trim()
                .trim_matches(['"', '\''])
                .trim_start_matches('#')
                .trim()
        })
        .filter(|s| !s.is_empty() && s.len() < 64 && !s.ends_with(':'))
        .map(String::from)
        .collect()
}
