//! Corpus vocabulary collection.
//!
//! The vocabulary is the set of tags already in use across the corpus, in
//! first-seen order. It feeds both the generation prompt (so the model
//! prefers existing tags) and the consistency enhancer (so near-misses
//! resolve to the earliest established spelling). Tags come from two places:
//! frontmatter tags fields and inline `#hashtag` occurrences in document
//! bodies.

use std::collections::HashSet;

use crate::frontmatter;
use crate::tagger::TagNormalizer;
use crate::vault::Document;

/// Collects the tag vocabulary from a document snapshot.
pub struct VocabularyIndex {
    prefix: Option<String>,
}

impl VocabularyIndex {
    #[must_use]
    pub fn new(prefix: Option<String>) -> Self {
        VocabularyIndex { prefix }
    }

    /// Scans documents in order and returns every distinct tag, normalized
    /// and with the configured prefix stripped, preserving first-seen order.
    #[must_use]
    pub fn snapshot(&self, documents: &[Document]) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut vocabulary: Vec<String> = Vec::new();

        for doc in documents {
            let mut raw: Vec<String> = Vec::new();
            if let Some(block) = frontmatter::parse(&doc.text) {
                raw.extend(block.tags());
            }
            raw.extend(inline_tags(frontmatter::body(&doc.text)));

            for tag in raw {
                let base = TagNormalizer::strip_prefix(&tag, self.prefix.as_deref());
                let normalized = TagNormalizer::normalize_tag(base);
                if !normalized.is_empty() && seen.insert(normalized.clone()) {
                    vocabulary.push(normalized);
                }
            }
        }

        vocabulary
    }
}

/// Extracts inline `#tag` tokens from a document body.
///
/// A tag starts with `#` at the beginning of the text or after whitespace,
/// continues over alphanumerics, hyphens, underscores, and slashes, and must
/// contain at least one alphabetic character (so `#42` and bare `#` are not
/// tags).
#[must_use]
pub fn inline_tags(body: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '#' && prev.is_none_or(char::is_whitespace) {
            let start = i + c.len_utf8();
            let mut end = start;
            while let Some(&(j, nc)) = chars.peek() {
                if nc.is_alphanumeric() || matches!(nc, '-' | '_' | '/') {
                    end = j + nc.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let candidate = &body[start..end];
            if candidate.chars().any(char::is_alphabetic) {
                tags.push(candidate.to_string());
            }
            prev = Some('#');
        } else {
            prev = Some(c);
        }
    }

    tags
}
