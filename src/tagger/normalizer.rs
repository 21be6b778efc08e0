/// Post-processing layer for tag normalization.
///
/// Ensures consistent tag formatting regardless of LLM output quality.
/// All tags are normalized to lowercase, kebab-case format with only
/// alphanumeric characters, hyphens, and slashes (for nested tags).
pub struct TagNormalizer;

impl TagNormalizer {
    /// Normalizes a single tag to lowercase kebab-case format.
    ///
    /// # Normalization rules
    ///
    /// - Converts to lowercase
    /// - Replaces spaces with hyphens
    /// - Removes all characters except alphanumeric, hyphens, and slashes
    /// - Collapses consecutive hyphens
    /// - Trims leading/trailing hyphens and slashes
    ///
    /// Normalization is idempotent: normalizing an already-normalized tag
    /// yields the same string.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagsmith::tagger::TagNormalizer;
    ///
    /// assert_eq!(TagNormalizer::normalize_tag("RUST"), "rust");
    /// assert_eq!(TagNormalizer::normalize_tag("machine learning"), "machine-learning");
    /// assert_eq!(TagNormalizer::normalize_tag("C++"), "c");
    /// assert_eq!(TagNormalizer::normalize_tag("  --rust--  "), "rust");
    /// assert_eq!(TagNormalizer::normalize_tag("project/Rust Notes"), "project/rust-notes");
    /// ```
    #[must_use]
    pub fn normalize_tag(tag: &str) -> String {
        let normalized = tag
            .trim()
            .to_lowercase()
            .replace(' ', "-")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '/')
            .collect::<String>();

        // Collapse consecutive hyphens into a single hyphen, per path segment
        // so nested tags like "a//b" also collapse cleanly.
        let collapsed = normalized
            .split('/')
            .map(|segment| {
                segment
                    .split('-')
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        collapsed
            .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '/')
            .to_string()
    }

    /// Normalizes a collection of tags, removing duplicates and empty strings.
    ///
    /// - Applies `normalize_tag` to each tag
    /// - Deduplicates (keeps first occurrence)
    /// - Filters out empty strings after normalization
    ///
    /// # Examples
    ///
    /// ```
    /// use tagsmith::tagger::TagNormalizer;
    ///
    /// let tags = vec!["Rust".to_string(), "rust".to_string(), "RUST".to_string()];
    /// assert_eq!(TagNormalizer::normalize_tags(tags), vec!["rust"]);
    /// ```
    #[must_use]
    pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        tags.into_iter()
            .map(|tag| Self::normalize_tag(&tag))
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .collect()
    }

    /// Applies the configured tag prefix to an already-normalized tag.
    ///
    /// Idempotent: a tag that already carries the prefix is returned
    /// unchanged, so re-tagging a document never stacks prefixes.
    #[must_use]
    pub fn apply_prefix(tag: &str, prefix: Option<&str>) -> String {
        match prefix {
            Some(p) if !p.is_empty() => {
                if tag.starts_with(p) {
                    tag.to_string()
                } else {
                    format!("{p}{tag}")
                }
            }
            _ => tag.to_string(),
        }
    }

    /// Strips the configured prefix from a tag, if present.
    ///
    /// Used when collecting the corpus vocabulary so reconciliation compares
    /// base names rather than prefixed ones.
    #[must_use]
    pub fn strip_prefix<'a>(tag: &'a str, prefix: Option<&str>) -> &'a str {
        match prefix {
            Some(p) if !p.is_empty() => tag.strip_prefix(p).unwrap_or(tag),
            _ => tag,
        }
    }

    /// Formats a reconciled tag list for writing: normalization enforced once
    /// more, prefix applied, duplicates dropped.
    #[must_use]
    pub fn format_tags(tags: Vec<String>, prefix: Option<&str>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        tags.into_iter()
            .map(|tag| Self::normalize_tag(&tag))
            .filter(|tag| !tag.is_empty())
            .map(|tag| Self::apply_prefix(&tag, prefix))
            .filter(|tag| seen.insert(tag.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_conversion() {
        assert_eq!(TagNormalizer::normalize_tag("RUST"), "rust");
        assert_eq!(TagNormalizer::normalize_tag("RuSt"), "rust");
        assert_eq!(TagNormalizer::normalize_tag("rust"), "rust");
    }

    #[test]
    fn test_space_to_hyphen_replacement() {
        assert_eq!(
            TagNormalizer::normalize_tag("machine learning"),
            "machine-learning"
        );
        assert_eq!(
            TagNormalizer::normalize_tag("deep neural networks"),
            "deep-neural-networks"
        );
    }

    #[test]
    fn test_special_character_removal() {
        assert_eq!(TagNormalizer::normalize_tag("c++"), "c");
        assert_eq!(TagNormalizer::normalize_tag("rust!"), "rust");
        assert_eq!(TagNormalizer::normalize_tag("node.js"), "nodejs");
        assert_eq!(TagNormalizer::normalize_tag("@mentions"), "mentions");
    }

    #[test]
    fn test_nested_tag_slashes_preserved() {
        assert_eq!(
            TagNormalizer::normalize_tag("project/Rust Notes"),
            "project/rust-notes"
        );
        assert_eq!(TagNormalizer::normalize_tag("a//b"), "a/b");
        assert_eq!(TagNormalizer::normalize_tag("/leading/"), "leading");
    }

    #[test]
    fn test_hyphen_collapsing_and_trimming() {
        assert_eq!(TagNormalizer::normalize_tag("  --rust--  "), "rust");
        assert_eq!(TagNormalizer::normalize_tag("a--b---c"), "a-b-c");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "Machine Learning!",
            "C++",
            "  --rust--  ",
            "project/Deep Dive",
            "already-normalized",
            "a//b--c",
        ];
        for input in inputs {
            let once = TagNormalizer::normalize_tag(input);
            let twice = TagNormalizer::normalize_tag(&once);
            assert_eq!(once, twice, "normalization not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_tags_dedup_and_filter() {
        let tags = vec![
            "Rust".to_string(),
            "rust".to_string(),
            "!!!".to_string(),
            "   ".to_string(),
            "Machine Learning".to_string(),
        ];
        assert_eq!(
            TagNormalizer::normalize_tags(tags),
            vec!["rust", "machine-learning"]
        );
    }

    #[test]
    fn test_apply_prefix() {
        assert_eq!(TagNormalizer::apply_prefix("rust", Some("ai/")), "ai/rust");
        assert_eq!(
            TagNormalizer::apply_prefix("ai/rust", Some("ai/")),
            "ai/rust"
        );
        assert_eq!(TagNormalizer::apply_prefix("rust", None), "rust");
        assert_eq!(TagNormalizer::apply_prefix("rust", Some("")), "rust");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(TagNormalizer::strip_prefix("ai/rust", Some("ai/")), "rust");
        assert_eq!(TagNormalizer::strip_prefix("rust", Some("ai/")), "rust");
        assert_eq!(TagNormalizer::strip_prefix("rust", None), "rust");
    }

    #[test]
    fn test_format_tags_applies_prefix_once() {
        let tags = vec!["Rust".to_string(), "ai/rust".to_string()];
        // Both normalize to the same prefixed tag and collapse to one entry.
        assert_eq!(
            TagNormalizer::format_tags(tags, Some("ai/")),
            vec!["ai/rust"]
        );
    }
}
