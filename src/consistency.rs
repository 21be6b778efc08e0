//! Tag consistency enhancement.
//!
//! Generated tags drift: `machine-learning` one day, `machine-learnin` the
//! next. The enhancer reconciles freshly generated tags against the known
//! vocabulary, substituting a close existing tag for a near-miss so the
//! vocabulary stays small and searchable. Closeness is Levenshtein edit
//! distance; exact matches short-circuit without any distance computation.

/// Maximum edit distance at which a generated tag is considered a variant of
/// an existing one.
pub const SIMILARITY_THRESHOLD: usize = 2;

/// Levenshtein edit distance over Unicode scalar values.
///
/// Standard two-row dynamic programming, O(len(a) * len(b)) time and
/// O(len(b)) space.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// A vocabulary tag found within the similarity threshold of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarTag {
    pub tag: String,
    pub distance: usize,
}

/// Reconciles generated tags against a fixed vocabulary snapshot.
pub struct TagConsistencyEnhancer {
    vocabulary: Vec<String>,
    threshold: usize,
}

impl TagConsistencyEnhancer {
    /// Builds an enhancer over a vocabulary snapshot. Order matters: when two
    /// vocabulary tags are equally close to a candidate, the earlier one
    /// wins.
    #[must_use]
    pub fn new(vocabulary: Vec<String>) -> Self {
        TagConsistencyEnhancer {
            vocabulary,
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Finds vocabulary tags within the threshold of `candidate`, nearest
    /// first. Exact matches (distance 0) are excluded; they need no
    /// substitution. The sort is stable, so equal distances keep vocabulary
    /// order.
    #[must_use]
    pub fn find_similar(&self, candidate: &str) -> Vec<SimilarTag> {
        let mut matches: Vec<SimilarTag> = self
            .vocabulary
            .iter()
            .filter_map(|tag| {
                let distance = levenshtein(candidate, tag);
                (distance > 0 && distance <= self.threshold).then(|| SimilarTag {
                    tag: tag.clone(),
                    distance,
                })
            })
            .collect();
        matches.sort_by_key(|m| m.distance);
        matches
    }

    /// Reconciles a generated tag list against the vocabulary.
    ///
    /// Exact vocabulary members pass through unchanged. A near-miss is
    /// replaced by its closest vocabulary tag. Genuinely new tags (nothing
    /// within the threshold) are kept as-is. Substitution can introduce
    /// duplicates, so the result is deduplicated preserving first occurrence.
    #[must_use]
    pub fn reconcile(&self, tags: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let resolved = if self.vocabulary.iter().any(|v| v == tag) {
                tag.clone()
            } else {
                match self.find_similar(tag).into_iter().next() {
                    Some(similar) => similar.tag,
                    None => tag.clone(),
                }
            };
            if !out.contains(&resolved) {
                out.push(resolved);
            }
        }
        out
    }
}
