//! Fuzzy string matching for cross-checking extracted names against the
//! brand context.

use std::collections::HashSet;

/// Similarity score considered a match by callers.
pub const MATCH_THRESHOLD: f64 = 0.7;

/// Similarity between two strings in [0,1].
///
/// Exact match after normalization scores 1.0, substring containment
/// 0.9, otherwise the Jaccard similarity of the character sets.
/// Symmetric by construction.
pub fn fuzzy_match(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);

    if na == nb {
        return 1.0;
    }
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return 0.9;
    }

    let sa: HashSet<char> = na.chars().collect();
    let sb: HashSet<char> = nb.chars().collect();
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

/// Whether `candidate` matches any name in `known` at [`MATCH_THRESHOLD`].
pub fn matches_any<'a>(candidate: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .find(|name| fuzzy_match(candidate, name) >= MATCH_THRESHOLD)
        .map(String::as_str)
}

/// Lowercase alphanumerics only.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
