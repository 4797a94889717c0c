//! Cheap word-overlap similarity between two text bundles.

use std::collections::HashSet;

/// Jaccard similarity over whitespace-separated words.
///
/// Used to flag "the reproducer landed on the same idea" when comparing a
/// reproduce-stage bundle against the author bundle. Two empty texts count
/// as identical; exactly one empty text counts as fully different.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();
    let intersection = a_words.intersection(&b_words).count();
    let union = a_words.union(&b_words).count();
    intersection as f64 / union.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        assert_eq!(word_overlap("print hello world", "print hello world"), 1.0);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(word_overlap("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn both_empty_score_one() {
        assert_eq!(word_overlap("", ""), 1.0);
    }

    #[test]
    fn one_empty_scores_zero() {
        assert_eq!(word_overlap("something", ""), 0.0);
        assert_eq!(word_overlap("", "something"), 0.0);
    }

    #[test]
    fn partial_overlap_is_fractional() {
        // words: {a, b} vs {b, c}; intersection 1, union 3.
        let score = word_overlap("a b", "b c");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }
}
