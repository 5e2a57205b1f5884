//! Semantic record detectors: calendar events and contact cards.

mod contact;
mod event;

pub use contact::ContactDetector;
pub use event::EventDetector;

use std::collections::HashSet;

use crate::text::words;

/// Lowercased word set of `text`.
pub(crate) fn word_set(text: &str) -> HashSet<String> {
    words(text).into_iter().collect()
}

/// Whether any word matches a keyword exactly or as a plain `-s` plural.
pub(crate) fn has_keyword(words: &HashSet<String>, keywords: &[&str]) -> bool {
    keyword_hits(words, keywords) > 0
}

/// Number of distinct keywords present in `words`.
pub(crate) fn keyword_hits(words: &HashSet<String>, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|kw| words.contains(**kw) || words.contains(&format!("{kw}s")))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching_is_word_based() {
        let words = word_set("Team Meetings at the Concert-Hall");
        assert!(has_keyword(&words, &["meeting"]));
        assert!(has_keyword(&words, &["concert"]));
        assert!(!has_keyword(&words, &["eat"]));
    }

    #[test]
    fn test_keyword_hits_counts_distinct() {
        let words = word_set("12 likes 3 comments likes");
        assert_eq!(keyword_hits(&words, &["like", "comment", "share"]), 2);
    }
}
