//! Shared compiled patterns.
//!
//! Every pattern is compiled once and stored as `Option<Regex>`: a pattern
//! that fails to compile disables its category (no matches) instead of
//! panicking.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Compile a fixed pattern, logging and returning `None` on failure.
pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, pattern, "Pattern failed to compile, category disabled");
            None
        }
    }
}

/// `H:MM` / `HH:MM` anywhere in a line.
pub(crate) static CLOCK_TIME: Lazy<Option<Regex>> = Lazy::new(|| compile(r"\b\d{1,2}:\d{2}\b"));

/// A line that is nothing but a clock time (`3:00`, `15:30`, `3:00 PM`).
pub(crate) static BARE_TIME: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?i)^\d{1,2}:\d{2}(?:\s*[ap]\.?m\.?)?$"));

/// Numbered list item: `1. `, `2) `.
pub(crate) static NUMBERED_ITEM: Lazy<Option<Regex>> = Lazy::new(|| compile(r"^\d+[.)]\s"));

/// Email addresses (RFC-light).
pub(crate) static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,64}"));

/// Two consecutive capitalized words on one line.
pub(crate) static CAPITALIZED_PAIR: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"\b\p{Lu}\p{Ll}+[ \t]+\p{Lu}\p{Ll}+\b"));

/// Currency amounts: symbol-first (`$12`, `€ 4,50`) or symbol-last (`12,50 €`, `99 zł`).
pub(crate) static CURRENCY_AMOUNT: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"[€$£¥₽₴₺₪₩]\s?\d[\d\s.,]*|\d+[.,]\d{2}\s?(?:[€$£¥₽₴₺₪₩]|zł|грн|руб)")
});

/// Grouped card numbers (`4111 1111 1111 1111`, `3782-822463-10005`).
pub(crate) static CARD_NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"\b\d{4}(?:[ -]\d{4,6}){2,3}(?:[ -]\d{1,4})?\b"));

/// Whether `pattern` compiled and matches `text`.
pub(crate) fn matches(pattern: &Lazy<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// Keep the earliest-starting, then longest, non-overlapping items.
pub(crate) fn resolve_overlaps<T, F>(mut items: Vec<T>, range_of: F) -> Vec<T>
where
    F: Fn(&T) -> Range<usize>,
{
    items.sort_by(|a, b| {
        let (ra, rb) = (range_of(a), range_of(b));
        ra.start.cmp(&rb.start).then(rb.end.cmp(&ra.end))
    });
    let mut accepted: Vec<T> = Vec::with_capacity(items.len());
    let mut covered_to = 0usize;
    for item in items {
        let range = range_of(&item);
        if accepted.is_empty() || range.start >= covered_to {
            covered_to = range.end;
            accepted.push(item);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_invalid_pattern_returns_none() {
        assert!(compile(r"(unclosed").is_none());
        assert!(compile(r"\d+").is_some());
    }

    #[test]
    fn test_clock_time() {
        assert!(matches(&CLOCK_TIME, "Sent at 9:41"));
        assert!(matches(&CLOCK_TIME, "12:05 PM"));
        assert!(!matches(&CLOCK_TIME, "no time here"));
    }

    #[test]
    fn test_bare_time() {
        assert!(matches(&BARE_TIME, "3:00"));
        assert!(matches(&BARE_TIME, "3:00 PM"));
        assert!(!matches(&BARE_TIME, "Meeting at 3:00"));
    }

    #[test]
    fn test_currency_amount() {
        assert!(matches(&CURRENCY_AMOUNT, "Total $12.99"));
        assert!(matches(&CURRENCY_AMOUNT, "Итого ₽ 450"));
        assert!(matches(&CURRENCY_AMOUNT, "Summe 12,50 €"));
        assert!(!matches(&CURRENCY_AMOUNT, "12 items"));
    }

    #[test]
    fn test_card_number() {
        assert!(matches(&CARD_NUMBER, "4111 1111 1111 1111"));
        assert!(matches(&CARD_NUMBER, "4111-1111-1111-1111"));
        assert!(!matches(&CARD_NUMBER, "call 555 1234"));
    }

    #[test]
    fn test_capitalized_pair_stays_on_one_line() {
        let re = CAPITALIZED_PAIR.as_ref().unwrap();
        assert_eq!(re.find("Jane Doe").unwrap().as_str(), "Jane Doe");
        assert!(re.find("Jane\nDoe").is_none());
    }

    #[test]
    fn test_resolve_overlaps_prefers_longest() {
        let items = vec![0..5, 0..10, 3..7, 10..12];
        let kept = resolve_overlaps(items, |r| r.clone());
        assert_eq!(kept, vec![0..10, 10..12]);
    }
}
