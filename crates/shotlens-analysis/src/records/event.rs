//! Calendar event detection.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use shotlens_core::defaults::{
    EVENT_DESCRIPTION_MAX_CHARS, EVENT_DESCRIPTION_MAX_LINES, EVENT_DESCRIPTION_MIN_CHARS,
    EVENT_LOCATION_MAX_CHARS, EVENT_NAME_MAX_CHARS, EVENT_NAME_MIN_CHARS, EVENT_NAME_SCAN_LINES,
    HINT_CONFIDENCE_FLOOR, SOCIAL_FIRST_LINE_MAX_CHARS, SOCIAL_VOCAB_MIN_HITS,
};
use shotlens_core::{BasicEntities, ContextHint, EventRecord};

use super::{has_keyword, keyword_hits, word_set};
use crate::patterns::{compile, matches, BARE_TIME};
use crate::text::{alphabetic_ratio, char_len, non_empty_lines, truncate_chars, words};

const EVENT_KEYWORDS: &[&str] = &[
    "concert",
    "meeting",
    "conference",
    "appointment",
    "flight",
    "wedding",
    "party",
    "birthday",
    "webinar",
    "festival",
    "exhibition",
    "seminar",
    "workshop",
    "summit",
    "ceremony",
    "premiere",
    "lecture",
    "interview",
    "reservation",
    "booking",
    "dinner",
    "lunch",
    "event",
    "show",
    "tour",
    "match",
    "game",
    "встреча",
    "концерт",
    "конференция",
    "spotkanie",
    "koncert",
    "termin",
    "konzert",
    "réunion",
    "reunión",
];

const SOCIAL_VOCABULARY: &[&str] = &[
    "view",
    "like",
    "comment",
    "share",
    "retweet",
    "repost",
    "reply",
    "replies",
    "follow",
    "follower",
    "following",
    "ago",
    "posted",
    "subscribe",
    "subscriber",
];

const SOCIAL_HINTS: &[&str] = &["conversation", "message", "chat", "social", "post", "feed"];

/// Indicators whose remainder is the venue.
const PREPOSITIONAL_INDICATORS: &[&str] = &["at", "in", "@"];
const LABEL_INDICATORS: &[&str] = &["venue:", "location:", "where:", "place:"];

/// Indicators that make the whole line the venue.
const NOMINAL_INDICATORS: &[&str] = &[
    "hall",
    "stadium",
    "arena",
    "room",
    "center",
    "centre",
    "theater",
    "theatre",
    "club",
    "park",
    "cafe",
    "café",
    "restaurant",
    "hotel",
    "auditorium",
    "gallery",
    "museum",
    "venue",
];

/// Short first lines like `2h`, `5 min ago`, `yesterday`, `12.03`, `Mar 4`.
static COMPACT_TIMESTAMP: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"(?i)\b(?:\d+\s*(?:s|m|h|d|w|sec|secs|min|mins|hr|hrs|minutes?|hours?|days?|weeks?)\b(?:\s+ago)?|yesterday|today|just now|\d{1,2}[./]\d{1,2}(?:[./]\d{2,4})?|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2})",
    )
});

/// Assembles an [`EventRecord`] from dates plus line heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDetector;

impl EventDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(
        &self,
        text: &str,
        entities: &BasicEntities,
        hints: &[ContextHint],
    ) -> Option<EventRecord> {
        let dates = distinct_dates(entities);
        let start = *dates.first()?;

        let vocabulary = word_set(text);
        let keyword = has_keyword(&vocabulary, EVENT_KEYWORDS);
        let social = looks_like_social(text, hints);

        let qualifies = if social {
            keyword && dates.len() >= 2
        } else {
            keyword || dates.len() >= 2
        };
        if !qualifies {
            debug!(social, keyword, dates = dates.len(), "Event gate not met");
            return None;
        }

        let lines = non_empty_lines(text);
        let record = EventRecord {
            name: event_name(&lines),
            start: Some(start),
            end: dates.get(1).copied(),
            location: entities
                .addresses
                .first()
                .map(|a| a.formatted())
                .or_else(|| location_from_lines(&lines)),
            description: description(&lines),
        };

        record.is_valid().then_some(record)
    }
}

fn distinct_dates(entities: &BasicEntities) -> Vec<NaiveDateTime> {
    let mut out: Vec<NaiveDateTime> = Vec::new();
    for date in &entities.dates {
        if !out.contains(&date.value) {
            out.push(date.value);
        }
    }
    out
}

/// Any one of: a social context hint, social-UI vocabulary, or a compact
/// timestamp as the first line.
pub(crate) fn looks_like_social(text: &str, hints: &[ContextHint]) -> bool {
    has_social_hint(hints) || has_social_vocabulary(text) || starts_with_timestamp(text)
}

fn has_social_hint(hints: &[ContextHint]) -> bool {
    hints.iter().any(|hint| {
        hint.confidence >= HINT_CONFIDENCE_FLOOR && has_keyword(&word_set(&hint.label), SOCIAL_HINTS)
    })
}

fn has_social_vocabulary(text: &str) -> bool {
    keyword_hits(&word_set(text), SOCIAL_VOCABULARY) >= SOCIAL_VOCAB_MIN_HITS
}

fn starts_with_timestamp(text: &str) -> bool {
    non_empty_lines(text).first().is_some_and(|line| {
        char_len(line) < SOCIAL_FIRST_LINE_MAX_CHARS && matches(&COMPACT_TIMESTAMP, line)
    })
}

fn event_name(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(EVENT_NAME_SCAN_LINES)
        .find(|line| {
            let len = char_len(line);
            (EVENT_NAME_MIN_CHARS..=EVENT_NAME_MAX_CHARS).contains(&len)
                && !matches(&BARE_TIME, line)
                && alphabetic_ratio(line) >= 0.5
        })
        .map(|line| line.to_string())
}

fn location_from_lines(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| venue_after_indicator(line).or_else(|| venue_line(line)))
        .map(|venue| truncate_chars(&venue, EVENT_LOCATION_MAX_CHARS))
}

/// Remainder after `at`/`in`/`@` (must start with a capital) or after a
/// `venue:`-style label.
fn venue_after_indicator(line: &str) -> Option<String> {
    let mut offset = 0;
    for token in line.split_whitespace() {
        let start = offset + line[offset..].find(token)?;
        offset = start + token.len();
        let lower = token.to_lowercase();
        let rest = line[offset..].trim();
        if rest.is_empty() {
            continue;
        }
        let labelled = LABEL_INDICATORS.contains(&lower.as_str());
        let prepositional = PREPOSITIONAL_INDICATORS.contains(&lower.as_str())
            && rest.chars().next().is_some_and(char::is_uppercase);
        if labelled || prepositional {
            return Some(rest.to_string());
        }
    }
    None
}

fn venue_line(line: &str) -> Option<String> {
    let line_words = words(line);
    NOMINAL_INDICATORS
        .iter()
        .any(|kw| line_words.iter().any(|w| w == kw))
        .then(|| line.to_string())
}

fn description(lines: &[&str]) -> Option<String> {
    let picked: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| {
            (EVENT_DESCRIPTION_MIN_CHARS..EVENT_DESCRIPTION_MAX_CHARS).contains(&char_len(line))
        })
        .take(EVENT_DESCRIPTION_MAX_LINES)
        .collect();
    (!picked.is_empty()).then(|| picked.join(" "))
}
