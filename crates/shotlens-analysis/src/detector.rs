//! Pattern-based phone, date and address detection.
//!
//! [`PatternDataDetector`] is the built-in [`DataDetector`]: a regex and
//! `chrono` implementation of the structured-match capability that platform
//! text services usually provide. Locale coverage for addresses is limited
//! to US, German and Polish layouts.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use shotlens_core::defaults::{CARD_MAX_DIGITS, CARD_MIN_DIGITS, PHONE_MAX_DIGITS, PHONE_MIN_DIGITS};
use shotlens_core::{AddressComponents, AddressMatch, DataDetector, DateMatch, TextMatch};

use crate::patterns::{compile, resolve_overlaps, CARD_NUMBER};

// =============================================================================
// PATTERNS
// =============================================================================

static PHONE: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?:\+\d{1,3}[ .-]?)?(?:\(\d{1,4}\)[ .-]?)?\d{2,4}(?:[ .-]?\d{2,4}){1,4}")
});

static DATE_SHAPED: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"^(?:\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d{1,2}[-./]\d{1,2}[-./]\d{2,4})$")
});

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static MONTH_DAY: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(&format!(
        r"(?i)\b{MONTH}\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
});

static DAY_MONTH: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
});

static ISO_DATE: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"\b(\d{4})-(\d{1,2})-(\d{1,2})"));

static NUMERIC_DATE: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"\b(\d{1,2})([/.])(\d{1,2})[/.](\d{4}|\d{2})\b"));

static RELATIVE_DAY: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?i)\b(today|tomorrow)\b"));

static TIME_SUFFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?i)^\s*(?:,\s*|at\s+|@\s*|t)?(\d{1,2})(?::(\d{2}))?\s*([ap]\.?m\b\.?)?")
});

static RANGE_SUFFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?i)^\s*(?:-|–|—|to\b|until\b|till\b)\s*(\d{1,2})(?::(\d{2}))?\s*([ap]\.?m\b\.?)?")
});

static US_ADDRESS: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"\b(\d{1,6}\s+(?:[A-Z0-9][\w.'-]*\s+){0,4}(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Drive|Dr|Lane|Ln|Way|Court|Ct|Place|Pl|Parkway|Pkwy|Highway|Hwy|Square|Sq|Terrace|Ter|Circle|Cir|Loop)\b\.?(?:,?\s+(?:Suite|Ste|Apt|Unit|#)\s*[\w-]+)?)[,\s]+([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+){0,2}),?\s+([A-Z]{2})\s+(\d{5}(?:-\d{4})?)\b(?:,?\s+(USA|United States))?",
    )
});

static DE_ADDRESS: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"\b(\p{Lu}[\w.-]*(?:straße|strasse|str\.|weg|platz|allee|gasse|ring|damm)\s+\d+[a-z]?)[,\s]+(\d{5})\s+(\p{Lu}[\w-]+)",
    )
});

static PL_ADDRESS: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r"\b(ul\.\s*[^\d,\n]+?\s+\d+[a-zA-Z]?(?:/\d+)?)[,\s]+(\d{2}-\d{3})\s+(\p{Lu}[\p{L}-]+(?:\s\p{Lu}[\p{L}-]+)?)",
    )
});

// =============================================================================
// DETECTOR
// =============================================================================

/// Built-in regex/`chrono` data detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDataDetector;

impl PatternDataDetector {
    pub fn new() -> Self {
        Self
    }
}

impl DataDetector for PatternDataDetector {
    fn phones(&self, text: &str) -> Vec<TextMatch> {
        let Some(re) = PHONE.as_ref() else {
            return Vec::new();
        };

        let cards = card_ranges(text);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in re.find_iter(text) {
            if touches_digit(text, m.range()) {
                continue;
            }
            if cards.iter().any(|c| c.start < m.end() && m.start() < c.end) {
                continue;
            }
            let candidate = m.as_str().trim();
            let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();
            if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
                continue;
            }
            if DATE_SHAPED.as_ref().is_some_and(|d| d.is_match(candidate)) {
                continue;
            }
            if seen.insert(digits) {
                out.push(TextMatch::new(candidate, m.range()));
            }
        }
        trace!(count = out.len(), "Phone numbers detected");
        out
    }

    fn dates(&self, text: &str, reference: NaiveDate) -> Vec<DateMatch> {
        let mut candidates: Vec<DateCandidate> = Vec::new();
        collect_dates(&MONTH_DAY, text, &mut candidates, |caps| {
            let month = month_number(caps.get(1)?.as_str())?;
            let day = caps.get(2)?.as_str().parse().ok()?;
            let year = parse_year(caps.get(3)).unwrap_or_else(|| reference.year());
            NaiveDate::from_ymd_opt(year, month, day)
        });
        collect_dates(&DAY_MONTH, text, &mut candidates, |caps| {
            let day = caps.get(1)?.as_str().parse().ok()?;
            let month = month_number(caps.get(2)?.as_str())?;
            let year = parse_year(caps.get(3)).unwrap_or_else(|| reference.year());
            NaiveDate::from_ymd_opt(year, month, day)
        });
        collect_dates(&ISO_DATE, text, &mut candidates, |caps| {
            NaiveDate::from_ymd_opt(
                caps.get(1)?.as_str().parse().ok()?,
                caps.get(2)?.as_str().parse().ok()?,
                caps.get(3)?.as_str().parse().ok()?,
            )
        });
        collect_dates(&NUMERIC_DATE, text, &mut candidates, |caps| {
            let first: u32 = caps.get(1)?.as_str().parse().ok()?;
            let second: u32 = caps.get(3)?.as_str().parse().ok()?;
            let year = parse_year(caps.get(4))?;
            // Slash dates read month-first unless that is impossible; dot dates are day-first.
            let (month, day) = match caps.get(2)?.as_str() {
                "/" if first > 12 => (second, first),
                "/" => (first, second),
                _ => (second, first),
            };
            NaiveDate::from_ymd_opt(year, month, day)
        });
        collect_dates(&RELATIVE_DAY, text, &mut candidates, |caps| {
            match caps.get(1)?.as_str().to_lowercase().as_str() {
                "tomorrow" => reference.succ_opt(),
                _ => Some(reference),
            }
        });

        let accepted = resolve_overlaps(candidates, |c| c.range.clone());

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for candidate in accepted {
            for date in candidate.into_matches(text) {
                if seen.insert(date.value) {
                    out.push(date);
                }
            }
        }
        trace!(count = out.len(), "Dates detected");
        out
    }

    fn addresses(&self, text: &str) -> Vec<AddressMatch> {
        let mut candidates: Vec<AddressMatch> = Vec::new();

        if let Some(re) = US_ADDRESS.as_ref() {
            candidates.extend(re.captures_iter(text).filter_map(|caps| {
                Some(AddressMatch {
                    components: AddressComponents {
                        street: group(&caps, 1),
                        city: group(&caps, 2),
                        state: group(&caps, 3),
                        zip: group(&caps, 4),
                        country: group(&caps, 5),
                    },
                    range: caps.get(0)?.range(),
                })
            }));
        }
        for re in [DE_ADDRESS.as_ref(), PL_ADDRESS.as_ref()].into_iter().flatten() {
            candidates.extend(re.captures_iter(text).filter_map(|caps| {
                Some(AddressMatch {
                    components: AddressComponents {
                        street: group(&caps, 1),
                        city: group(&caps, 3),
                        state: None,
                        zip: group(&caps, 2),
                        country: None,
                    },
                    range: caps.get(0)?.range(),
                })
            }));
        }

        let accepted = resolve_overlaps(candidates, |a| a.range.clone());
        let mut seen = HashSet::new();
        accepted
            .into_iter()
            .filter(|a| !a.components.is_empty())
            .filter(|a| seen.insert(a.formatted().to_lowercase()))
            .collect()
    }
}

// =============================================================================
// DATE HELPERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy)]
struct ClockTime {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl ClockTime {
    fn to_naive(self, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
        let hour = match meridiem.or(self.meridiem) {
            Some(_) if self.hour == 0 || self.hour > 12 => return None,
            Some(Meridiem::Am) if self.hour == 12 => 0,
            Some(Meridiem::Pm) if self.hour < 12 => self.hour + 12,
            _ => self.hour,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0)
    }
}

/// A date plus whatever time and range-end followed it.
#[derive(Debug)]
struct DateCandidate {
    date: NaiveDate,
    start_time: Option<ClockTime>,
    /// Byte range of the date (and its time, if any).
    range: Range<usize>,
    end: Option<(ClockTime, Range<usize>)>,
}

impl DateCandidate {
    fn into_matches(self, text: &str) -> Vec<DateMatch> {
        let end_meridiem = self.end.as_ref().and_then(|(t, _)| t.meridiem);
        let start_time = self
            .start_time
            .and_then(|t| t.to_naive(t.meridiem.or(end_meridiem)));

        let start = DateMatch {
            value: self.date.and_time(start_time.unwrap_or_default()),
            has_time: start_time.is_some(),
            text: text[self.range.clone()].trim().to_string(),
            range: self.range,
        };

        let mut out = vec![start];
        if let (Some(begin), Some((end_clock, end_range))) = (start_time, self.end) {
            let inherited = end_clock
                .meridiem
                .or(self.start_time.and_then(|t| t.meridiem));
            if let Some(end_time) = end_clock.to_naive(inherited) {
                let mut end_value = self.date.and_time(end_time);
                if end_time < begin {
                    end_value += Duration::days(1);
                }
                out.push(DateMatch {
                    value: end_value,
                    has_time: true,
                    text: text[end_range.clone()].trim().to_string(),
                    range: end_range,
                });
            }
        }
        out
    }
}

fn collect_dates<F>(
    pattern: &Lazy<Option<Regex>>,
    text: &str,
    out: &mut Vec<DateCandidate>,
    to_date: F,
) where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    let Some(re) = pattern.as_ref() else {
        return;
    };
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(date)) = (caps.get(0), to_date(&caps)) else {
            continue;
        };
        let mut range = whole.range();
        let start_time = match clock_after(&TIME_SUFFIX, text, range.end) {
            Some((time, consumed)) => {
                range.end += consumed;
                Some(time)
            }
            None => None,
        };
        let end = start_time.and_then(|_| {
            clock_after(&RANGE_SUFFIX, text, range.end).map(|(time, consumed)| {
                let end_start = range.end;
                (time, end_start..end_start + consumed)
            })
        });
        out.push(DateCandidate {
            date,
            start_time,
            range,
            end,
        });
    }
}

/// Parse a clock time at the start of `text[offset..]`.
///
/// Accepted only with minutes or an am/pm marker so that stray numbers are
/// not read as hours. Returns the time and the number of bytes consumed.
fn clock_after(
    pattern: &Lazy<Option<Regex>>,
    text: &str,
    offset: usize,
) -> Option<(ClockTime, usize)> {
    let re = pattern.as_ref()?;
    let rest = text.get(offset..)?;
    let caps = re.captures(rest)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2).map(|m| m.as_str().parse::<u32>()).transpose().ok()?;
    let meridiem = caps.get(3).map(|m| {
        if m.as_str().to_ascii_lowercase().starts_with('a') {
            Meridiem::Am
        } else {
            Meridiem::Pm
        }
    });
    if minute.is_none() && meridiem.is_none() {
        return None;
    }
    let time = ClockTime {
        hour,
        minute: minute.unwrap_or(0),
        meridiem,
    };
    time.to_naive(None)?;
    Some((time, caps.get(0)?.end()))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_year(m: Option<regex::Match<'_>>) -> Option<i32> {
    let raw = m?.as_str();
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Spans of grouped card numbers; phones never overlap them.
fn card_ranges(text: &str) -> Vec<Range<usize>> {
    let Some(re) = CARD_NUMBER.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .filter(|m| {
            let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
            (CARD_MIN_DIGITS..=CARD_MAX_DIGITS).contains(&digits)
        })
        .map(|m| m.range())
        .collect()
}

/// Whether the match is glued to another digit on either side.
fn touches_digit(text: &str, range: Range<usize>) -> bool {
    let before = text[..range.start].chars().next_back();
    let after = text[range.end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}

fn group(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
}
