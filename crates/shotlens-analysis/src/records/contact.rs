//! Contact card detection.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use shotlens_core::defaults::{
    CONTACT_COMPANY_MAX_CHARS, CONTACT_COMPANY_MIN_CHARS, CONTACT_COMPANY_SCAN_LINES,
    CONTACT_COMPANY_UPPER_RATIO, CONTACT_TITLE_MAX_CHARS, CONTACT_TITLE_MIN_CHARS,
};
use shotlens_core::{BasicEntities, ContactRecord, NameRecognizer};

use super::{has_keyword, word_set};
use crate::patterns::CAPITALIZED_PAIR;
use crate::text::{char_len, non_empty_lines, uppercase_ratio};

/// Legal-form suffixes matched case-insensitively, with or without a
/// trailing dot.
const COMPANY_SUFFIXES: &[&str] = &[
    "inc",
    "llc",
    "corp",
    "corporation",
    "ltd",
    "gmbh",
    "plc",
    "llp",
    "srl",
    "bv",
    "ооо",
];

/// Short forms that read as ordinary words unless written uppercase.
const UPPERCASE_SUFFIXES: &[&str] = &["AG", "SA"];

/// Short forms accepted only with their dots.
const DOTTED_SUFFIXES: &[&str] = &["co.", "s.a.", "a.g."];

const TITLE_KEYWORDS: &[&str] = &[
    "ceo",
    "cto",
    "cfo",
    "coo",
    "founder",
    "president",
    "vp",
    "director",
    "manager",
    "head",
    "lead",
    "engineer",
    "developer",
    "designer",
    "architect",
    "consultant",
    "analyst",
    "specialist",
    "officer",
    "partner",
    "attorney",
    "lawyer",
    "doctor",
    "professor",
    "recruiter",
    "sales",
    "marketing",
];

/// Assembles a [`ContactRecord`] from phones/emails and line heuristics.
#[derive(Clone, Default)]
pub struct ContactDetector {
    names: Option<Arc<dyn NameRecognizer>>,
}

impl fmt::Debug for ContactDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactDetector")
            .field("names", &self.names.is_some())
            .finish()
    }
}

impl ContactDetector {
    /// Detector using the capitalized-word-pair fallback for names.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_recognizer(names: Arc<dyn NameRecognizer>) -> Self {
        Self { names: Some(names) }
    }

    pub fn detect(&self, text: &str, entities: &BasicEntities) -> Option<ContactRecord> {
        if entities.phones.is_empty() && entities.emails.is_empty() {
            return None;
        }

        let lines = non_empty_lines(text);
        let name = self.person_name(text);
        let record = ContactRecord {
            company: company_line(&lines, name.as_deref()),
            job_title: title_line(&lines),
            phone: entities.phones.first().map(|m| m.value.clone()),
            email: entities.emails.first().map(|m| m.value.clone()),
            address: entities.addresses.first().map(|a| a.formatted()),
            name,
        };

        if !record.is_valid() {
            debug!("Contact candidate has no name");
            return None;
        }
        Some(record)
    }

    fn person_name(&self, text: &str) -> Option<String> {
        if let Some(recognizer) = &self.names {
            let recognized = recognizer
                .person_names(text)
                .into_iter()
                .map(|n| n.trim().to_string())
                .find(|n| !n.is_empty());
            if recognized.is_some() {
                return recognized;
            }
        }
        capitalized_pair(text)
    }
}

/// First two-capitalized-word pair that is not a company or job title.
fn capitalized_pair(text: &str) -> Option<String> {
    let re = CAPITALIZED_PAIR.as_ref()?;
    re.find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| {
            !has_company_suffix(candidate) && !has_keyword(&word_set(candidate), TITLE_KEYWORDS)
        })
        .map(str::to_string)
}

fn company_line(lines: &[&str], name: Option<&str>) -> Option<String> {
    let head: Vec<&str> = lines
        .iter()
        .copied()
        .take(CONTACT_COMPANY_SCAN_LINES)
        .filter(|line| !line.contains('@'))
        .filter(|line| name.map_or(true, |n| !line.contains(n)))
        .collect();

    head.iter()
        .find(|line| has_company_suffix(line))
        .or_else(|| {
            head.iter().find(|line| {
                (CONTACT_COMPANY_MIN_CHARS..=CONTACT_COMPANY_MAX_CHARS).contains(&char_len(line))
                    && uppercase_ratio(line).is_some_and(|r| r > CONTACT_COMPANY_UPPER_RATIO)
            })
        })
        .map(|line| line.to_string())
}

/// Whether a whitespace token of `line` is a legal-form suffix.
///
/// Tokens are taken from the raw line so hyphenated words such as
/// "Co-founder" never match `co.`.
fn has_company_suffix(line: &str) -> bool {
    let tokens: Vec<&str> = line
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\''))
        })
        .collect();

    tokens.iter().enumerate().any(|(i, token)| {
        let lower = token.to_lowercase();
        COMPANY_SUFFIXES.contains(&lower.trim_end_matches('.'))
            || DOTTED_SUFFIXES.contains(&lower.as_str())
            || UPPERCASE_SUFFIXES.contains(token)
            || (lower == "co" && i > 0 && tokens[i - 1] == "&")
    })
}

fn title_line(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| {
            (CONTACT_TITLE_MIN_CHARS..=CONTACT_TITLE_MAX_CHARS).contains(&char_len(line))
                && has_keyword(&word_set(line), TITLE_KEYWORDS)
        })
        .map(|line| line.to_string())
}
