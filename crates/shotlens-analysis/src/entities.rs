//! Basic entity extraction: URLs, emails, phones, addresses, dates.
//!
//! URLs and emails come from fixed patterns. Phones, dates and addresses are
//! delegated to a [`DataDetector`]; without one those categories stay empty.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tracing::debug;

use shotlens_core::{BasicEntities, DataDetector, TextMatch};

use crate::detector::PatternDataDetector;
use crate::patterns::{compile, resolve_overlaps, EMAIL};

static SCHEME_URL: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r#"(?i)\bhttps?://[^\s<>"'`]+"#));

static WWW_URL: Lazy<Option<Regex>> = Lazy::new(|| compile(r#"(?i)\bwww\.[^\s<>"'`]+"#));

static BARE_URL: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(
        r#"(?i)\b[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.(?:com|org|net|io|dev|app|co|ai|me|info|biz|edu|gov|ru|ua|pl|de|fr|es|it|nl|uk|us|ca|eu|ly|gg|tv|xyz|site|shop|store|link)\b(?:/[^\s<>"'`]*)?"#,
    )
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']'];

/// Extracts [`BasicEntities`] from raw recognized text.
#[derive(Clone, Default)]
pub struct EntityExtractor {
    detector: Option<Arc<dyn DataDetector>>,
}

impl fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityExtractor")
            .field("detector", &self.detector.is_some())
            .finish()
    }
}

impl EntityExtractor {
    /// Extractor without a data detector: URLs and emails only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: Arc<dyn DataDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// Extractor backed by the built-in [`PatternDataDetector`].
    pub fn with_pattern_detector() -> Self {
        Self::with_detector(Arc::new(PatternDataDetector::new()))
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// Extract entities, resolving year-less dates against today.
    pub fn extract(&self, text: &str) -> BasicEntities {
        self.extract_at(text, Local::now().date_naive())
    }

    /// Extract entities with an explicit reference date.
    pub fn extract_at(&self, text: &str, reference: NaiveDate) -> BasicEntities {
        let mut entities = BasicEntities {
            urls: extract_urls(text),
            emails: extract_emails(text),
            ..Default::default()
        };
        if let Some(detector) = &self.detector {
            entities.phones = detector.phones(text);
            entities.dates = detector.dates(text, reference);
            entities.addresses = detector.addresses(text);
        }
        debug!(
            urls = entities.urls.len(),
            emails = entities.emails.len(),
            phones = entities.phones.len(),
            addresses = entities.addresses.len(),
            dates = entities.dates.len(),
            "Entities extracted"
        );
        entities
    }
}

/// URLs in `text`, deduplicated by lowercased `(host, path, query)`.
pub fn extract_urls(text: &str) -> Vec<TextMatch> {
    let mut candidates = Vec::new();
    for (pattern, bare) in [(&SCHEME_URL, false), (&WWW_URL, false), (&BARE_URL, true)] {
        let Some(re) = pattern.as_ref() else {
            continue;
        };
        for m in re.find_iter(text) {
            if bare && !standalone_domain(text, m.start(), m.end()) {
                continue;
            }
            let trimmed = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if trimmed.is_empty() {
                continue;
            }
            candidates.push(TextMatch::new(trimmed, m.start()..m.start() + trimmed.len()));
        }
    }

    let mut seen = HashSet::new();
    resolve_overlaps(candidates, |c| c.range.clone())
        .into_iter()
        .filter_map(|candidate| {
            let value = with_scheme(&candidate.value);
            let key = url_key(&value)?;
            seen.insert(key)
                .then(|| TextMatch::new(value, candidate.range))
        })
        .collect()
}

/// Emails in `text`, deduplicated by exact string.
pub fn extract_emails(text: &str) -> Vec<TextMatch> {
    let Some(re) = EMAIL.as_ref() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    re.find_iter(text)
        .filter(|m| seen.insert(m.as_str()))
        .map(|m| TextMatch::new(m.as_str(), m.range()))
        .collect()
}

fn with_scheme(candidate: &str) -> String {
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        candidate.to_string()
    } else {
        format!("https://{candidate}")
    }
}

/// Dedup key; `None` when the value does not parse or has no host.
fn url_key(value: &str) -> Option<(String, String, String)> {
    let url = Url::parse(value).ok()?;
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();
    Some((
        host,
        url.path().to_lowercase(),
        url.query().unwrap_or_default().to_lowercase(),
    ))
}

/// A bare domain must not be part of an email address.
fn standalone_domain(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c == '@' || c.is_alphanumeric() || c == '_')
        && after != Some('@')
}
