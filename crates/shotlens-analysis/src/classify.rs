//! Screenshot type classification.
//!
//! A strict priority cascade over the collected signals: the first rule that
//! matches decides the label. Every input lands on exactly one
//! [`ScreenshotType`]; `Photo` is the catch-all.

use reqwest::Url;
use tracing::debug;

use shotlens_core::defaults::{
    APP_SCREEN_DENSITY, CARD_MAX_DIGITS, CARD_MIN_DIGITS, CHAT_DENSITY, CHAT_MAX_AVG_LINE_CHARS,
    CHAT_MIN_LINES, CHAT_MIN_TIME_LINES, CHAT_MIN_TIME_RATIO, DOCUMENT_DENSITY_WITH_HINT,
    DOCUMENT_DENSITY_WITH_RECTS, GENERIC_TEXT_DENSITY, HINT_CONFIDENCE_FLOOR,
    PHOTO_HINT_TITLE_CONFIDENCE, PLACEHOLDER_TITLE, PRODUCT_DENSITY, QR_TITLE_MAX_CHARS,
    TITLE_MAX_CHARS,
};
use shotlens_core::{
    BasicEntities, ClassificationResult, ContextHint, RecognitionOutput, ScreenshotType, TextBlock,
};

use crate::patterns::{matches, CARD_NUMBER, CLOCK_TIME, CURRENCY_AMOUNT};
use crate::records::{has_keyword, word_set};
use crate::text::{char_len, first_meaningful_line, non_empty_lines, truncate_chars};

const DOCUMENT_HINTS: &[&str] = &["document", "paper", "page"];
const CHAT_HINTS: &[&str] = &["chat"];
const COMMERCE_HINTS: &[&str] = &["shopping", "commerce"];
const APP_HINTS: &[&str] = &["app", "interface", "software"];
const MEDIA_HINTS: &[&str] = &["poster", "movie", "media"];

/// Everything the classifier looks at, borrowed from earlier stages.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationSignals<'a> {
    pub barcode_payload: Option<&'a str>,
    /// Fraction of image height covered by recognized text.
    pub text_density: f64,
    pub document_rect_count: usize,
    pub text: &'a str,
    pub entities: &'a BasicEntities,
    pub hints: &'a [ContextHint],
}

impl<'a> ClassificationSignals<'a> {
    /// Signals from a recognition output, its text and the extracted entities.
    pub fn from_recognition(
        output: &'a RecognitionOutput,
        text: &'a str,
        entities: &'a BasicEntities,
    ) -> Self {
        Self {
            barcode_payload: output.barcode_payload.as_deref(),
            text_density: text_density(&output.blocks),
            document_rect_count: output.document_rect_count,
            text,
            entities,
            hints: &output.context_hints,
        }
    }

    fn hint(&self, keywords: &[&str]) -> bool {
        self.hints.iter().any(|h| {
            h.confidence >= HINT_CONFIDENCE_FLOOR && has_keyword(&word_set(&h.label), keywords)
        })
    }

    fn top_hint(&self) -> Option<&'a ContextHint> {
        self.hints
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

type Rule = fn(&ClassificationSignals<'_>) -> bool;

/// Rules in priority order; `Photo` is the fallthrough.
const CASCADE: [(ScreenshotType, Rule); 11] = [
    (ScreenshotType::Qr, is_qr),
    (ScreenshotType::Receipt, is_receipt),
    (ScreenshotType::BusinessCard, is_business_card),
    (ScreenshotType::CreditCard, is_credit_card),
    (ScreenshotType::Link, is_link),
    (ScreenshotType::Document, is_document),
    (ScreenshotType::Chat, is_chat),
    (ScreenshotType::Product, is_product),
    (ScreenshotType::AppScreen, is_app_screen),
    (ScreenshotType::Media, is_media),
    (ScreenshotType::GenericText, is_generic_text),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenshotClassifier;

impl ScreenshotClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, signals: &ClassificationSignals<'_>) -> ClassificationResult {
        let label = CASCADE
            .iter()
            .find(|(_, rule)| rule(signals))
            .map_or(ScreenshotType::Photo, |(label, _)| *label);

        let result = ClassificationResult::new(label, confidence(label, signals), title(label, signals));
        debug!(
            type_label = %result.type_label,
            confidence = result.confidence,
            density = signals.text_density,
            "Screenshot classified"
        );
        result
    }
}

// =============================================================================
// RULES
// =============================================================================

fn is_qr(s: &ClassificationSignals<'_>) -> bool {
    s.barcode_payload.is_some_and(|p| !p.trim().is_empty())
}

fn is_receipt(s: &ClassificationSignals<'_>) -> bool {
    matches(&CURRENCY_AMOUNT, s.text)
}

fn is_business_card(s: &ClassificationSignals<'_>) -> bool {
    !s.entities.phones.is_empty() && !s.entities.emails.is_empty()
}

fn is_credit_card(s: &ClassificationSignals<'_>) -> bool {
    s.document_rect_count > 0 && has_card_number(s.text)
}

fn is_link(s: &ClassificationSignals<'_>) -> bool {
    !s.entities.urls.is_empty()
}

fn is_document(s: &ClassificationSignals<'_>) -> bool {
    (s.text_density > DOCUMENT_DENSITY_WITH_RECTS && s.document_rect_count > 0)
        || (s.text_density > DOCUMENT_DENSITY_WITH_HINT && s.hint(DOCUMENT_HINTS))
}

fn is_chat(s: &ClassificationSignals<'_>) -> bool {
    looks_like_chat(s.text) && (s.text_density > CHAT_DENSITY || s.hint(CHAT_HINTS))
}

fn is_product(s: &ClassificationSignals<'_>) -> bool {
    s.hint(COMMERCE_HINTS) && s.text_density > PRODUCT_DENSITY
}

// URLs never reach this rule; `is_link` runs first.
fn is_app_screen(s: &ClassificationSignals<'_>) -> bool {
    s.hint(APP_HINTS) && s.text_density > APP_SCREEN_DENSITY
}

fn is_media(s: &ClassificationSignals<'_>) -> bool {
    s.hint(MEDIA_HINTS)
}

fn is_generic_text(s: &ClassificationSignals<'_>) -> bool {
    s.text_density > GENERIC_TEXT_DENSITY
}

/// Short lines, many of them carrying a `H:MM` timestamp.
pub fn looks_like_chat(text: &str) -> bool {
    let lines = non_empty_lines(text);
    if lines.len() < CHAT_MIN_LINES {
        return false;
    }
    let total_chars: usize = lines.iter().map(|l| char_len(l)).sum();
    let avg_len = total_chars as f64 / lines.len() as f64;
    let timed = lines.iter().filter(|l| matches(&CLOCK_TIME, l)).count();
    avg_len < CHAT_MAX_AVG_LINE_CHARS
        && timed >= CHAT_MIN_TIME_LINES
        && timed as f64 / lines.len() as f64 >= CHAT_MIN_TIME_RATIO
}

fn has_card_number(text: &str) -> bool {
    let Some(re) = CARD_NUMBER.as_ref() else {
        return false;
    };
    re.find_iter(text).any(|m| {
        let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
        (CARD_MIN_DIGITS..=CARD_MAX_DIGITS).contains(&digits)
    })
}

/// Fraction of the unit height covered by the union of block extents.
pub fn text_density(blocks: &[TextBlock]) -> f64 {
    let mut spans: Vec<(f64, f64)> = blocks
        .iter()
        .filter(|b| b.is_finite())
        .map(|b| (b.y.clamp(0.0, 1.0), b.top().clamp(0.0, 1.0)))
        .filter(|(lo, hi)| hi > lo)
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut covered = 0.0_f64;
    let mut current: Option<(f64, f64)> = None;
    for (lo, hi) in spans {
        current = match current {
            Some((start, end)) if lo <= end => Some((start, end.max(hi))),
            Some((start, end)) => {
                covered += end - start;
                Some((lo, hi))
            }
            None => Some((lo, hi)),
        };
    }
    if let Some((start, end)) = current {
        covered += end - start;
    }
    covered.clamp(0.0, 1.0)
}

// =============================================================================
// CONFIDENCE & TITLES
// =============================================================================

fn confidence(label: ScreenshotType, s: &ClassificationSignals<'_>) -> f32 {
    match label {
        ScreenshotType::Qr => 0.98,
        ScreenshotType::CreditCard => 0.9,
        ScreenshotType::Receipt | ScreenshotType::BusinessCard => 0.85,
        ScreenshotType::Link => 0.8,
        ScreenshotType::Document | ScreenshotType::Chat => 0.75,
        ScreenshotType::Product => 0.65,
        ScreenshotType::AppScreen | ScreenshotType::Media => 0.6,
        ScreenshotType::GenericText => 0.5,
        ScreenshotType::Photo => s.top_hint().map_or(0.3, |h| h.confidence.clamp(0.0, 1.0)),
    }
}

fn title(label: ScreenshotType, s: &ClassificationSignals<'_>) -> String {
    let content = || first_meaningful_line(s.text, TITLE_MAX_CHARS);
    match label {
        ScreenshotType::Qr => qr_title(s.barcode_payload.unwrap_or_default()),
        ScreenshotType::Link => s
            .entities
            .urls
            .first()
            .and_then(|u| host_of(&u.value))
            .or_else(content)
            .unwrap_or_else(|| "Link".to_string()),
        // Never derived from text: it could expose the card number.
        ScreenshotType::CreditCard => "Credit Card".to_string(),
        ScreenshotType::Photo => s
            .top_hint()
            .filter(|h| h.confidence > PHOTO_HINT_TITLE_CONFIDENCE)
            .map(|h| capitalize(&h.label))
            .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
        other => content().unwrap_or_else(|| fallback_title(other).to_string()),
    }
}

fn qr_title(payload: &str) -> String {
    let payload = payload.trim();
    host_of(payload).unwrap_or_else(|| truncate_chars(payload, QR_TITLE_MAX_CHARS))
}

fn host_of(value: &str) -> Option<String> {
    Url::parse(value)
        .ok()?
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

fn fallback_title(label: ScreenshotType) -> &'static str {
    match label {
        ScreenshotType::Receipt => "Receipt",
        ScreenshotType::BusinessCard => "Business Card",
        ScreenshotType::Document => "Document",
        ScreenshotType::Chat => "Chat",
        ScreenshotType::Product => "Product",
        ScreenshotType::AppScreen => "App Screen",
        ScreenshotType::Media => "Media",
        ScreenshotType::GenericText => "Text",
        _ => PLACEHOLDER_TITLE,
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => PLACEHOLDER_TITLE.to_string(),
    }
}
