//! Data model shared by every shotlens stage.
//!
//! Coordinates are normalized to the unit square with the origin at the
//! bottom-left corner of the image: `(0,0)` is bottom-left, `(1,1)` is
//! top-right. Widths and heights are fractions of the image size.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::PLACEHOLDER_TITLE;

// =============================================================================
// RECOGNITION INPUT
// =============================================================================

fn default_confidence() -> f32 {
    1.0
}

/// One recognized text fragment with its normalized bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Left edge.
    pub x: f64,
    /// Bottom edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Recognizer confidence (0.0-1.0).
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    /// Top edge of the block.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// True when every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// A ranked scene/context guess supplied by an image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHint {
    pub label: String,
    pub confidence: f32,
}

impl ContextHint {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Everything the external recognizer reports for one image.
///
/// Every field may be empty; the pipeline treats missing data as absence of
/// signal, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutput {
    /// Text blocks in discovery order.
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub barcode_payload: Option<String>,
    #[serde(default)]
    pub document_rect_count: usize,
    /// Context hints, highest confidence first.
    #[serde(default)]
    pub context_hints: Vec<ContextHint>,
}

impl RecognitionOutput {
    /// Raw OCR text: block texts joined by newlines in discovery order.
    pub fn raw_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An image handed to the service: stable identifier plus pixel buffer.
#[derive(Debug, Clone, Default)]
pub struct ImageInput {
    pub id: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageInput {
    pub fn new(id: impl Into<String>, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            data,
            width,
            height,
        }
    }

    /// Whether the image carries any pixel data at all.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

// =============================================================================
// RECONSTRUCTED DOCUMENT
// =============================================================================

/// One or more text blocks merged into a single visual line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub text: String,
    /// Bottom edge of the first merged block.
    pub y: f64,
    /// Tallest merged block height.
    pub height: f64,
}

/// Structural role assigned to a line during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LineKind {
    Heading { level: u8 },
    NumberedItem,
    Bullet,
    Quote,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    #[serde(flatten)]
    pub kind: LineKind,
    pub text: String,
}

/// Which path produced a reconstructed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionSource {
    #[default]
    Heuristic,
    Model,
    /// Degraded: raw block text joined by newlines.
    RawText,
}

impl ReconstructionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Model => "model",
            Self::RawText => "raw_text",
        }
    }
}

/// Markdown-like document rebuilt from scattered text blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedDocument {
    pub lines: Vec<DocumentLine>,
    pub classified: Vec<ClassifiedLine>,
    pub markdown: String,
    pub source: ReconstructionSource,
}

impl ReconstructedDocument {
    /// Degraded document carrying only the given text.
    pub fn from_raw_text(text: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            classified: Vec::new(),
            markdown: text.into(),
            source: ReconstructionSource::RawText,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Kind of an extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Url,
    Email,
    Phone,
    Address,
    Date,
    Event,
    Person,
    Organization,
    Location,
    Custom,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Date => "date",
            Self::Event => "event",
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Custom => "custom",
        }
    }
}

/// A typed value pulled out of the screenshot text, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub value: String,
    /// Byte range in the source text.
    pub source_range: Option<Range<usize>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ExtractedEntity {
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            source_range: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_range(mut self, range: Range<usize>) -> Self {
        self.source_range = Some(range);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A plain textual match (URL, email, phone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub value: String,
    pub range: Range<usize>,
}

impl TextMatch {
    pub fn new(value: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            value: value.into(),
            range,
        }
    }
}

/// Structured breakdown of a postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl AddressComponents {
    /// Present components joined by `", "` in street, city, state, zip, country order.
    pub fn formatted(&self) -> String {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.zip,
            &self.country,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.formatted().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMatch {
    pub components: AddressComponents,
    pub range: Range<usize>,
}

impl AddressMatch {
    pub fn formatted(&self) -> String {
        self.components.formatted()
    }
}

/// A detected calendar date (and optional time of day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMatch {
    pub value: NaiveDateTime,
    /// False when only a calendar day was found (time is midnight).
    pub has_time: bool,
    /// Matched source text.
    pub text: String,
    pub range: Range<usize>,
}

/// Output of the basic entity extractor; each list is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicEntities {
    pub urls: Vec<TextMatch>,
    pub emails: Vec<TextMatch>,
    pub phones: Vec<TextMatch>,
    pub addresses: Vec<AddressMatch>,
    pub dates: Vec<DateMatch>,
}

impl BasicEntities {
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
            && self.emails.is_empty()
            && self.phones.is_empty()
            && self.addresses.is_empty()
            && self.dates.is_empty()
    }

    /// Flatten into typed entities (urls, emails, phones, addresses, dates).
    pub fn to_entities(&self) -> Vec<ExtractedEntity> {
        let mut out = Vec::new();
        for (kind, matches) in [
            (EntityKind::Url, &self.urls),
            (EntityKind::Email, &self.emails),
            (EntityKind::Phone, &self.phones),
        ] {
            out.extend(
                matches
                    .iter()
                    .map(|m| ExtractedEntity::new(kind, m.value.clone()).with_range(m.range.clone())),
            );
        }
        for address in &self.addresses {
            let mut entity = ExtractedEntity::new(EntityKind::Address, address.formatted())
                .with_range(address.range.clone());
            let c = &address.components;
            for (key, value) in [
                ("street", &c.street),
                ("city", &c.city),
                ("state", &c.state),
                ("zip", &c.zip),
                ("country", &c.country),
            ] {
                if let Some(value) = value {
                    entity = entity.with_metadata(key, value.clone());
                }
            }
            out.push(entity);
        }
        for date in &self.dates {
            out.push(
                ExtractedEntity::new(EntityKind::Date, date.text.clone())
                    .with_range(date.range.clone())
                    .with_metadata("iso", date.value.format("%Y-%m-%dT%H:%M:%S").to_string())
                    .with_metadata("has_time", date.has_time.to_string()),
            );
        }
        out
    }
}

// =============================================================================
// SEMANTIC RECORDS
// =============================================================================

/// A calendar event assembled from dates and line heuristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl EventRecord {
    /// A start plus either a name or a location.
    pub fn is_valid(&self) -> bool {
        self.start.is_some() && (self.name.is_some() || self.location.is_some())
    }

    /// Weighted sum over populated fields (0.0-1.0).
    pub fn confidence(&self) -> f32 {
        let mut score = 0.0;
        if self.start.is_some() {
            score += 0.3;
        }
        if self.name.is_some() {
            score += 0.3;
        }
        if self.location.is_some() {
            score += 0.2;
        }
        if self.end.is_some() {
            score += 0.1;
        }
        if self.description.is_some() {
            score += 0.1;
        }
        score
    }
}

/// A contact card assembled from phones/emails and line heuristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ContactRecord {
    /// A name plus either a phone or an email.
    pub fn is_valid(&self) -> bool {
        self.name.is_some() && (self.phone.is_some() || self.email.is_some())
    }

    /// Weighted sum over populated fields (0.0-1.0).
    pub fn confidence(&self) -> f32 {
        [
            (self.name.is_some(), 0.3),
            (self.phone.is_some(), 0.2),
            (self.email.is_some(), 0.2),
            (self.company.is_some(), 0.1),
            (self.job_title.is_some(), 0.1),
            (self.address.is_some(), 0.1),
        ]
        .into_iter()
        .filter(|(present, _)| *present)
        .map(|(_, weight)| weight)
        .sum()
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Closed set of screenshot types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotType {
    Qr,
    Receipt,
    BusinessCard,
    CreditCard,
    Link,
    Document,
    Chat,
    Product,
    AppScreen,
    Media,
    GenericText,
    #[default]
    Photo,
}

impl ScreenshotType {
    pub const ALL: [ScreenshotType; 12] = [
        Self::Qr,
        Self::Receipt,
        Self::BusinessCard,
        Self::CreditCard,
        Self::Link,
        Self::Document,
        Self::Chat,
        Self::Product,
        Self::AppScreen,
        Self::Media,
        Self::GenericText,
        Self::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Receipt => "receipt",
            Self::BusinessCard => "business_card",
            Self::CreditCard => "credit_card",
            Self::Link => "link",
            Self::Document => "document",
            Self::Chat => "chat",
            Self::Product => "product",
            Self::AppScreen => "app_screen",
            Self::Media => "media",
            Self::GenericText => "generic_text",
            Self::Photo => "photo",
        }
    }
}

impl std::fmt::Display for ScreenshotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub type_label: ScreenshotType,
    pub confidence: f32,
    pub title: String,
}

impl ClassificationResult {
    pub fn new(type_label: ScreenshotType, confidence: f32, title: impl Into<String>) -> Self {
        Self {
            type_label,
            confidence,
            title: title.into(),
        }
    }

    /// Lowest-confidence label, used when classification itself fails.
    pub fn fallback() -> Self {
        Self::new(ScreenshotType::Photo, 0.0, PLACEHOLDER_TITLE)
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::fallback()
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddToCalendar,
    SaveContact,
    OpenUrl,
    Call,
    SendEmail,
    OpenInMaps,
    CopyText,
}

/// An action the UI can offer; lower `priority` sorts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub kind: ActionKind,
    pub label: String,
    pub payload: String,
    pub priority: u8,
}

// =============================================================================
// FINAL RESULT
// =============================================================================

/// Final output of one analysis run.
///
/// Never mutated after creation. A later analysis of the same image produces
/// a new instance that replaces this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub analysis_id: Uuid,
    pub image_id: String,
    pub raw_text: String,
    pub document_text: String,
    pub reconstruction: ReconstructionSource,
    pub language: Option<String>,
    pub entities: Vec<ExtractedEntity>,
    pub event: Option<EventRecord>,
    pub contact: Option<ContactRecord>,
    pub classification: ClassificationResult,
    pub actions: Vec<SuggestedAction>,
    pub analyzed_at: DateTime<Utc>,
}

impl ProcessedResult {
    /// Fully empty result for an image that could not be analyzed at all.
    pub fn empty(image_id: impl Into<String>) -> Self {
        Self {
            analysis_id: Uuid::now_v7(),
            image_id: image_id.into(),
            raw_text: String::new(),
            document_text: String::new(),
            reconstruction: ReconstructionSource::RawText,
            language: None,
            entities: Vec::new(),
            event: None,
            contact: None,
            classification: ClassificationResult::fallback(),
            actions: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    /// True when nothing beyond the placeholder classification was extracted.
    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
            && self.entities.is_empty()
            && self.event.is_none()
            && self.contact.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_text_block_top_and_finite() {
        let block = TextBlock::new("hello", 0.1, 0.5, 0.3, 0.02);
        assert!((block.top() - 0.52).abs() < 1e-9);
        assert!(block.is_finite());

        let bad = TextBlock::new("bad", f64::NAN, 0.5, 0.3, 0.02);
        assert!(!bad.is_finite());
    }

    #[test]
    fn test_text_block_confidence_defaults_when_missing() {
        let json = r#"{"text":"Hi","x":0.1,"y":0.2,"width":0.1,"height":0.02}"#;
        let block: TextBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.confidence, 1.0);
    }

    #[test]
    fn test_recognition_output_tolerates_missing_fields() {
        let output: RecognitionOutput = serde_json::from_str("{}").unwrap();
        assert!(output.blocks.is_empty());
        assert!(output.barcode_payload.is_none());
        assert_eq!(output.document_rect_count, 0);
        assert_eq!(output.raw_text(), "");
    }

    #[test]
    fn test_raw_text_keeps_discovery_order() {
        let output = RecognitionOutput {
            blocks: vec![
                TextBlock::new("second", 0.0, 0.1, 0.2, 0.02),
                TextBlock::new("first", 0.0, 0.9, 0.2, 0.02),
            ],
            ..Default::default()
        };
        assert_eq!(output.raw_text(), "second\nfirst");
    }

    #[test]
    fn test_address_formatted_skips_missing_components() {
        let address = AddressComponents {
            street: Some("1 Infinite Loop".into()),
            city: Some("Cupertino".into()),
            state: None,
            zip: Some("95014".into()),
            country: None,
        };
        assert_eq!(address.formatted(), "1 Infinite Loop, Cupertino, 95014");
        assert!(AddressComponents::default().is_empty());
    }

    #[test]
    fn test_event_validity() {
        let mut event = EventRecord {
            start: Some(at(2025, 1, 15, 15, 0)),
            ..Default::default()
        };
        assert!(!event.is_valid());

        event.location = Some("Hall B".into());
        assert!(event.is_valid());

        event.start = None;
        assert!(!event.is_valid());
    }

    #[test]
    fn test_event_confidence_weights() {
        let full = EventRecord {
            name: Some("Summit".into()),
            start: Some(at(2025, 1, 15, 15, 0)),
            end: Some(at(2025, 1, 15, 17, 0)),
            location: Some("Hall B".into()),
            description: Some("Annual planning for the whole team".into()),
        };
        assert!((full.confidence() - 1.0).abs() < 1e-6);

        let partial = EventRecord {
            name: Some("Summit".into()),
            start: Some(at(2025, 1, 15, 15, 0)),
            ..Default::default()
        };
        assert!((partial.confidence() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_contact_validity_and_confidence() {
        let mut contact = ContactRecord {
            phone: Some("555-1234".into()),
            email: Some("jane@co.com".into()),
            ..Default::default()
        };
        assert!(!contact.is_valid());

        contact.name = Some("Jane Doe".into());
        assert!(contact.is_valid());
        assert!((contact.confidence() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_basic_entities_flatten_order() {
        let entities = BasicEntities {
            urls: vec![TextMatch::new("https://example.com", 0..11)],
            emails: vec![TextMatch::new("jane@co.com", 12..23)],
            dates: vec![DateMatch {
                value: at(2025, 1, 15, 15, 0),
                has_time: true,
                text: "Jan 15, 2025 3:00 PM".into(),
                range: 24..44,
            }],
            ..Default::default()
        };
        let flat = entities.to_entities();
        let kinds: Vec<_> = flat.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Url, EntityKind::Email, EntityKind::Date]);
        assert_eq!(flat[2].metadata["iso"], "2025-01-15T15:00:00");
        assert_eq!(flat[2].metadata["has_time"], "true");
    }

    #[test]
    fn test_screenshot_type_serializes_snake_case() {
        let json = serde_json::to_string(&ScreenshotType::BusinessCard).unwrap();
        assert_eq!(json, "\"business_card\"");
        for ty in ScreenshotType::ALL {
            let round: ScreenshotType =
                serde_json::from_str(&format!("\"{}\"", ty.as_str())).unwrap();
            assert_eq!(round, ty);
        }
    }

    #[test]
    fn test_classification_fallback() {
        let fallback = ClassificationResult::fallback();
        assert_eq!(fallback.type_label, ScreenshotType::Photo);
        assert_eq!(fallback.confidence, 0.0);
        assert_eq!(fallback.title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_processed_result_empty() {
        let result = ProcessedResult::empty("img-1");
        assert_eq!(result.image_id, "img-1");
        assert!(result.is_empty());
        assert!(result.actions.is_empty());
        assert_eq!(result.classification.confidence, 0.0);
    }

    #[test]
    fn test_line_kind_serialization() {
        let line = ClassifiedLine {
            kind: LineKind::Heading { level: 1 },
            text: "Title".into(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["kind"], "heading");
        assert_eq!(json["level"], 1);
        assert_eq!(json["text"], "Title");
    }
}
