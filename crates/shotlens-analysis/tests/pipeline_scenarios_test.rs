//! End-to-end scenarios through the analysis pipeline.

use chrono::NaiveDate;

use shotlens_analysis::{
    looks_like_chat, AnalysisPipeline, ClassificationSignals, ContactDetector, EntityExtractor,
    EventDetector, PipelineConfig, ScreenshotClassifier,
};
use shotlens_core::{
    ActionKind, BasicEntities, ContextHint, RecognitionOutput, ScreenshotType, TextBlock,
};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::builder()
        .config(PipelineConfig::default().with_reference_date(reference()))
        .build()
}

/// One block per line, top to bottom, each `height` tall.
fn stacked(lines: &[&str], height: f64) -> Vec<TextBlock> {
    lines
        .iter()
        .enumerate()
        .map(|(i, text)| TextBlock::new(*text, 0.05, 0.95 - (i as f64 + 1.0) * height * 2.0, 0.9, height))
        .collect()
}

#[test]
fn test_conference_example_event() {
    let text = "Conference Room B\nJan 15, 2025 3:00 PM\nAnnual Planning Summit";
    let entities = EntityExtractor::with_pattern_detector().extract_at(text, reference());
    assert_eq!(entities.dates.len(), 1);

    let event = EventDetector::new()
        .detect(text, &entities, &[])
        .expect("event detected");
    assert_eq!(event.name.as_deref(), Some("Conference Room B"));
    assert_eq!(
        event.start,
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(15, 0, 0)
    );
    assert!(event.location.is_some());
}

#[test]
fn test_nameless_contact_example() {
    let text = "555-1234\njane@co.com";
    let entities = EntityExtractor::with_pattern_detector().extract_at(text, reference());
    assert_eq!(entities.phones.len(), 1);
    assert_eq!(entities.emails.len(), 1);
    assert!(ContactDetector::new().detect(text, &entities).is_none());
}

#[test]
fn test_qr_example() {
    let entities = BasicEntities::default();
    let signals = ClassificationSignals {
        barcode_payload: Some("https://example.com/promo"),
        text_density: 0.0,
        document_rect_count: 0,
        text: "",
        entities: &entities,
        hints: &[],
    };
    let result = ScreenshotClassifier::new().classify(&signals);
    assert_eq!(result.type_label, ScreenshotType::Qr);
    assert_eq!(result.title, "example.com");
}

#[test]
fn test_chat_example() {
    // ten short lines, five of them timestamped, average length 18
    let lines = [
        "Are we still on?  ",
        "Sure, see you 9:41",
        "Bring the slides!!",
        "Will do, at 10:02.",
        "Running late, sry!",
        "No worries 10:15 x",
        "Parking is full :(",
        "Try lot B at 10:20",
        "Found a spot, thx!",
        "Great, here 10:31 ",
    ];
    let text = lines.join("\n");
    assert!(looks_like_chat(&text));
}

#[tokio::test]
async fn test_receipt_screenshot() {
    let blocks = stacked(
        &[
            "Corner Bakery",
            "2 x Croissant",
            "1 x Latte",
            "Total $12.50",
            "Thank you!",
        ],
        0.03,
    );
    let output = RecognitionOutput {
        blocks,
        ..Default::default()
    };
    let result = pipeline().run("receipt-1", output).await;
    assert_eq!(result.classification.type_label, ScreenshotType::Receipt);
    assert_eq!(result.classification.title, "Corner Bakery");
    assert!(result
        .actions
        .iter()
        .any(|a| a.kind == ActionKind::CopyText));
}

#[tokio::test]
async fn test_link_screenshot_with_markdown() {
    let blocks = vec![
        TextBlock::new("Release Notes", 0.05, 0.85, 0.5, 0.05),
        TextBlock::new("- faster startup", 0.05, 0.75, 0.5, 0.02),
        TextBlock::new("- smaller binaries", 0.05, 0.70, 0.5, 0.02),
        TextBlock::new("Read more at blog.example.com/releases", 0.05, 0.65, 0.8, 0.02),
    ];
    let output = RecognitionOutput {
        blocks,
        context_hints: vec![ContextHint::new("document", 0.7)],
        ..Default::default()
    };
    let result = pipeline().run("link-1", output).await;
    assert_eq!(result.classification.type_label, ScreenshotType::Link);
    assert_eq!(result.classification.title, "blog.example.com");
    assert!(result
        .document_text
        .starts_with("# Release Notes\n\n- faster startup\n- smaller binaries"));
}

#[tokio::test]
async fn test_social_post_without_event_keyword_has_no_event() {
    let blocks = stacked(
        &[
            "3h",
            "What a sunset on Jan 20",
            "1.2k likes",
            "87 comments",
        ],
        0.02,
    );
    let output = RecognitionOutput {
        blocks,
        context_hints: vec![ContextHint::new("social media feed", 0.6)],
        ..Default::default()
    };
    let result = pipeline().run("post-1", output).await;
    assert!(result.event.is_none());
}

#[tokio::test]
async fn test_repeated_runs_replace_rather_than_merge() {
    let output = RecognitionOutput {
        blocks: stacked(&["Call 555-1234"], 0.02),
        ..Default::default()
    };
    let pipeline = pipeline();
    let first = pipeline.run("same", output.clone()).await;
    let second = pipeline.run("same", output).await;
    assert_ne!(first.analysis_id, second.analysis_id);
    assert_eq!(first.entities, second.entities);
}
