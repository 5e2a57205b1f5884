//! Integration tests for AnalysisService.
//!
//! Covers:
//! - Gate bounds concurrency under a burst of requests, measured both by
//!   the gate and inside the recognizer
//! - Passive cache hits never reach the recognizer
//! - Forced analysis replaces the cached result
//! - Empty images short-circuit
//! - Debounced requests coalesce into the last one
//! - Recognizer failures degrade instead of erroring

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use shotlens_analysis::AnalysisPipeline;
use shotlens_core::{
    Error, ImageInput, RecognitionOutput, Result, ScreenshotType, TextBlock, TextRecognizer,
};
use shotlens_jobs::{AnalysisMode, AnalysisService, ServiceConfig, ServiceEvent};

// ============================================================================
// HELPERS
// ============================================================================

/// Recognizer that counts calls, optionally takes a while, and records how
/// many recognitions overlapped.
struct CountingRecognizer {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
}

impl CountingRecognizer {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for CountingRecognizer {
    async fn recognize(&self, _image: &ImageInput) -> Result<RecognitionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(RecognitionOutput {
            blocks: vec![TextBlock::new("Call 555-1234", 0.1, 0.5, 0.5, 0.03)],
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct OfflineRecognizer;

#[async_trait]
impl TextRecognizer for OfflineRecognizer {
    async fn recognize(&self, _image: &ImageInput) -> Result<RecognitionOutput> {
        Err(Error::Recognition("recognizer offline".into()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

fn service(recognizer: Arc<dyn TextRecognizer>, max_concurrent: usize) -> AnalysisService {
    AnalysisService::new(
        recognizer,
        AnalysisPipeline::default(),
        ServiceConfig::default()
            .with_max_concurrent(max_concurrent)
            .with_debounce_ms(100),
    )
}

fn image(id: &str) -> ImageInput {
    ImageInput::new(id, vec![1, 2, 3, 4], 2, 2)
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_gate_bounds_concurrency_under_load() {
    let recognizer = CountingRecognizer::new(Duration::from_millis(50));
    let service = service(recognizer.clone(), 2);

    let images = (0..8).map(|i| image(&format!("img-{i}"))).collect();
    let outcomes = service.analyze_batch(images, AnalysisMode::Passive).await;

    assert_eq!(outcomes.len(), 8);
    for (i, outcome) in outcomes.iter().enumerate() {
        let outcome = outcome.as_ref().expect("analysis succeeds");
        assert_eq!(outcome.result().image_id, format!("img-{i}"));
    }
    assert_eq!(recognizer.calls(), 8);
    assert_eq!(recognizer.max_active(), 2);
    assert_eq!(service.gate().peak(), 2);
    assert_eq!(service.gate().in_flight(), 0);
    assert_eq!(service.cache().len().await, 8);
}

#[tokio::test]
async fn test_passive_hit_skips_recognizer() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 2);
    let mut events = service.events();

    let first = service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap();
    let second = service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap();

    assert!(!first.is_cached());
    assert!(second.is_cached());
    assert_eq!(recognizer.calls(), 1);
    assert_eq!(first.result().analysis_id, second.result().analysis_id);

    let mut saw_hit = false;
    while let Ok(event) = events.try_recv() {
        if event == (ServiceEvent::CacheHit { image_id: "a".into() }) {
            saw_hit = true;
        }
    }
    assert!(saw_hit);
}

#[tokio::test]
async fn test_forced_analysis_replaces_cached_result() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 2);

    let first = service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap();
    let forced = service
        .analyze(image("a"), AnalysisMode::Forced)
        .await
        .unwrap();

    assert!(!forced.is_cached());
    assert_eq!(recognizer.calls(), 2);
    assert_ne!(first.result().analysis_id, forced.result().analysis_id);

    let cached = service.cache().get("a").await.unwrap();
    assert_eq!(cached.analysis_id, forced.result().analysis_id);
    assert_eq!(service.cache().len().await, 1);
}

#[tokio::test]
async fn test_empty_image_short_circuits() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 2);

    let outcome = service
        .analyze(ImageInput::new("blank", Vec::new(), 0, 0), AnalysisMode::Passive)
        .await
        .unwrap();

    assert!(outcome.result().is_empty());
    assert_eq!(outcome.result().classification.type_label, ScreenshotType::Photo);
    assert_eq!(recognizer.calls(), 0);
    assert!(!service.cache().contains("blank").await);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_requests_coalesce() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 2);

    let handles: Vec<_> = (0..5)
        .map(|i| service.analyze_debounced(image(&format!("scroll-{i}")), AnalysisMode::Passive))
        .collect();

    let mut ran = Vec::new();
    for handle in handles {
        if let Some(outcome) = handle.await.unwrap() {
            ran.push(outcome.unwrap().result().image_id.clone());
        }
    }

    assert_eq!(ran, vec!["scroll-4".to_string()]);
    assert_eq!(recognizer.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_pending_drops_debounced_request() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 2);

    let handle = service.analyze_debounced(image("a"), AnalysisMode::Passive);
    service.cancel_pending();

    assert!(handle.await.unwrap().is_none());
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn test_recognizer_failure_degrades_to_empty_input() {
    let service = service(Arc::new(OfflineRecognizer), 2);

    let outcome = service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap();

    let result = outcome.result();
    assert!(result.raw_text.is_empty());
    assert!(result.entities.is_empty());
    assert_eq!(result.classification.type_label, ScreenshotType::Photo);
}

#[tokio::test]
async fn test_events_for_fresh_run() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer, 2);
    let mut events = service.events();

    service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        ServiceEvent::AnalysisStarted { image_id: "a".into() }
    );
    match events.try_recv().unwrap() {
        ServiceEvent::AnalysisCompleted { image_id, .. } => assert_eq!(image_id, "a"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_closed_gate_is_the_only_error() {
    let recognizer = CountingRecognizer::new(Duration::ZERO);
    let service = service(recognizer.clone(), 1);
    service.gate().close();

    let err = service
        .analyze(image("a"), AnalysisMode::Passive)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(recognizer.calls(), 0);
}
