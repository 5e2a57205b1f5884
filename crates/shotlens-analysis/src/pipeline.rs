//! Pipeline coordinator.
//!
//! Runs Reconstruct → Extract Entities → Detect Records → Classify, then
//! language detection and action generation. Every stage runs under a guard
//! that absorbs both `Err` and panics and substitutes the stage's degraded
//! value, so [`AnalysisPipeline::run`] always yields a [`ProcessedResult`].

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use futures::FutureExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shotlens_core::defaults::MAX_ACTIONS;
use shotlens_core::{
    BasicEntities, ClassificationResult, ContactRecord, DataDetector, DocumentReconstructor,
    EntityKind, Error, EventRecord, ExtractedEntity, NameRecognizer, ProcessedResult,
    RecognitionOutput, ReconstructedDocument, Result, TextBlock,
};

use crate::actions::{generate_actions, ActionInputs};
use crate::classify::{ClassificationSignals, ScreenshotClassifier};
use crate::detector::PatternDataDetector;
use crate::entities::EntityExtractor;
use crate::language::detect_language;
use crate::layout::{raw_text, HeuristicReconstructor};
use crate::records::{ContactDetector, EventDetector};

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Resolves year-less dates; today (local) when unset.
    pub reference_date: Option<NaiveDate>,
    pub max_actions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_date: None,
            max_actions: MAX_ACTIONS,
        }
    }
}

impl PipelineConfig {
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn with_max_actions(mut self, max: usize) -> Self {
        self.max_actions = max;
        self
    }
}

/// How the reconstruction stage is performed.
#[derive(Clone, Default)]
pub enum ReconstructionStrategy {
    #[default]
    Heuristic,
    /// Delegate to another reconstructor, falling back to the heuristic on
    /// error or empty output.
    Model(Arc<dyn DocumentReconstructor>),
}

impl fmt::Debug for ReconstructionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heuristic => f.write_str("Heuristic"),
            Self::Model(r) => f.debug_tuple("Model").field(&r.name()).finish(),
        }
    }
}

// =============================================================================
// STAGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Reconstruct,
    ExtractEntities,
    DetectEvent,
    DetectContact,
    Classify,
    DetectLanguage,
    GenerateActions,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reconstruct => "reconstruct",
            Self::ExtractEntities => "extract_entities",
            Self::DetectEvent => "detect_event",
            Self::DetectContact => "detect_contact",
            Self::Classify => "classify",
            Self::DetectLanguage => "detect_language",
            Self::GenerateActions => "generate_actions",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that failed and was replaced by its degraded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: String,
}

/// Result of one run plus the stages that degraded along the way.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub result: ProcessedResult,
    pub failures: Vec<StageFailure>,
}

impl PipelineReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles an [`AnalysisPipeline`] from injected collaborators.
///
/// Defaults: built-in [`PatternDataDetector`], no name recognizer,
/// heuristic reconstruction.
pub struct PipelineBuilder {
    config: PipelineConfig,
    detector: Option<Arc<dyn DataDetector>>,
    names: Option<Arc<dyn NameRecognizer>>,
    strategy: ReconstructionStrategy,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            detector: Some(Arc::new(PatternDataDetector::new())),
            names: None,
            strategy: ReconstructionStrategy::Heuristic,
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn data_detector(mut self, detector: Arc<dyn DataDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Run without phone/date/address detection.
    pub fn without_data_detector(mut self) -> Self {
        self.detector = None;
        self
    }

    pub fn name_recognizer(mut self, names: Arc<dyn NameRecognizer>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn reconstruction(mut self, strategy: ReconstructionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn build(self) -> AnalysisPipeline {
        let extractor = match self.detector {
            Some(detector) => EntityExtractor::with_detector(detector),
            None => EntityExtractor::new(),
        };
        let contacts = match self.names {
            Some(names) => ContactDetector::with_name_recognizer(names),
            None => ContactDetector::new(),
        };
        AnalysisPipeline {
            config: self.config,
            strategy: self.strategy,
            heuristic: HeuristicReconstructor::new(),
            extractor,
            events: EventDetector::new(),
            contacts,
            classifier: ScreenshotClassifier::new(),
        }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Screenshot understanding pipeline. Holds no per-image state; one instance
/// can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
    strategy: ReconstructionStrategy,
    heuristic: HeuristicReconstructor,
    extractor: EntityExtractor,
    events: EventDetector,
    contacts: ContactDetector,
    classifier: ScreenshotClassifier,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        PipelineBuilder::default().build()
    }
}

impl AnalysisPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze one recognition output. Never fails.
    pub async fn run(&self, image_id: &str, output: RecognitionOutput) -> ProcessedResult {
        self.run_with_report(image_id, output).await.result
    }

    /// Like [`run`](Self::run), also reporting which stages degraded.
    pub async fn run_with_report(&self, image_id: &str, output: RecognitionOutput) -> PipelineReport {
        let started = std::time::Instant::now();
        let mut failures = Vec::new();
        let raw = output.raw_text();

        let document = self.reconstruct(&output.blocks, &mut failures).await;

        let reference = self
            .config
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        let entities = guarded(Stage::ExtractEntities, &mut failures, || {
            Ok(self.extractor.extract_at(&raw, reference))
        })
        .unwrap_or_default();

        let event = guarded(Stage::DetectEvent, &mut failures, || {
            Ok(self.events.detect(&raw, &entities, &output.context_hints))
        })
        .flatten();
        let contact = guarded(Stage::DetectContact, &mut failures, || {
            Ok(self.contacts.detect(&raw, &entities))
        })
        .flatten();

        let classification = guarded(Stage::Classify, &mut failures, || {
            let signals = ClassificationSignals::from_recognition(&output, &raw, &entities);
            Ok(self.classifier.classify(&signals))
        })
        .unwrap_or_else(ClassificationResult::fallback);

        let language =
            guarded(Stage::DetectLanguage, &mut failures, || Ok(detect_language(&raw))).flatten();

        let actions = guarded(Stage::GenerateActions, &mut failures, || {
            let inputs = ActionInputs {
                entities: &entities,
                event: event.as_ref(),
                contact: contact.as_ref(),
                classification: &classification,
                barcode_payload: output.barcode_payload.as_deref(),
                raw_text: &raw,
            };
            Ok(generate_actions(&inputs, self.config.max_actions))
        })
        .unwrap_or_default();

        let result = ProcessedResult {
            analysis_id: Uuid::now_v7(),
            image_id: image_id.to_string(),
            entities: collect_entities(&entities, event.as_ref(), contact.as_ref()),
            raw_text: raw,
            document_text: document.markdown,
            reconstruction: document.source,
            language,
            event,
            contact,
            classification,
            actions,
            analyzed_at: Utc::now(),
        };

        info!(
            image_id,
            type_label = %result.classification.type_label,
            entity_count = result.entities.len(),
            degraded_stages = failures.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        PipelineReport { result, failures }
    }

    async fn reconstruct(
        &self,
        blocks: &[TextBlock],
        failures: &mut Vec<StageFailure>,
    ) -> ReconstructedDocument {
        if let ReconstructionStrategy::Model(model) = &self.strategy {
            let attempt = AssertUnwindSafe(model.reconstruct(blocks))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::Internal(panic_message(&*panic))));
            match attempt {
                Ok(document) if !document.is_empty() => return document,
                Ok(_) => debug!(reconstructor = model.name(), "Model returned empty document"),
                Err(e) => {
                    warn!(reconstructor = model.name(), error = %e, "Model reconstruction failed, using heuristic");
                    failures.push(StageFailure {
                        stage: Stage::Reconstruct,
                        error: e.to_string(),
                    });
                }
            }
        }

        guarded(Stage::Reconstruct, failures, || Ok(self.heuristic.reconstruct(blocks)))
            .unwrap_or_else(|| ReconstructedDocument::from_raw_text(raw_text(blocks)))
    }
}

/// Run a stage, absorbing `Err` and panics into `failures`.
fn guarded<T>(
    stage: Stage,
    failures: &mut Vec<StageFailure>,
    f: impl FnOnce() -> Result<T>,
) -> Option<T> {
    let error = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(e)) => e.to_string(),
        Err(panic) => format!("panicked: {}", panic_message(&*panic)),
    };
    warn!(stage = %stage, error = %error, "Stage degraded");
    failures.push(StageFailure { stage, error });
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}

/// Basic entities followed by entities derived from the records.
fn collect_entities(
    basic: &BasicEntities,
    event: Option<&EventRecord>,
    contact: Option<&ContactRecord>,
) -> Vec<ExtractedEntity> {
    let mut out = basic.to_entities();

    if let Some(event) = event {
        let mut entity = ExtractedEntity::new(
            EntityKind::Event,
            event.name.clone().unwrap_or_else(|| "Event".to_string()),
        )
        .with_metadata("confidence", format!("{:.2}", event.confidence()));
        if let Some(start) = event.start {
            entity = entity.with_metadata("start", start.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
        if let Some(end) = event.end {
            entity = entity.with_metadata("end", end.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
        out.push(entity);
        if let Some(location) = &event.location {
            out.push(ExtractedEntity::new(EntityKind::Location, location.clone()));
        }
    }

    if let Some(contact) = contact {
        if let Some(name) = &contact.name {
            out.push(
                ExtractedEntity::new(EntityKind::Person, name.clone())
                    .with_metadata("confidence", format!("{:.2}", contact.confidence())),
            );
        }
        if let Some(company) = &contact.company {
            out.push(ExtractedEntity::new(EntityKind::Organization, company.clone()));
        }
    }
    out
}
