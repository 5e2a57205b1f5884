//! Analysis service: cache lookup, admission, recognition, pipeline, events.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use shotlens_analysis::AnalysisPipeline;
use shotlens_core::defaults::{
    DEBOUNCE_MS, ENV_DEBOUNCE_MS, ENV_MAX_CONCURRENT, EVENT_BUS_CAPACITY, MAX_CONCURRENT_ANALYSES,
};
use shotlens_core::{
    Error, ImageInput, ProcessedResult, RecognitionOutput, Result, ScreenshotType, TextRecognizer,
};

use crate::cache::AnalysisCache;
use crate::debounce::Debouncer;
use crate::gate::AnalysisGate;

/// Configuration for the analysis service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum number of analyses running at once.
    pub max_concurrent: usize,
    /// Delay before a debounced analysis starts (milliseconds).
    pub debounce_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_ANALYSES,
            debounce_ms: DEBOUNCE_MS,
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SHOTLENS_MAX_CONCURRENT` | `2` | Max concurrent analyses |
    /// | `SHOTLENS_DEBOUNCE_MS` | `350` | Delay before a debounced analysis |
    pub fn from_env() -> Self {
        let max_concurrent = std::env::var(ENV_MAX_CONCURRENT)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MAX_CONCURRENT_ANALYSES)
            .max(1);

        let debounce_ms = std::env::var(ENV_DEBOUNCE_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEBOUNCE_MS);

        Self {
            max_concurrent,
            debounce_ms,
        }
    }

    /// Set maximum concurrent analyses.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }
}

/// How the cache is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Reuse a cached result when one exists.
    #[default]
    Passive,
    /// Drop any cached result and analyze again.
    Forced,
}

/// Result of a service call.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Served from the cache without running the recognizer.
    Cached(Arc<ProcessedResult>),
    /// Produced by a fresh run.
    Analyzed(Arc<ProcessedResult>),
}

impl AnalysisOutcome {
    pub fn result(&self) -> &Arc<ProcessedResult> {
        match self {
            Self::Cached(r) | Self::Analyzed(r) => r,
        }
    }

    pub fn into_result(self) -> Arc<ProcessedResult> {
        match self {
            Self::Cached(r) | Self::Analyzed(r) => r,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Event emitted by the analysis service.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// A gate slot was acquired and recognition is about to start.
    AnalysisStarted { image_id: String },
    /// A fresh result was stored.
    AnalysisCompleted {
        image_id: String,
        type_label: ScreenshotType,
        duration_ms: u64,
    },
    /// A passive request was served from the cache.
    CacheHit { image_id: String },
    /// A stage fell back during the run.
    Degraded {
        image_id: String,
        stage: String,
        error: String,
    },
}

/// Runs analyses with bounded concurrency and a per-image memo.
///
/// Cloning is cheap and every clone shares the gate, cache, debouncer and
/// event bus.
#[derive(Clone)]
pub struct AnalysisService {
    recognizer: Arc<dyn TextRecognizer>,
    pipeline: AnalysisPipeline,
    gate: AnalysisGate,
    cache: Arc<AnalysisCache>,
    debouncer: Arc<Debouncer>,
    config: ServiceConfig,
    event_tx: broadcast::Sender<ServiceEvent>,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("recognizer", &self.recognizer.name())
            .field("config", &self.config)
            .field("in_flight", &self.gate.in_flight())
            .finish_non_exhaustive()
    }
}

impl AnalysisService {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        pipeline: AnalysisPipeline,
        config: ServiceConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            recognizer,
            pipeline,
            gate: AnalysisGate::new(config.max_concurrent),
            cache: Arc::new(AnalysisCache::new()),
            debouncer: Arc::new(Debouncer::new()),
            config,
            event_tx,
        }
    }

    /// Default pipeline and configuration from the environment.
    pub fn from_env(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self::new(recognizer, AnalysisPipeline::default(), ServiceConfig::from_env())
    }

    /// Get a receiver for service events.
    pub fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.event_tx.subscribe()
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn gate(&self) -> &AnalysisGate {
        &self.gate
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Analyze one image.
    ///
    /// Fails only when the gate has been closed; every other problem
    /// degrades into the returned result.
    #[instrument(skip(self, image), fields(subsystem = "jobs", image_id = %image.id, ?mode))]
    pub async fn analyze(&self, image: ImageInput, mode: AnalysisMode) -> Result<AnalysisOutcome> {
        match mode {
            AnalysisMode::Forced => {
                if self.cache.invalidate(&image.id).await.is_some() {
                    debug!("Invalidated cached analysis");
                }
            }
            AnalysisMode::Passive => {
                if let Some(hit) = self.cache.get(&image.id).await {
                    debug!("Cache hit");
                    self.emit(ServiceEvent::CacheHit {
                        image_id: image.id.clone(),
                    });
                    return Ok(AnalysisOutcome::Cached(hit));
                }
            }
        }

        if !image.has_data() {
            warn!("Image has no pixel data, returning empty result");
            return Ok(AnalysisOutcome::Analyzed(Arc::new(ProcessedResult::empty(
                image.id,
            ))));
        }

        let permit = self.gate.acquire().await?;
        let started = Instant::now();
        self.emit(ServiceEvent::AnalysisStarted {
            image_id: image.id.clone(),
        });

        let recognition = self.recognize(&image).await;
        let report = self.pipeline.run_with_report(&image.id, recognition).await;
        for failure in &report.failures {
            self.emit(ServiceEvent::Degraded {
                image_id: image.id.clone(),
                stage: failure.stage.to_string(),
                error: failure.error.clone(),
            });
        }

        let result = Arc::new(report.result);
        self.cache.insert(result.clone()).await;
        drop(permit);

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            type_label = %result.classification.type_label,
            duration_ms,
            "Analysis stored"
        );
        self.emit(ServiceEvent::AnalysisCompleted {
            image_id: image.id,
            type_label: result.classification.type_label,
            duration_ms,
        });
        Ok(AnalysisOutcome::Analyzed(result))
    }

    /// Analyze after the configured debounce delay.
    ///
    /// A later call supersedes one that has not started yet; the superseded
    /// handle resolves to `None`.
    pub fn analyze_debounced(
        &self,
        image: ImageInput,
        mode: AnalysisMode,
    ) -> JoinHandle<Option<Result<AnalysisOutcome>>> {
        let service = self.clone();
        self.debouncer.schedule(
            Duration::from_millis(self.config.debounce_ms),
            async move { service.analyze(image, mode).await },
        )
    }

    /// Cancels a debounced analysis that has not started yet.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    /// Analyze many images concurrently, bounded by the gate.
    ///
    /// Results come back in input order.
    #[instrument(skip(self, images), fields(subsystem = "jobs", batch_size = images.len(), ?mode))]
    pub async fn analyze_batch(
        &self,
        images: Vec<ImageInput>,
        mode: AnalysisMode,
    ) -> Vec<Result<AnalysisOutcome>> {
        let mut tasks = JoinSet::new();
        for (index, image) in images.into_iter().enumerate() {
            let service = self.clone();
            tasks.spawn(async move { (index, service.analyze(image, mode).await) });
        }

        let mut slots: Vec<Option<Result<AnalysisOutcome>>> = Vec::new();
        slots.resize_with(tasks.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = ?e, "Analysis task panicked"),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(Error::Internal("analysis task failed".into()))))
            .collect()
    }

    /// Recognizer output, or empty output when it fails or panics.
    async fn recognize(&self, image: &ImageInput) -> RecognitionOutput {
        let attempt = AssertUnwindSafe(self.recognizer.recognize(image))
            .catch_unwind()
            .await;
        match attempt {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(recognizer = self.recognizer.name(), error = %e, "Recognizer failed, analyzing empty input");
                RecognitionOutput::default()
            }
            Err(_) => {
                warn!(recognizer = self.recognizer.name(), "Recognizer panicked, analyzing empty input");
                RecognitionOutput::default()
            }
        }
    }

    fn emit(&self, event: ServiceEvent) {
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_concurrent, MAX_CONCURRENT_ANALYSES);
        assert_eq!(config.debounce_ms, DEBOUNCE_MS);
    }

    #[test]
    fn test_config_builders() {
        let config = ServiceConfig::default()
            .with_max_concurrent(0)
            .with_debounce_ms(10);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.debounce_ms, 10);
    }

    #[test]
    fn test_outcome_accessors() {
        let result = Arc::new(ProcessedResult::empty("a"));
        let cached = AnalysisOutcome::Cached(result.clone());
        assert!(cached.is_cached());
        assert_eq!(cached.result().image_id, "a");
        let fresh = AnalysisOutcome::Analyzed(result);
        assert!(!fresh.is_cached());
        assert_eq!(fresh.into_result().image_id, "a");
    }
}
