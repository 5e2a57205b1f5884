//! # shotlens-analysis
//!
//! Heuristic screenshot understanding for shotlens.
//!
//! This crate turns a recognizer's [`RecognitionOutput`](shotlens_core::RecognitionOutput)
//! into a [`ProcessedResult`](shotlens_core::ProcessedResult):
//! - Layout reconstruction into a markdown-like document
//! - URL, email, phone, address and date extraction
//! - Event and contact record detection
//! - Screenshot type classification
//! - Language detection and suggested actions
//!
//! All stages are synchronous except the optional model-backed
//! reconstruction; [`AnalysisPipeline`] sequences them and never fails.

pub mod actions;
pub mod classify;
pub mod detector;
pub mod entities;
pub mod language;
pub mod layout;
pub(crate) mod patterns;
pub mod pipeline;
pub mod records;
pub mod text;

pub use actions::{generate_actions, ActionInputs};
pub use classify::{looks_like_chat, text_density, ClassificationSignals, ScreenshotClassifier};
pub use detector::PatternDataDetector;
pub use entities::{extract_emails, extract_urls, EntityExtractor};
pub use language::detect_language;
pub use layout::HeuristicReconstructor;
pub use pipeline::{
    AnalysisPipeline, PipelineBuilder, PipelineConfig, PipelineReport, ReconstructionStrategy,
    Stage, StageFailure,
};
pub use records::{ContactDetector, EventDetector};
