//! # shotlens-jobs
//!
//! Orchestration around the analysis pipeline.
//!
//! This crate provides:
//! - An admission gate bounding concurrent analyses
//! - A per-image result cache with replace-only semantics
//! - A debouncer that coalesces bursts of requests
//! - [`AnalysisService`], which ties them to a recognizer and broadcasts
//!   [`ServiceEvent`]s
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shotlens_jobs::{AnalysisMode, AnalysisService};
//!
//! let service = AnalysisService::from_env(Arc::new(MyRecognizer));
//! let mut events = service.events();
//!
//! let outcome = service.analyze(image, AnalysisMode::Passive).await?;
//! println!("{}", outcome.result().classification.title);
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("Event: {:?}", event);
//! }
//! ```

pub mod cache;
pub mod debounce;
pub mod gate;
pub mod service;

pub use cache::{AnalysisCache, CacheStats};
pub use debounce::Debouncer;
pub use gate::{AnalysisGate, GatePermit};
pub use service::{AnalysisMode, AnalysisOutcome, AnalysisService, ServiceConfig, ServiceEvent};
