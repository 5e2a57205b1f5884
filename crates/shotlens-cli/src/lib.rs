//! # shotlens-cli
//!
//! Library half of the `shotlens` binary: input loading, pipeline assembly,
//! output rendering and logging setup.

pub mod input;
pub mod logging;
pub mod render;

use std::sync::Arc;

use tracing::{info, warn};

use shotlens_analysis::{AnalysisPipeline, ReconstructionStrategy};
use shotlens_core::Result;
use shotlens_inference::{env_base_url, OllamaReconstructor};

pub use input::{load_dump, load_recognition, parse_recognition, ReplayRecognizer};
pub use render::{render, summary, OutputFormat};

/// Model-backed reconstruction for an explicit model name, or whatever the
/// environment configures. `Ok(None)` when no model is configured.
pub fn reconstructor_for(model: Option<String>) -> Result<Option<OllamaReconstructor>> {
    match model {
        Some(model) => OllamaReconstructor::try_new(env_base_url(), model).map(Some),
        None => OllamaReconstructor::from_env(),
    }
}

/// Pipeline using the model only when its server answers a health check.
///
/// Invalid model settings are logged and fall back to heuristic
/// reconstruction.
pub async fn build_pipeline(model: Option<String>) -> AnalysisPipeline {
    let builder = AnalysisPipeline::builder();
    let reconstructor = match reconstructor_for(model) {
        Ok(Some(reconstructor)) => reconstructor,
        Ok(None) => return builder.build(),
        Err(e) => {
            warn!(error = %e, "Ignoring model configuration, using heuristic reconstruction");
            return builder.build();
        }
    };

    if reconstructor.health_check().await.unwrap_or(false) {
        info!(model = reconstructor.model(), "Using model-backed reconstruction");
        builder
            .reconstruction(ReconstructionStrategy::Model(Arc::new(reconstructor)))
            .build()
    } else {
        warn!(
            model = reconstructor.model(),
            url = reconstructor.base_url(),
            "Ollama unreachable, using heuristic reconstruction"
        );
        builder.build()
    }
}
