//! Ollama-backed document reconstruction.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use shotlens_core::defaults::{
    ENV_OLLAMA_MODEL, ENV_OLLAMA_URL, GEN_TIMEOUT_SECS, HEALTH_TIMEOUT_SECS, OLLAMA_URL,
};
use shotlens_core::{
    DocumentReconstructor, Error, ReconstructedDocument, ReconstructionSource, Result, TextBlock,
};

use crate::response::clean_response;

const INSTRUCTIONS: &str = "You rebuild documents from OCR output. The JSON below lists text \
blocks with normalized coordinates: (x, y) is the bottom-left corner, (0,0) is the bottom-left \
of the image and (1,1) the top-right. Higher y is closer to the top. Reassemble the blocks in \
reading order and answer with markdown only: use # headings for titles, - for bullets, \
1. for numbered items and > for quotes. Do not add, translate or correct any text.";

/// Rounded copy of a block for the prompt; four decimals is plenty for layout.
#[derive(Serialize)]
struct PromptBlock<'a> {
    text: &'a str,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl<'a> From<&'a TextBlock> for PromptBlock<'a> {
    fn from(block: &'a TextBlock) -> Self {
        let round = |v: f64| (v * 10_000.0).round() / 10_000.0;
        Self {
            text: &block.text,
            x: round(block.x),
            y: round(block.y),
            w: round(block.width),
            h: round(block.height),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    /// Suppress chain-of-thought for models that support the switch.
    think: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Reconstructs documents by asking a local Ollama model to lay out the blocks.
#[derive(Debug)]
pub struct OllamaReconstructor {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaReconstructor {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
            timeout_secs: GEN_TIMEOUT_SECS,
        }
    }

    /// Like [`new`](Self::new), but rejects a blank model name or a base URL
    /// that is not http(s).
    pub fn try_new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let model = model.into();
        if model.trim().is_empty() {
            return Err(Error::Config("Ollama model name is empty".into()));
        }
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid Ollama URL {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Ollama URL {base_url:?} must use http or https"
            )));
        }
        Ok(Self::new(base_url, model))
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SHOTLENS_OLLAMA_MODEL` | unset | Model name; unset or blank disables the backend |
    /// | `OLLAMA_URL` | `http://127.0.0.1:11434` | Ollama base URL |
    ///
    /// Returns `Ok(None)` when no model is configured and
    /// [`Error::Config`] when `OLLAMA_URL` is not a usable URL.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(model) = std::env::var(ENV_OLLAMA_MODEL)
            .ok()
            .filter(|m| !m.trim().is_empty())
        else {
            return Ok(None);
        };
        Self::try_new(env_base_url(), model).map(Some)
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the Ollama server answers at all.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!(model = %self.model, "Ollama health check passed");
                Ok(true)
            }
            Ok(resp) => {
                warn!("Ollama health check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            think: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;
        Ok(result.response)
    }
}

/// Prompt carrying the instructions followed by the blocks as JSON.
fn build_prompt(blocks: &[TextBlock]) -> Result<String> {
    let payload: Vec<PromptBlock<'_>> = blocks.iter().map(PromptBlock::from).collect();
    let json = serde_json::to_string(&payload)?;
    Ok(format!("{INSTRUCTIONS}\n\nBlocks:\n{json}"))
}

/// `OLLAMA_URL` from the environment, or the local default.
pub fn env_base_url() -> String {
    std::env::var(ENV_OLLAMA_URL).unwrap_or_else(|_| OLLAMA_URL.to_string())
}

#[async_trait]
impl DocumentReconstructor for OllamaReconstructor {
    #[instrument(skip(self, blocks), fields(subsystem = "inference", component = "ollama", op = "reconstruct", model = %self.model, block_count = blocks.len()))]
    async fn reconstruct(&self, blocks: &[TextBlock]) -> Result<ReconstructedDocument> {
        if blocks.is_empty() {
            return Ok(ReconstructedDocument {
                source: ReconstructionSource::Model,
                ..Default::default()
            });
        }

        let start = Instant::now();
        let raw = self.generate(build_prompt(blocks)?).await?;
        let markdown = clean_response(&raw);
        if markdown.is_empty() {
            return Err(Error::Inference("model returned an empty document".into()));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = markdown.len(),
            duration_ms = elapsed,
            "Reconstruction complete"
        );
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, slow = true, "Slow reconstruction");
        }

        Ok(ReconstructedDocument {
            lines: Vec::new(),
            classified: Vec::new(),
            markdown,
            source: ReconstructionSource::Model,
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
