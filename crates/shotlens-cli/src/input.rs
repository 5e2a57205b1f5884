//! Loading recognition dumps from disk.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use shotlens_core::{ImageInput, RecognitionOutput, TextBlock, TextRecognizer};

/// Parses a serialized [`RecognitionOutput`], or a bare array of blocks.
pub fn parse_recognition(json: &str) -> Result<RecognitionOutput> {
    match serde_json::from_str::<RecognitionOutput>(json) {
        Ok(output) => Ok(output),
        Err(full) => {
            let blocks: Vec<TextBlock> = serde_json::from_str(json)
                .with_context(|| format!("not a recognition dump ({full}) or a block array"))?;
            Ok(RecognitionOutput {
                blocks,
                ..Default::default()
            })
        }
    }
}

/// Reads and parses a recognition dump.
pub fn load_recognition(path: &Path) -> Result<RecognitionOutput> {
    load_dump(path).map(|(output, _)| output)
}

/// Reads a recognition dump once, returning the parsed output together with
/// the raw file bytes.
pub fn load_dump(path: &Path) -> Result<(RecognitionOutput, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let json = std::str::from_utf8(&bytes)
        .with_context(|| format!("{} is not UTF-8", path.display()))?;
    let output = parse_recognition(json).with_context(|| format!("parsing {}", path.display()))?;
    Ok((output, bytes))
}

/// Recognizer that replays a recognition dump instead of running OCR.
#[derive(Debug, Clone)]
pub struct ReplayRecognizer {
    output: RecognitionOutput,
}

impl ReplayRecognizer {
    pub fn new(output: RecognitionOutput) -> Self {
        Self { output }
    }
}

#[async_trait]
impl TextRecognizer for ReplayRecognizer {
    async fn recognize(&self, _image: &ImageInput) -> shotlens_core::Result<RecognitionOutput> {
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
