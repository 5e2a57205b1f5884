//! Core traits for shotlens collaborator boundaries.
//!
//! Concrete recognizers, model backends and detectors implement these so the
//! pipeline and service can be assembled with real platform services or
//! test doubles.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// RECOGNITION
// =============================================================================

/// External text recognizer: turns an image into text blocks and side signals.
///
/// Implementations may return partially empty output; an `Err` is treated by
/// the service as "recognizer unavailable" and degraded to empty input.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &ImageInput) -> Result<RecognitionOutput>;

    /// Human-readable name of this recognizer.
    fn name(&self) -> &str;
}

// =============================================================================
// RECONSTRUCTION
// =============================================================================

/// Strategy that rebuilds a document from scattered text blocks.
///
/// The heuristic implementation never fails; other implementations (e.g.
/// model-backed) may, and the pipeline falls back to the heuristic when they do.
#[async_trait]
pub trait DocumentReconstructor: Send + Sync {
    async fn reconstruct(&self, blocks: &[TextBlock]) -> Result<ReconstructedDocument>;

    fn name(&self) -> &str;
}

// =============================================================================
// DETECTION
// =============================================================================

/// Structured-match capability for phones, dates and postal addresses.
///
/// Implementations return deduplicated matches in source order and must not
/// panic on arbitrary text.
pub trait DataDetector: Send + Sync {
    fn phones(&self, text: &str) -> Vec<TextMatch>;

    /// Dates in `text`; year-less dates resolve against `reference`.
    fn dates(&self, text: &str, reference: NaiveDate) -> Vec<DateMatch>;

    fn addresses(&self, text: &str) -> Vec<AddressMatch>;
}

/// Person-name recognition capability (e.g. a named-entity tagger).
pub trait NameRecognizer: Send + Sync {
    /// Person-name candidates in source order.
    fn person_names(&self, text: &str) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct EmptyRecognizer;

    #[async_trait]
    impl TextRecognizer for EmptyRecognizer {
        async fn recognize(&self, _image: &ImageInput) -> Result<RecognitionOutput> {
            Ok(RecognitionOutput::default())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[tokio::test]
    async fn test_recognizer_is_object_safe() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(EmptyRecognizer);
        let image = ImageInput::new("img", vec![0u8; 4], 1, 1);
        let output = recognizer.recognize(&image).await.unwrap();
        assert!(output.blocks.is_empty());
        assert_eq!(recognizer.name(), "empty");
    }
}
