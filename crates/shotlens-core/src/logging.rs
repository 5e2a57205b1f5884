//! Structured logging field name constants for shotlens.
//!
//! Human-readable output (the CLI summary) uses the same keys as the
//! `tracing` fields so a digest can be grepped against the logs.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Invariant violated, requires attention |
//! | WARN  | Stage degraded, automatic fallback applied |
//! | INFO  | Lifecycle events, analysis completions |
//! | DEBUG | Decision points (cache hits, classifier branch, record gates) |
//! | TRACE | Per-item iteration (blocks, lines, matches) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Stable image identifier supplied by the capture layer.
pub const IMAGE_ID: &str = "image_id";

/// Per-run analysis UUID (v7).
pub const ANALYSIS_ID: &str = "analysis_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of extracted entities.
pub const ENTITY_COUNT: &str = "entity_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Screenshot type label assigned by the classifier.
pub const TYPE_LABEL: &str = "type_label";

/// Which reconstruction path produced the document.
pub const RECONSTRUCTION: &str = "reconstruction";
