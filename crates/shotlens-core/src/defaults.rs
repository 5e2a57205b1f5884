//! Centralized default constants for shotlens.
//!
//! **This module is the single source of truth** for the heuristic thresholds
//! and runtime defaults. The layout, record and classifier thresholds are
//! empirically tuned; changing any of them is a behavior change.
//!
//! Organized by pipeline stage.

// =============================================================================
// LAYOUT RECONSTRUCTION
// =============================================================================

/// Blocks whose y differs by less than this are ordered left-to-right.
pub const LINE_TIE_EPSILON: f64 = 0.01;

/// Merge gap threshold as a multiple of the median block height.
pub const LINE_GAP_FACTOR: f64 = 1.5;

/// Lines taller than this multiple of the median height are headings.
pub const HEADING_HEIGHT_FACTOR: f64 = 1.3;

/// Fraction of the vertical extent (from the top) where short lines are headings.
pub const HEADING_TOP_REGION: f64 = 0.2;

/// Maximum character count for a top-region line to be promoted to a heading.
pub const HEADING_MAX_CHARS: usize = 40;

// =============================================================================
// EVENT DETECTION
// =============================================================================

/// Minimum confidence for a context hint to count as a social signal.
pub const HINT_CONFIDENCE_FLOOR: f32 = 0.1;

/// Minimum number of social-UI vocabulary words to flag social content.
pub const SOCIAL_VOCAB_MIN_HITS: usize = 2;

/// First-line length limit for the compact date/relative-time social signal.
pub const SOCIAL_FIRST_LINE_MAX_CHARS: usize = 20;

/// Number of leading lines scanned for an event name.
pub const EVENT_NAME_SCAN_LINES: usize = 5;

/// Event name length bounds (inclusive).
pub const EVENT_NAME_MIN_CHARS: usize = 3;
pub const EVENT_NAME_MAX_CHARS: usize = 80;

/// Maximum characters kept for an indicator-derived location.
pub const EVENT_LOCATION_MAX_CHARS: usize = 100;

/// Description line length bounds, `[min, max)`.
pub const EVENT_DESCRIPTION_MIN_CHARS: usize = 20;
pub const EVENT_DESCRIPTION_MAX_CHARS: usize = 200;

/// Maximum number of lines joined into an event description.
pub const EVENT_DESCRIPTION_MAX_LINES: usize = 3;

// =============================================================================
// CONTACT DETECTION
// =============================================================================

/// Number of leading lines scanned for a company name.
pub const CONTACT_COMPANY_SCAN_LINES: usize = 5;

/// Length bounds (inclusive) for an all-caps company line.
pub const CONTACT_COMPANY_MIN_CHARS: usize = 10;
pub const CONTACT_COMPANY_MAX_CHARS: usize = 50;

/// Uppercase letter ratio above which a line reads as a company name.
pub const CONTACT_COMPANY_UPPER_RATIO: f64 = 0.5;

/// Job title length bounds (inclusive).
pub const CONTACT_TITLE_MIN_CHARS: usize = 3;
pub const CONTACT_TITLE_MAX_CHARS: usize = 60;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Density above which rectangles mark a document.
pub const DOCUMENT_DENSITY_WITH_RECTS: f64 = 0.25;

/// Density above which a document hint marks a document.
pub const DOCUMENT_DENSITY_WITH_HINT: f64 = 0.3;

/// Density above which chat-looking text is a chat.
pub const CHAT_DENSITY: f64 = 0.3;

/// Density above which a commerce hint marks a product page.
pub const PRODUCT_DENSITY: f64 = 0.1;

/// Density above which an app hint marks an app screen.
pub const APP_SCREEN_DENSITY: f64 = 0.2;

/// Density above which the screenshot is generic text.
pub const GENERIC_TEXT_DENSITY: f64 = 0.15;

/// Chat heuristic: minimum non-empty lines.
pub const CHAT_MIN_LINES: usize = 5;

/// Chat heuristic: average line length must be below this.
pub const CHAT_MAX_AVG_LINE_CHARS: f64 = 25.0;

/// Chat heuristic: minimum lines carrying a `H:MM` time.
pub const CHAT_MIN_TIME_LINES: usize = 3;

/// Chat heuristic: minimum fraction of lines carrying a `H:MM` time.
pub const CHAT_MIN_TIME_RATIO: f64 = 0.4;

/// Top hint confidence required to title a photo after it.
pub const PHOTO_HINT_TITLE_CONFIDENCE: f32 = 0.5;

/// Characters kept from a non-URL barcode payload for the title.
pub const QR_TITLE_MAX_CHARS: usize = 32;

/// Maximum title length for content-derived titles.
pub const TITLE_MAX_CHARS: usize = 48;

/// Card number digit bounds (inclusive).
pub const CARD_MIN_DIGITS: usize = 13;
pub const CARD_MAX_DIGITS: usize = 19;

/// Placeholder title when nothing better is available.
pub const PLACEHOLDER_TITLE: &str = "Screenshot";

// =============================================================================
// DATA DETECTION
// =============================================================================

/// Phone number digit bounds (inclusive).
pub const PHONE_MIN_DIGITS: usize = 7;
pub const PHONE_MAX_DIGITS: usize = 15;

// =============================================================================
// ACTIONS
// =============================================================================

/// Maximum number of suggested actions per result.
pub const MAX_ACTIONS: usize = 10;

// =============================================================================
// CONCURRENCY
// =============================================================================

/// Default maximum number of analyses running simultaneously.
pub const MAX_CONCURRENT_ANALYSES: usize = 2;

/// Default debounce delay before a scheduled analysis starts (milliseconds).
pub const DEBOUNCE_MS: u64 = 350;

/// Default service event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Environment variable for the concurrency limit.
pub const ENV_MAX_CONCURRENT: &str = "SHOTLENS_MAX_CONCURRENT";

/// Environment variable for the debounce delay.
pub const ENV_DEBOUNCE_MS: &str = "SHOTLENS_DEBOUNCE_MS";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Environment variable for the reconstruction model name.
pub const ENV_OLLAMA_MODEL: &str = "SHOTLENS_OLLAMA_MODEL";

/// Environment variable overriding the Ollama base URL.
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";

/// Timeout for reconstruction requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 60;

/// Timeout for backend health checks in seconds.
pub const HEALTH_TIMEOUT_SECS: u64 = 5;
