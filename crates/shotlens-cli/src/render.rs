//! Output formats for a finished analysis.

use std::fmt::Write as _;

use clap::ValueEnum;

use shotlens_core::logging::{ANALYSIS_ID, ENTITY_COUNT, IMAGE_ID, RECONSTRUCTION, TYPE_LABEL};
use shotlens_core::ProcessedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// The full result as pretty-printed JSON
    #[default]
    Json,
    /// Only the reconstructed document
    Markdown,
    /// A short human-readable digest
    Summary,
}

pub fn render(result: &ProcessedResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Markdown => result.document_text.clone(),
        OutputFormat::Summary => summary(result),
    })
}

/// One `key: value` line per field, keyed like the structured logs.
pub fn summary(result: &ProcessedResult) -> String {
    let mut out = String::new();
    let classification = &result.classification;

    let _ = writeln!(out, "{IMAGE_ID}: {}", result.image_id);
    let _ = writeln!(out, "{ANALYSIS_ID}: {}", result.analysis_id);
    let _ = writeln!(
        out,
        "{TYPE_LABEL}: {} ({:.2}) \"{}\"",
        classification.type_label, classification.confidence, classification.title
    );
    let _ = writeln!(out, "{RECONSTRUCTION}: {}", result.reconstruction.as_str());
    let _ = writeln!(
        out,
        "language: {}",
        result.language.as_deref().unwrap_or("unknown")
    );

    let _ = writeln!(out, "{ENTITY_COUNT}: {}", result.entities.len());
    for entity in &result.entities {
        let _ = writeln!(out, "  {}: {}", entity.kind.as_str(), entity.value);
    }

    if let Some(event) = &result.event {
        let start = event
            .start
            .map(|s| s.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "event: {} @ {start}",
            event.name.as_deref().unwrap_or("(untitled)")
        );
    }
    if let Some(contact) = &result.contact {
        let _ = writeln!(out, "contact: {}", contact.name.as_deref().unwrap_or(""));
    }

    if !result.actions.is_empty() {
        let _ = writeln!(out, "actions:");
        for action in &result.actions {
            let _ = writeln!(out, "  [{}] {}", action.priority, action.label);
        }
    }
    out
}
