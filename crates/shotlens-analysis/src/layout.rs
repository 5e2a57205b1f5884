//! Heuristic layout reconstruction.
//!
//! Groups text blocks into visual lines by vertical proximity and classifies
//! each line as a heading, list item, quote or paragraph, producing a
//! markdown-like document.
//!
//! The algorithm:
//! 1. Sort top-to-bottom, then left-to-right for blocks within
//!    [`LINE_TIE_EPSILON`] of each other vertically.
//! 2. Merge consecutive blocks whose bottoms differ by less than
//!    `median_height * LINE_GAP_FACTOR`.
//! 3. Classify lines (numbered, bullet, quote, tall heading, short top-region
//!    heading, paragraph). The first heading is level 1, later ones level 2.
//! 4. Render with a blank line after headings and between paragraphs.
//!
//! Reconstruction never fails: invalid geometry degrades to the raw block
//! text joined by newlines.

use async_trait::async_trait;
use tracing::{trace, warn};

use shotlens_core::defaults::{
    HEADING_HEIGHT_FACTOR, HEADING_MAX_CHARS, HEADING_TOP_REGION, LINE_GAP_FACTOR,
    LINE_TIE_EPSILON,
};
use shotlens_core::{
    ClassifiedLine, DocumentLine, DocumentReconstructor, Error, LineKind, ReconstructedDocument,
    ReconstructionSource, Result, TextBlock,
};

use crate::patterns::{matches, NUMBERED_ITEM};
use crate::text::char_len;

/// Infallible geometry-driven reconstructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicReconstructor;

impl HeuristicReconstructor {
    pub fn new() -> Self {
        Self
    }

    /// Rebuild a document from blocks in any order.
    ///
    /// Blocks without visible text produce an empty document.
    pub fn reconstruct(&self, blocks: &[TextBlock]) -> ReconstructedDocument {
        if blocks.iter().all(|b| b.text.trim().is_empty()) {
            return ReconstructedDocument::default();
        }

        match try_reconstruct(blocks) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Layout reconstruction degraded to raw text");
                ReconstructedDocument::from_raw_text(raw_text(blocks))
            }
        }
    }
}

#[async_trait]
impl DocumentReconstructor for HeuristicReconstructor {
    async fn reconstruct(&self, blocks: &[TextBlock]) -> Result<ReconstructedDocument> {
        Ok(HeuristicReconstructor::reconstruct(self, blocks))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Block texts joined by newlines in the order given.
pub fn raw_text(blocks: &[TextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn try_reconstruct(blocks: &[TextBlock]) -> Result<ReconstructedDocument> {
    if let Some(bad) = blocks.iter().find(|b| !b.is_finite() || b.height < 0.0) {
        return Err(Error::InvalidInput(format!(
            "block {:?} has invalid geometry",
            bad.text
        )));
    }

    let sorted = sort_blocks(blocks);
    let median = median_height(&sorted);
    let lines = merge_lines(&sorted, median * LINE_GAP_FACTOR);
    if lines.is_empty() {
        return Err(Error::Internal("no lines survived merging".into()));
    }
    let classified = classify_lines(&lines, median);
    let markdown = render(&classified);

    trace!(
        blocks = blocks.len(),
        lines = lines.len(),
        median,
        "Layout reconstructed"
    );

    Ok(ReconstructedDocument {
        lines,
        classified,
        markdown,
        source: ReconstructionSource::Heuristic,
    })
}

/// Reading order: descending y, ascending x within runs of near-equal y.
///
/// Runs are anchored on their first (highest) block so the ordering is a
/// total order regardless of how the epsilon windows overlap.
fn sort_blocks(blocks: &[TextBlock]) -> Vec<&TextBlock> {
    let mut by_y: Vec<&TextBlock> = blocks.iter().collect();
    by_y.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut sorted = Vec::with_capacity(by_y.len());
    let mut start = 0;
    while start < by_y.len() {
        let anchor = by_y[start].y;
        let mut end = start + 1;
        while end < by_y.len() && (anchor - by_y[end].y).abs() < LINE_TIE_EPSILON {
            end += 1;
        }
        let mut run = by_y[start..end].to_vec();
        run.sort_by(|a, b| a.x.total_cmp(&b.x));
        sorted.extend(run);
        start = end;
    }
    sorted
}

fn median_height(blocks: &[&TextBlock]) -> f64 {
    let mut heights: Vec<f64> = blocks.iter().map(|b| b.height).collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(f64::total_cmp);
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

/// Accumulates blocks for the line being built.
struct PendingLine<'a> {
    parts: Vec<&'a str>,
    y: f64,
    last_y: f64,
    height: f64,
}

impl PendingLine<'_> {
    fn finish(self) -> DocumentLine {
        DocumentLine {
            text: self.parts.join(" "),
            y: self.y,
            height: self.height,
        }
    }
}

fn merge_lines(sorted: &[&TextBlock], gap_threshold: f64) -> Vec<DocumentLine> {
    let mut lines = Vec::new();
    let mut current: Option<PendingLine<'_>> = None;

    for block in sorted {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }
        match current.as_mut() {
            Some(line) if (block.y - line.last_y).abs() < gap_threshold => {
                line.parts.push(text);
                line.last_y = block.y;
                line.height = line.height.max(block.height);
            }
            _ => {
                if let Some(done) = current.take() {
                    lines.push(done.finish());
                }
                current = Some(PendingLine {
                    parts: vec![text],
                    y: block.y,
                    last_y: block.y,
                    height: block.height,
                });
            }
        }
    }
    if let Some(done) = current {
        lines.push(done.finish());
    }
    lines
}

fn classify_lines(lines: &[DocumentLine], median: f64) -> Vec<ClassifiedLine> {
    let top = lines
        .iter()
        .map(|l| l.y + l.height)
        .fold(f64::NEG_INFINITY, f64::max);
    let bottom = lines.iter().map(|l| l.y).fold(f64::INFINITY, f64::min);
    let top_cutoff = top - HEADING_TOP_REGION * (top - bottom);

    let mut headings = 0usize;
    lines
        .iter()
        .map(|line| {
            let text = line.text.trim();
            if matches(&NUMBERED_ITEM, text) {
                return ClassifiedLine {
                    kind: LineKind::NumberedItem,
                    text: text.to_string(),
                };
            }
            if let Some(rest) = strip_bullet(text) {
                return ClassifiedLine {
                    kind: LineKind::Bullet,
                    text: rest.to_string(),
                };
            }
            if let Some(rest) = strip_quote(text) {
                return ClassifiedLine {
                    kind: LineKind::Quote,
                    text: rest.to_string(),
                };
            }

            let tall = line.height > median * HEADING_HEIGHT_FACTOR;
            let short_top = lines.len() > 1
                && line.y >= top_cutoff
                && char_len(text) < HEADING_MAX_CHARS;
            if tall || short_top {
                let level = if headings == 0 { 1 } else { 2 };
                headings += 1;
                return ClassifiedLine {
                    kind: LineKind::Heading { level },
                    text: text.to_string(),
                };
            }

            ClassifiedLine {
                kind: LineKind::Paragraph,
                text: text.to_string(),
            }
        })
        .collect()
}

/// Content after a `-`/`*` marker followed by whitespace, or after `•`.
fn strip_bullet(text: &str) -> Option<&str> {
    let rest = if let Some(rest) = text.strip_prefix('•') {
        rest
    } else {
        let rest = text.strip_prefix('-').or_else(|| text.strip_prefix('*'))?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest
    };
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Content of a `>`-prefixed line or a line wrapped in quotation marks.
fn strip_quote(text: &str) -> Option<&str> {
    if let Some(rest) = text.strip_prefix('>') {
        let rest = rest.trim();
        return (!rest.is_empty()).then_some(rest);
    }
    for (open, close) in [('"', '"'), ('“', '”'), ('«', '»')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            let inner = inner.trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }
    None
}

fn render(lines: &[ClassifiedLine]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len() * 2);
    let mut previous_paragraph = false;

    for line in lines {
        match line.kind {
            LineKind::Heading { level } => {
                out.push(format!("{} {}", "#".repeat(level as usize), line.text));
                out.push(String::new());
                previous_paragraph = false;
            }
            LineKind::Paragraph => {
                if previous_paragraph {
                    out.push(String::new());
                }
                out.push(line.text.clone());
                previous_paragraph = true;
            }
            LineKind::NumberedItem => {
                out.push(line.text.clone());
                previous_paragraph = false;
            }
            LineKind::Bullet => {
                out.push(format!("- {}", line.text));
                previous_paragraph = false;
            }
            LineKind::Quote => {
                out.push(format!("> {}", line.text));
                previous_paragraph = false;
            }
        }
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, x: f64, y: f64, height: f64) -> TextBlock {
        TextBlock::new(text, x, y, 0.3, height)
    }

    #[test]
    fn test_empty_input() {
        let doc = HeuristicReconstructor::new().reconstruct(&[]);
        assert_eq!(doc.markdown, "");
        assert!(doc.lines.is_empty());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_whitespace_blocks_give_empty_document() {
        let blocks = [block("   ", 0.1, 0.9, 0.02), block("\t\n", 0.1, 0.5, 0.02)];
        let doc = HeuristicReconstructor::new().reconstruct(&blocks);
        assert_eq!(doc.markdown, "");
        assert!(doc.lines.is_empty());
        assert_eq!(doc.source, ReconstructionSource::Heuristic);
    }

    #[test]
    fn test_single_block_is_paragraph() {
        let doc = HeuristicReconstructor::new().reconstruct(&[block("Hello there", 0.1, 0.9, 0.02)]);
        assert_eq!(doc.markdown, "Hello there");
        assert_eq!(doc.classified[0].kind, LineKind::Paragraph);
    }

    #[test]
    fn test_sort_orders_top_down_then_left_right() {
        let blocks = vec![
            block("world", 0.5, 0.805, 0.02),
            block("bottom", 0.1, 0.1, 0.02),
            block("hello", 0.1, 0.8, 0.02),
        ];
        let sorted = sort_blocks(&blocks);
        let texts: Vec<_> = sorted.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "world", "bottom"]);
    }

    #[test]
    fn test_merge_joins_close_blocks() {
        let blocks = vec![
            block("Total", 0.1, 0.5, 0.02),
            block("$12.00", 0.6, 0.505, 0.02),
            block("Thanks", 0.1, 0.2, 0.02),
        ];
        let sorted = sort_blocks(&blocks);
        let lines = merge_lines(&sorted, 0.03);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Total $12.00");
        assert_eq!(lines[1].text, "Thanks");
    }

    #[test]
    fn test_tall_line_becomes_heading_then_level_two() {
        let blocks = vec![
            block("Big Title", 0.1, 0.5, 0.05),
            block("body text that is long enough to not be a heading at all", 0.1, 0.4, 0.02),
            block("Second Title", 0.1, 0.3, 0.05),
            block("more body text that keeps going and going for a while", 0.1, 0.2, 0.02),
            block("closing paragraph text that is also quite long indeed", 0.1, 0.1, 0.02),
        ];
        let doc = HeuristicReconstructor::new().reconstruct(&blocks);
        assert_eq!(
            doc.markdown,
            "# Big Title\n\nbody text that is long enough to not be a heading at all\n## Second Title\n\nmore body text that keeps going and going for a while\n\nclosing paragraph text that is also quite long indeed"
        );
    }

    #[test]
    fn test_short_top_line_is_heading() {
        let blocks = vec![
            block("Inbox", 0.1, 0.9, 0.02),
            block("a message body that is long enough to stay a paragraph", 0.1, 0.5, 0.02),
            block("another message body that is long enough as well", 0.1, 0.1, 0.02),
        ];
        let doc = HeuristicReconstructor::new().reconstruct(&blocks);
        assert_eq!(doc.classified[0].kind, LineKind::Heading { level: 1 });
        assert!(doc.markdown.starts_with("# Inbox\n\n"));
    }

    #[test]
    fn test_list_markers() {
        let blocks = vec![
            block("a long introduction line that should stay a paragraph here", 0.1, 0.9, 0.02),
            block("1. first step", 0.1, 0.7, 0.02),
            block("2) second step", 0.1, 0.6, 0.02),
            block("• milk", 0.1, 0.5, 0.02),
            block("* eggs", 0.1, 0.4, 0.02),
            block("- bread", 0.1, 0.3, 0.02),
            block("-5 degrees outside today and it is getting colder", 0.1, 0.2, 0.02),
        ];
        let doc = HeuristicReconstructor::new().reconstruct(&blocks);
        let lines: Vec<_> = doc.markdown.lines().collect();
        assert_eq!(lines[1], "1. first step");
        assert_eq!(lines[2], "2) second step");
        assert_eq!(lines[3], "- milk");
        assert_eq!(lines[4], "- eggs");
        assert_eq!(lines[5], "- bread");
        assert_eq!(lines[6], "-5 degrees outside today and it is getting colder");
    }

    #[test]
    fn test_quote_lines() {
        assert_eq!(strip_quote("> quoted"), Some("quoted"));
        assert_eq!(strip_quote("“Stay hungry”"), Some("Stay hungry"));
        assert_eq!(strip_quote("«Привет»"), Some("Привет"));
        assert_eq!(strip_quote("plain"), None);
        assert_eq!(strip_quote("\""), None);
    }

    #[test]
    fn test_non_finite_geometry_degrades_to_raw_text() {
        let blocks = vec![
            block("first", 0.1, 0.9, 0.02),
            block("second", 0.1, f64::NAN, 0.02),
        ];
        let doc = HeuristicReconstructor::new().reconstruct(&blocks);
        assert_eq!(doc.source, ReconstructionSource::RawText);
        assert_eq!(doc.markdown, "first\nsecond");
    }

    #[test]
    fn test_median_height_even_and_odd() {
        let a = block("a", 0.0, 0.0, 0.01);
        let b = block("b", 0.0, 0.0, 0.03);
        let c = block("c", 0.0, 0.0, 0.02);
        assert!((median_height(&[&a, &b, &c]) - 0.02).abs() < 1e-12);
        assert!((median_height(&[&a, &b]) - 0.02).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_trait_object_never_fails() {
        let reconstructor: &dyn DocumentReconstructor = &HeuristicReconstructor;
        let doc = reconstructor
            .reconstruct(&[block("x", 0.0, f64::INFINITY, 0.02)])
            .await
            .unwrap();
        assert_eq!(doc.markdown, "x");
    }
}
