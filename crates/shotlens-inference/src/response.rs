//! Cleanup of raw model answers before they are used as documents.
//!
//! Reasoning models wrap their chain of thought in `<think>...</think>`
//! and chat-tuned models like to fence markdown in triple backticks; neither
//! belongs in a reconstructed document.

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const FENCE: &str = "```";

/// Removes every `<think>` section. An unclosed section swallows the rest.
pub fn strip_thinking(response: &str) -> String {
    let mut answer = String::with_capacity(response.len());
    let mut rest = response;

    while let Some(open) = rest.find(THINK_OPEN) {
        answer.push_str(&rest[..open]);
        let after_open = &rest[open + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(close) => rest = &after_open[close + THINK_CLOSE.len()..],
            None => return answer,
        }
    }
    answer.push_str(rest);
    answer
}

/// Unwraps a single fenced block that encloses the whole answer.
///
/// The info string after the opening fence (`markdown`, `md`) is dropped.
/// Fences in the middle of the text are left alone.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(body) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    let Some(body) = body.strip_suffix(FENCE) else {
        return trimmed;
    };
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(' ') => inner.trim(),
        _ => body.trim(),
    }
}

/// Full cleanup: thinking first, then the outer fence.
pub fn clean_response(response: &str) -> String {
    strip_code_fence(&strip_thinking(response)).to_string()
}
