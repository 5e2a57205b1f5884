//! Line-level text helpers shared by the detectors and the classifier.

/// Trimmed, non-empty lines of `text`.
pub fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Character count (not bytes).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Fraction of non-whitespace characters that are alphabetic.
pub fn alphabetic_ratio(s: &str) -> f64 {
    let (alpha, total) = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(alpha, total), c| {
            (alpha + usize::from(c.is_alphabetic()), total + 1)
        });
    if total == 0 {
        0.0
    } else {
        alpha as f64 / total as f64
    }
}

/// Fraction of letters that are uppercase; `None` when there are no letters.
pub fn uppercase_ratio(s: &str) -> Option<f64> {
    let (upper, letters) = s
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(upper, letters), c| {
            (upper + usize::from(c.is_uppercase()), letters + 1)
        });
    (letters > 0).then(|| upper as f64 / letters as f64)
}

/// Lowercased alphanumeric words of `s`.
pub fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `line` reads as content: at least 3 characters with at least 2 letters.
pub fn is_meaningful_line(line: &str) -> bool {
    char_len(line) >= 3 && line.chars().filter(|c| c.is_alphabetic()).count() >= 2
}

/// First meaningful line, truncated to `max_chars`.
pub fn first_meaningful_line(text: &str, max_chars: usize) -> Option<String> {
    non_empty_lines(text)
        .into_iter()
        .find(|line| is_meaningful_line(line))
        .map(|line| truncate_chars(line, max_chars))
}
