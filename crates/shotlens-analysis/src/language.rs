//! Dominant-language detection for recognized text.
//!
//! A single pass over the letters picks the dominant Unicode script; Latin
//! text is then scored against short stopword lists, Cyrillic is split on
//! Ukrainian-only letters and CJK on kana/Hangul presence.

use std::collections::HashMap;

use unicode_script::{Script, UnicodeScript};

use crate::text::words;

/// Minimum letters before a guess is attempted.
const MIN_LETTERS: usize = 3;

const STOPWORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "are", "to", "of", "for", "you", "your", "with", "this", "that",
            "on", "it", "be", "we", "was", "have",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "mit", "für", "ein", "eine", "zu", "den",
            "von", "sie", "auf", "ich",
        ],
    ),
    (
        "fr",
        &[
            "le", "les", "et", "est", "des", "une", "pour", "avec", "pas", "vous", "dans", "du",
            "sur", "je", "au", "ce",
        ],
    ),
    (
        "es",
        &[
            "el", "los", "las", "y", "es", "una", "para", "con", "por", "que", "del", "su", "lo",
            "como", "está", "muy",
        ],
    ),
    (
        "pl",
        &[
            "i", "w", "z", "na", "się", "jest", "nie", "że", "do", "jak", "ale", "od", "dla",
            "po", "czy", "tak",
        ],
    ),
];

/// Letters that only occur in one Latin-script language of interest.
const MARKERS: &[(&str, &[char])] = &[
    ("pl", &['ą', 'ę', 'ł', 'ś', 'ź', 'ż', 'ń', 'ć']),
    ("de", &['ß', 'ä', 'ö', 'ü']),
    ("es", &['ñ', '¿', '¡']),
    ("fr", &['ç', 'è', 'ê', 'à', 'œ']),
];

const UKRAINIAN_LETTERS: &[char] = &['і', 'ї', 'є', 'ґ'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Family {
    Latin,
    Cyrillic,
    Han,
    Kana,
    Hangul,
    Arabic,
    Greek,
    Hebrew,
    Thai,
    Devanagari,
}

fn family(script: Script) -> Option<Family> {
    match script {
        Script::Latin => Some(Family::Latin),
        Script::Cyrillic => Some(Family::Cyrillic),
        Script::Han => Some(Family::Han),
        Script::Hiragana | Script::Katakana => Some(Family::Kana),
        Script::Hangul => Some(Family::Hangul),
        Script::Arabic => Some(Family::Arabic),
        Script::Greek => Some(Family::Greek),
        Script::Hebrew => Some(Family::Hebrew),
        Script::Thai => Some(Family::Thai),
        Script::Devanagari => Some(Family::Devanagari),
        _ => None,
    }
}

/// ISO 639-1 code of the dominant language, or `None` when undetermined.
pub fn detect_language(text: &str) -> Option<String> {
    let mut counts: HashMap<Family, usize> = HashMap::new();
    let mut letters = 0usize;
    for ch in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if let Some(f) = family(ch.script()) {
            *counts.entry(f).or_insert(0) += 1;
        }
    }
    if letters < MIN_LETTERS {
        return None;
    }

    let kana = counts.get(&Family::Kana).copied().unwrap_or(0);
    let han = counts.get(&Family::Han).copied().unwrap_or(0);
    let cjk = kana + han;

    let (dominant, count) = counts
        .iter()
        .map(|(f, c)| (*f, *c))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    // Han and kana together make up Japanese text.
    if kana > 0 && cjk >= count {
        return Some("ja".to_string());
    }

    let code = match dominant {
        Family::Latin => return latin_language(text),
        Family::Cyrillic => {
            let lower = text.to_lowercase();
            if lower.chars().any(|c| UKRAINIAN_LETTERS.contains(&c)) {
                "uk"
            } else {
                "ru"
            }
        }
        Family::Han => "zh",
        Family::Kana => "ja",
        Family::Hangul => "ko",
        Family::Arabic => "ar",
        Family::Greek => "el",
        Family::Hebrew => "he",
        Family::Thai => "th",
        Family::Devanagari => "hi",
    };
    Some(code.to_string())
}

fn latin_language(text: &str) -> Option<String> {
    let tokens = words(text);
    let lower = text.to_lowercase();

    STOPWORDS
        .iter()
        .map(|(code, list)| {
            let hits = tokens.iter().filter(|t| list.contains(&t.as_str())).count();
            let marker_bonus = MARKERS
                .iter()
                .filter(|(marker_code, _)| marker_code == code)
                .flat_map(|(_, chars)| chars.iter())
                .filter(|c| lower.contains(**c))
                .count()
                * 2;
            (*code, hits + marker_bonus)
        })
        .filter(|(_, score)| *score > 0)
        // earliest list wins ties
        .fold(None, |best: Option<(&str, usize)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(code, _)| code.to_string())
}
