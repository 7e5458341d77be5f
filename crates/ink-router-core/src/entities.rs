//! Entity extraction over controlled vocabularies.
//!
//! Each [`EntityKind`] is checked independently against a fixed vocabulary
//! with whole-word matching (an optional trailing plural `s` is accepted):
//!
//! - **style** and **body part** accumulate every match. A match that sits
//!   wholly inside a longer match of the same kind is dropped, so
//!   "neo-traditional" does not also yield "traditional".
//! - **size** and **color** keep only the first vocabulary hit. Size also
//!   recognises measurements such as `3 inch`, `4in` or `10 cm`.
//!
//! Extraction never fails; text with no recognisable terms yields an empty
//! [`ExtractedEntities`].

use crate::models::{EntityKind, ExtractedEntities};

pub(crate) const STYLE_TERMS: &[&str] = &[
    "american traditional",
    "neo-traditional",
    "neo traditional",
    "traditional",
    "old school",
    "photorealism",
    "realism",
    "realistic",
    "portrait",
    "watercolour",
    "watercolor",
    "black work",
    "blackwork",
    "irezumi",
    "japanese",
    "fine-line",
    "fine line",
    "minimalist",
    "minimal",
    "geometric",
    "dotwork",
    "mandala",
    "polynesian",
    "tribal",
];

const BODY_PART_TERMS: &[&str] = &[
    "behind the ear",
    "shoulder blade",
    "upper arm",
    "forearm",
    "arm",
    "bicep",
    "shoulder",
    "sleeve",
    "wrist",
    "hand",
    "finger",
    "knuckle",
    "chest",
    "sternum",
    "collarbone",
    "rib",
    "side",
    "back",
    "spine",
    "thigh",
    "leg",
    "hip",
    "calf",
    "shin",
    "ankle",
    "foot",
    "neck",
    "nape",
];

/// Ordered: the first hit wins.
const SIZE_TERMS: &[&str] = &[
    "full sleeve",
    "half sleeve",
    "back piece",
    "extra large",
    "tiny",
    "small",
    "medium",
    "large",
    "big",
];

/// Ordered: the first hit wins. Second element is the normalised value.
const COLOR_TERMS: &[(&str, &str)] = &[
    ("black and grey", "black and grey"),
    ("black and gray", "black and grey"),
    ("black & grey", "black and grey"),
    ("black & gray", "black and grey"),
    ("full color", "color"),
    ("full colour", "color"),
    ("colored", "color"),
    ("coloured", "color"),
    ("colour", "color"),
    ("color", "color"),
    ("red", "red"),
    ("blue", "blue"),
    ("green", "green"),
    ("yellow", "yellow"),
    ("purple", "purple"),
    ("pink", "pink"),
    ("orange", "orange"),
    ("white", "white"),
    ("black", "black"),
];

/// Extract all recognised entities from `text`.
pub fn extract(text: &str) -> ExtractedEntities {
    let lower = text.to_lowercase();
    let mut entities = ExtractedEntities::new();

    for term in accumulate(&lower, STYLE_TERMS) {
        entities.push(EntityKind::Style, term);
    }
    for term in accumulate(&lower, BODY_PART_TERMS) {
        entities.push(EntityKind::BodyPart, term);
    }

    let size = SIZE_TERMS
        .iter()
        .find(|t| find_term(&lower, t).is_some())
        .map(|t| t.to_string())
        .or_else(|| find_measurement(&lower));
    if let Some(size) = size {
        entities.push(EntityKind::Size, size);
    }

    if let Some((_, normalized)) = COLOR_TERMS
        .iter()
        .find(|(t, _)| find_term(&lower, t).is_some())
    {
        entities.push(EntityKind::Color, *normalized);
    }

    entities
}

/// Map any extracted size value onto a pricing bucket id.
///
/// Returns `small`, `medium`, `large` or `sleeve`; `None` for values that
/// do not describe a size.
pub fn size_bucket(value: &str) -> Option<&'static str> {
    match value {
        "tiny" | "small" => Some("small"),
        "medium" => Some("medium"),
        "large" | "big" | "extra large" => Some("large"),
        "full sleeve" | "half sleeve" | "back piece" => Some("sleeve"),
        other => {
            let inches = parse_measurement_inches(other)?;
            Some(if inches <= 3.0 {
                "small"
            } else if inches <= 6.0 {
                "medium"
            } else {
                "large"
            })
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// True if `term` occurs in `text` as a whole word or phrase.
///
/// A trailing plural `s` is accepted. A term ending in `*` is a stem: it
/// must start a word but may run on (`heal*` matches "healing"). `text`
/// is expected to be lowercased already.
pub fn contains_term(text: &str, term: &str) -> bool {
    match term.strip_suffix('*') {
        Some(stem) if !stem.is_empty() => text.match_indices(stem).any(|(start, _)| {
            text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !is_word_char(c))
        }),
        Some(_) => false,
        None => !term.is_empty() && find_term(text, term).is_some(),
    }
}

/// Byte span of the first whole-word occurrence of `term` (plural `s` allowed).
fn find_term(text: &str, term: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(pos) = text[from..].find(term) {
        let start = from + pos;
        let mut end = start + term.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
        let mut rest = text[end..].chars();
        let after_ok = match rest.next() {
            None => true,
            Some('s') => {
                let boundary = rest.next().map_or(true, |c| !is_word_char(c));
                if boundary {
                    end += 1;
                }
                boundary
            }
            Some(c) => !is_word_char(c),
        };
        if before_ok && after_ok {
            return Some((start, end));
        }
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// All vocabulary hits, dropping any hit contained in a longer hit.
fn accumulate(text: &str, vocabulary: &[&'static str]) -> Vec<&'static str> {
    let hits: Vec<(&'static str, (usize, usize))> = vocabulary
        .iter()
        .filter_map(|t| find_term(text, t).map(|span| (*t, span)))
        .collect();

    hits.iter()
        .filter(|(term, (s, e))| {
            !hits.iter().any(|(other, (os, oe))| {
                other.len() > term.len() && *os <= *s && *e <= *oe
            })
        })
        .map(|(term, _)| *term)
        .collect()
}

/// Find a measurement like `3 inch`, `4 inches`, `4in`, `10 cm`, `10cm`.
fn find_measurement(text: &str) -> Option<String> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == '?' || c == '!')
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        let digits: String = token
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if digits.is_empty() || digits.parse::<f64>().is_err() {
            continue;
        }
        let attached = token[digits.len()..].trim_end_matches('.');
        let unit = if attached.is_empty() {
            tokens.get(i + 1).map(|t| t.trim_end_matches('.')).unwrap_or("")
        } else {
            attached
        };
        let unit = match unit {
            "in" | "inch" | "inches" | "\"" => "inch",
            "cm" | "cms" | "centimeter" | "centimeters" => "cm",
            _ => continue,
        };
        return Some(format!("{} {}", digits.trim_end_matches('.'), unit));
    }
    None
}

fn parse_measurement_inches(value: &str) -> Option<f64> {
    let (number, unit) = value.split_once(' ')?;
    let n: f64 = number.parse().ok()?;
    match unit {
        "inch" => Some(n),
        "cm" => Some(n / 2.54),
        _ => None,
    }
}
