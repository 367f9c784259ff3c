//! Positional text replacement over an immutable original string

use std::ops::Range;

/// Replace `text[from..to]` (byte offsets into the original) with `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSpan {
    pub value: String,
    pub from: usize,
    pub to: usize,
}

impl ReplacementSpan {
    pub fn new(value: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            value: value.into(),
            from: range.start,
            to: range.end,
        }
    }

    pub fn overlaps(&self, other: &ReplacementSpan) -> bool {
        self.from < other.to && other.from < self.to
    }
}

/// True if any two spans share a byte.
pub fn spans_overlap(spans: &[ReplacementSpan]) -> bool {
    let mut sorted: Vec<&ReplacementSpan> = spans.iter().collect();
    sorted.sort_by_key(|s| s.from);
    sorted.windows(2).any(|pair| pair[0].overlaps(pair[1]))
}

/// Apply every span to `text`.
///
/// Spans are applied in descending `from` order, so every offset refers to
/// the original text regardless of how long earlier replacements were.
/// Callers must not pass overlapping spans.
pub fn apply_replacements(text: &str, mut spans: Vec<ReplacementSpan>) -> String {
    debug_assert!(!spans_overlap(&spans), "overlapping replacement spans");
    spans.sort_by(|a, b| b.from.cmp(&a.from));
    spans.into_iter().fold(text.to_string(), |acc, span| {
        let mut out = String::with_capacity(acc.len() + span.value.len());
        out.push_str(&acc[..span.from]);
        out.push_str(&span.value);
        out.push_str(&acc[span.to..]);
        out
    })
}
