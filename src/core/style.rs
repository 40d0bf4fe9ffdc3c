//! Inline formatting.
//!
//! Formatting is stored per character as a [`CharMeta`]: a set of
//! [`InlineStyle`]s plus an optional entity reference. Ranges are derived
//! on demand, so overlapping style ranges can never be stored twice.

use super::EntityKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl InlineStyle {
    pub const ALL: [InlineStyle; 5] = [
        InlineStyle::Bold,
        InlineStyle::Italic,
        InlineStyle::Underline,
        InlineStyle::Strikethrough,
        InlineStyle::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
            InlineStyle::Underline => "UNDERLINE",
            InlineStyle::Strikethrough => "STRIKETHROUGH",
            InlineStyle::Code => "CODE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(name))
    }
}

pub type StyleSet = BTreeSet<InlineStyle>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharMeta {
    pub style: StyleSet,
    pub entity: Option<EntityKey>,
}

impl CharMeta {
    pub fn new(style: StyleSet, entity: Option<EntityKey>) -> Self {
        Self { style, entity }
    }
}

/// A maximal run of characters sharing one style set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub styles: StyleSet,
}

/// A maximal range carrying a single style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRange {
    pub style: InlineStyle,
    pub offset: usize,
    pub length: usize,
}

/// Groups characters into maximal spans with identical style sets.
pub fn style_spans(chars: &[CharMeta]) -> Vec<StyleSpan> {
    let mut spans = Vec::with_capacity(chars.len().min(64));
    let mut start = 0usize;
    while start < chars.len() {
        let current = &chars[start].style;
        let mut end = start + 1;
        while end < chars.len() && chars[end].style == *current {
            end += 1;
        }
        spans.push(StyleSpan {
            start,
            end,
            styles: current.clone(),
        });
        start = end;
    }
    spans
}

/// Per style, the maximal ranges where it is set. Ordered by style, then offset.
pub fn style_ranges(chars: &[CharMeta]) -> Vec<StyleRange> {
    let mut ranges = Vec::new();
    for style in InlineStyle::ALL {
        let mut open: Option<usize> = None;
        for (index, meta) in chars.iter().enumerate() {
            match (meta.style.contains(&style), open) {
                (true, None) => open = Some(index),
                (false, Some(start)) => {
                    ranges.push(StyleRange {
                        style,
                        offset: start,
                        length: index - start,
                    });
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            ranges.push(StyleRange {
                style,
                offset: start,
                length: chars.len() - start,
            });
        }
    }
    ranges
}

/// Maximal ranges that reference the same entity key.
pub fn entity_spans(chars: &[CharMeta]) -> Vec<(Range<usize>, EntityKey)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let Some(key) = chars[start].entity else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while end < chars.len() && chars[end].entity == Some(key) {
            end += 1;
        }
        spans.push((start..end, key));
        start = end;
    }
    spans
}
