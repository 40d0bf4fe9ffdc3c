use crate::core::style::{self, StyleSpan};
use crate::core::{BlockKey, CharMeta, DataMap, EntityKey, InlineStyle, StyleRange, StyleSet};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Unstyled,
    UnorderedListItem,
    OrderedListItem,
    Quote,
    Custom(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::Quote => "quote",
            BlockType::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "unstyled" | "paragraph" => BlockType::Unstyled,
            "unordered-list-item" => BlockType::UnorderedListItem,
            "ordered-list-item" => BlockType::OrderedListItem,
            "quote" => BlockType::Quote,
            other => BlockType::Custom(other.to_string()),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            BlockType::UnorderedListItem | BlockType::OrderedListItem
        )
    }
}

impl From<String> for BlockType {
    fn from(name: String) -> Self {
        BlockType::from_name(&name)
    }
}

impl From<BlockType> for String {
    fn from(kind: BlockType) -> Self {
        kind.as_str().to_string()
    }
}

/// One unit of document content.
///
/// `text` and the per-character metadata always have the same length in
/// `char`s; every offset in this crate counts `char`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: BlockKey,
    pub kind: BlockType,
    pub depth: u8,
    pub data: DataMap,
    text: String,
    chars: Vec<CharMeta>,
}

impl Block {
    pub fn new(kind: BlockType) -> Self {
        Self {
            key: BlockKey::new(),
            kind,
            depth: 0,
            data: DataMap::new(),
            text: String::new(),
            chars: Vec::new(),
        }
    }

    pub fn with_text(kind: BlockType, text: &str) -> Self {
        let chars = vec![CharMeta::default(); text.chars().count()];
        Self {
            text: text.to_string(),
            chars,
            ..Self::new(kind)
        }
    }

    /// Builds a block from text and matching metadata; `None` if the lengths disagree.
    pub fn from_parts(kind: BlockType, text: String, chars: Vec<CharMeta>) -> Option<Self> {
        if text.chars().count() != chars.len() {
            return None;
        }
        Some(Self {
            text,
            chars,
            ..Self::new(kind)
        })
    }

    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_quote(&self) -> bool {
        self.kind == BlockType::Quote
    }

    pub fn chars(&self) -> &[CharMeta] {
        &self.chars
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.chars.get(offset).and_then(|meta| meta.entity)
    }

    pub fn style_at(&self, offset: usize) -> StyleSet {
        self.chars
            .get(offset)
            .map(|meta| meta.style.clone())
            .unwrap_or_default()
    }

    pub fn style_spans(&self) -> Vec<StyleSpan> {
        style::style_spans(&self.chars)
    }

    pub fn inline_style_ranges(&self) -> Vec<StyleRange> {
        style::style_ranges(&self.chars)
    }

    pub fn entity_ranges(&self) -> Vec<(Range<usize>, EntityKey)> {
        style::entity_spans(&self.chars)
    }

    /// Ranges in this block referencing `key`.
    pub fn ranges_of_entity(&self, key: EntityKey) -> Vec<Range<usize>> {
        self.entity_ranges()
            .into_iter()
            .filter(|(_, candidate)| *candidate == key)
            .map(|(range, _)| range)
            .collect()
    }

    pub fn data_str(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(|value| value.as_str())
    }

    pub fn data_bool(&self, name: &str) -> Option<bool> {
        self.data.get(name).and_then(|value| value.as_bool())
    }

    /// Replaces `range` with `text`, every new char carrying `meta`.
    pub(crate) fn splice(&mut self, range: Range<usize>, text: &str, meta: &CharMeta) {
        let start = char_to_byte(&self.text, range.start);
        let end = char_to_byte(&self.text, range.end);
        self.text.replace_range(start..end, text);
        let inserted = text.chars().map(|_| meta.clone());
        self.chars.splice(range, inserted);
    }

    /// Splits off everything from `offset`, returning the tail text and metadata.
    pub(crate) fn split_off(&mut self, offset: usize) -> (String, Vec<CharMeta>) {
        let byte = char_to_byte(&self.text, offset);
        let tail_text = self.text.split_off(byte);
        let tail_chars = self.chars.split_off(offset);
        (tail_text, tail_chars)
    }

    pub(crate) fn append(&mut self, text: &str, chars: Vec<CharMeta>) {
        self.text.push_str(text);
        self.chars.extend(chars);
    }

    pub(crate) fn set_entity(&mut self, range: Range<usize>, entity: Option<EntityKey>) {
        for meta in &mut self.chars[range] {
            meta.entity = entity;
        }
    }

    pub(crate) fn set_style(&mut self, range: Range<usize>, style: InlineStyle, enabled: bool) {
        for meta in &mut self.chars[range] {
            if enabled {
                meta.style.insert(style);
            } else {
                meta.style.remove(&style);
            }
        }
    }

    /// Char offset of the grapheme boundary before `offset`.
    pub fn prev_grapheme_boundary(&self, offset: usize) -> usize {
        self.boundaries(self.text.grapheme_indices(true).map(|(index, _)| index))
            .into_iter()
            .take_while(|boundary| *boundary < offset)
            .last()
            .unwrap_or(0)
    }

    /// Char offset of the grapheme boundary after `offset`.
    pub fn next_grapheme_boundary(&self, offset: usize) -> usize {
        self.boundaries(self.text.grapheme_indices(true).map(|(index, _)| index))
            .into_iter()
            .find(|boundary| *boundary > offset)
            .unwrap_or(self.len())
    }

    /// Start of the word (skipping whitespace) before `offset`.
    pub fn prev_word_boundary(&self, offset: usize) -> usize {
        let words = self.word_starts();
        words
            .into_iter()
            .filter(|start| *start < offset)
            .last()
            .unwrap_or(0)
    }

    /// End of the word (skipping whitespace) after `offset`.
    pub fn next_word_boundary(&self, offset: usize) -> usize {
        let mut char_index = 0usize;
        for segment in self.text.split_word_bounds() {
            let len = segment.chars().count();
            let end = char_index + len;
            if end > offset && !segment.trim().is_empty() {
                return end;
            }
            char_index = end;
        }
        self.len()
    }

    fn word_starts(&self) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut char_index = 0usize;
        for segment in self.text.split_word_bounds() {
            if !segment.trim().is_empty() {
                starts.push(char_index);
            }
            char_index += segment.chars().count();
        }
        starts
    }

    /// Converts byte boundaries to char offsets, including the end of the text.
    fn boundaries(&self, bytes: impl Iterator<Item = usize>) -> Vec<usize> {
        let mut out: Vec<usize> = bytes
            .map(|byte| self.text[..byte].chars().count())
            .collect();
        out.push(self.len());
        out
    }
}

pub(crate) fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
