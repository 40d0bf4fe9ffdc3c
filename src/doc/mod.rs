//! Immutable block/entity document model.
//!
//! A [`Document`] is an ordered list of [`Block`]s plus an [`EntityMap`].
//! Every editing operation takes `&self` and returns a new document; the
//! receiver stays valid. Blocks and entities sit behind `Arc`, so a new
//! snapshot only copies the blocks it touches.

use crate::core::{BlockKey, CharMeta, DataMap, DataValue, EntityKey, InlineStyle, StyleSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

pub mod block;
pub mod entity;
pub mod markup;
pub mod raw;
pub mod selection;

pub use block::{Block, BlockType};
pub use entity::{Entity, EntityMap, EntityType, Mutability};
pub use markup::{MarkupParser, QuoteSource};
pub use selection::{Position, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Block(BlockKey),
    Entity(EntityKey),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Block(key) => write!(f, "block {key}"),
            Missing::Entity(key) => write!(f, "entity {key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocError {
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
    #[error("invalid range")]
    InvalidRange,
}

const TRAILING_QUOTE: &str = "a quote block cannot become the trailing block";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Arc<Block>>,
    entities: EntityMap,
}

impl Document {
    /// A document holding a single empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Arc::new(Block::new(BlockType::Unstyled))],
            entities: EntityMap::new(),
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, DocError> {
        Self::from_parts(blocks, EntityMap::new())
    }

    pub fn from_parts(blocks: Vec<Block>, entities: EntityMap) -> Result<Self, DocError> {
        if blocks.is_empty() {
            return Err(DocError::InvariantViolation(
                "a document needs at least one block",
            ));
        }
        let mut seen = std::collections::HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.key) {
                return Err(DocError::InvariantViolation("duplicate block key"));
            }
            if let Some(key) = block
                .chars()
                .iter()
                .filter_map(|meta| meta.entity)
                .find(|key| !entities.contains(*key))
            {
                return Err(DocError::NotFound(Missing::Entity(key)));
            }
        }
        Ok(Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            entities,
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().map(Arc::as_ref)
    }

    pub fn blocks_in_order(&self) -> Vec<&Block> {
        self.blocks().collect()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn first_block(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn block(&self, key: BlockKey) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|block| block.key == key)
            .map(Arc::as_ref)
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(Arc::as_ref)
    }

    pub fn block_index(&self, key: BlockKey) -> Option<usize> {
        self.blocks.iter().position(|block| block.key == key)
    }

    pub fn block_before(&self, key: BlockKey) -> Option<&Block> {
        let index = self.block_index(key)?;
        index.checked_sub(1).and_then(|prev| self.block_at(prev))
    }

    pub fn block_after(&self, key: BlockKey) -> Option<&Block> {
        let index = self.block_index(key)?;
        self.block_at(index + 1)
    }

    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn has_text(&self) -> bool {
        self.blocks.len() > 1 || !self.first_block().is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.blocks()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Orders the selection's endpoints by document position.
    pub fn ordered(&self, selection: &Selection) -> Result<(Position, Position), DocError> {
        let anchor = self.locate(selection.anchor())?;
        let focus = self.locate(selection.focus())?;
        if (anchor.0, anchor.1.offset) <= (focus.0, focus.1.offset) {
            Ok((anchor.1, focus.1))
        } else {
            Ok((focus.1, anchor.1))
        }
    }

    fn locate(&self, position: Position) -> Result<(usize, Position), DocError> {
        let index = self
            .block_index(position.key)
            .ok_or(DocError::NotFound(Missing::Block(position.key)))?;
        if position.offset > self.blocks[index].len() {
            return Err(DocError::InvalidRange);
        }
        Ok((index, position))
    }

    fn index_of(&self, key: BlockKey) -> Result<usize, DocError> {
        self.block_index(key)
            .ok_or(DocError::NotFound(Missing::Block(key)))
    }

    fn ends_with_quote(&self) -> bool {
        self.last_block().is_quote()
    }

    /// Structural edits may not turn a quote into the trailing block.
    fn check_trailing(&self, next: Document) -> Result<Document, DocError> {
        if next.ends_with_quote() && !self.ends_with_quote() {
            return Err(DocError::InvariantViolation(TRAILING_QUOTE));
        }
        Ok(next)
    }

    fn update_block<F>(&self, key: BlockKey, edit: F) -> Result<Document, DocError>
    where
        F: FnOnce(&mut Block) -> Result<(), DocError>,
    {
        let index = self.index_of(key)?;
        let mut next = self.clone();
        edit(Arc::make_mut(&mut next.blocks[index]))?;
        Ok(next)
    }

    fn insert_at(&self, index: usize, block: Block) -> Result<Document, DocError> {
        if self.block(block.key).is_some() {
            return Err(DocError::InvariantViolation("duplicate block key"));
        }
        let mut next = self.clone();
        next.blocks.insert(index, Arc::new(block));
        self.check_trailing(next)
    }

    pub fn insert_block_before(&self, anchor: BlockKey, block: Block) -> Result<Document, DocError> {
        let index = self.index_of(anchor)?;
        self.insert_at(index, block)
    }

    pub fn insert_block_after(&self, anchor: BlockKey, block: Block) -> Result<Document, DocError> {
        let index = self.index_of(anchor)?;
        self.insert_at(index + 1, block)
    }

    pub fn append_block(&self, block: Block) -> Result<Document, DocError> {
        self.insert_at(self.blocks.len(), block)
    }

    pub fn delete_block(&self, key: BlockKey) -> Result<Document, DocError> {
        let index = self.index_of(key)?;
        if self.blocks.len() == 1 {
            return Err(DocError::InvariantViolation(
                "cannot delete the only block",
            ));
        }
        let mut next = self.clone();
        next.blocks.remove(index);
        self.check_trailing(next)
    }

    pub fn set_block_type(&self, key: BlockKey, kind: BlockType) -> Result<Document, DocError> {
        let next = self.update_block(key, |block| {
            if !kind.is_list() {
                block.depth = 0;
            }
            if block.is_quote() && kind != BlockType::Quote {
                block.data.clear();
            }
            block.kind = kind;
            Ok(())
        })?;
        self.check_trailing(next)
    }

    pub fn set_block_depth(&self, key: BlockKey, depth: u8) -> Result<Document, DocError> {
        self.update_block(key, |block| {
            block.depth = depth;
            Ok(())
        })
    }

    pub fn set_block_data(&self, key: BlockKey, data: DataMap) -> Result<Document, DocError> {
        self.update_block(key, |block| {
            block.data = data;
            Ok(())
        })
    }

    pub fn merge_block_data(&self, key: BlockKey, partial: DataMap) -> Result<Document, DocError> {
        self.update_block(key, |block| {
            block.data.extend(partial);
            Ok(())
        })
    }

    pub fn create_entity(
        &self,
        kind: EntityType,
        mutability: Mutability,
        data: DataMap,
    ) -> (Document, EntityKey) {
        let mut next = self.clone();
        let key = next.entities.create(kind, mutability, data);
        (next, key)
    }

    pub fn merge_entity_data(&self, key: EntityKey, partial: DataMap) -> Result<Document, DocError> {
        let mut next = self.clone();
        if !next.entities.merge_data(key, partial) {
            return Err(DocError::NotFound(Missing::Entity(key)));
        }
        Ok(next)
    }

    fn check_entity(&self, entity: Option<EntityKey>) -> Result<(), DocError> {
        match entity {
            Some(key) if !self.entities.contains(key) => {
                Err(DocError::NotFound(Missing::Entity(key)))
            }
            _ => Ok(()),
        }
    }

    pub fn apply_entity_to_range(
        &self,
        key: BlockKey,
        range: Range<usize>,
        entity: Option<EntityKey>,
    ) -> Result<Document, DocError> {
        self.check_entity(entity)?;
        self.update_block(key, |block| {
            if range.start > range.end || range.end > block.len() {
                return Err(DocError::InvalidRange);
            }
            block.set_entity(range, entity);
            Ok(())
        })
    }

    pub fn apply_entity_to_selection(
        &self,
        selection: &Selection,
        entity: Option<EntityKey>,
    ) -> Result<Document, DocError> {
        self.check_entity(entity)?;
        self.for_each_selected(selection, |block, range| block.set_entity(range, entity))
    }

    pub fn set_style_in_range(
        &self,
        selection: &Selection,
        style: InlineStyle,
        enabled: bool,
    ) -> Result<Document, DocError> {
        self.for_each_selected(selection, |block, range| {
            block.set_style(range, style, enabled)
        })
    }

    /// Runs `edit` on the selected part of every block the selection touches.
    fn for_each_selected<F>(&self, selection: &Selection, mut edit: F) -> Result<Document, DocError>
    where
        F: FnMut(&mut Block, Range<usize>),
    {
        let (start, end) = self.ordered(selection)?;
        let first = self.index_of(start.key)?;
        let last = self.index_of(end.key)?;
        let mut next = self.clone();
        for index in first..=last {
            let block = Arc::make_mut(&mut next.blocks[index]);
            let from = if index == first { start.offset } else { 0 };
            let to = if index == last { end.offset } else { block.len() };
            edit(block, from..to);
        }
        Ok(next)
    }

    /// Selected ranges per block, in document order.
    pub fn selected_ranges(
        &self,
        selection: &Selection,
    ) -> Result<Vec<(BlockKey, Range<usize>)>, DocError> {
        let (start, end) = self.ordered(selection)?;
        let first = self.index_of(start.key)?;
        let last = self.index_of(end.key)?;
        Ok(self.blocks[first..=last]
            .iter()
            .enumerate()
            .map(|(offset, block)| {
                let index = first + offset;
                let from = if index == first { start.offset } else { 0 };
                let to = if index == last { end.offset } else { block.len() };
                (block.key, from..to)
            })
            .collect())
    }

    /// Removes the selected range, merging the end block's tail into the start block.
    pub fn remove_range(&self, selection: &Selection) -> Result<Document, DocError> {
        let (start, end) = self.ordered(selection)?;
        let first = self.index_of(start.key)?;
        let last = self.index_of(end.key)?;
        let mut next = self.clone();
        if first == last {
            let block = Arc::make_mut(&mut next.blocks[first]);
            block.splice(start.offset..end.offset, "", &CharMeta::default());
            return Ok(next);
        }
        let mut tail_block = (*next.blocks[last]).clone();
        let (tail_text, tail_chars) = tail_block.split_off(end.offset);
        let head = Arc::make_mut(&mut next.blocks[first]);
        head.split_off(start.offset);
        head.append(&tail_text, tail_chars);
        next.blocks.drain(first + 1..=last);
        Ok(next)
    }

    /// Replaces the selected range with `text`, tagging it with `style` and
    /// `entity` in the same step.
    pub fn replace_text_in_range(
        &self,
        selection: &Selection,
        text: &str,
        style: Option<&StyleSet>,
        entity: Option<EntityKey>,
    ) -> Result<Document, DocError> {
        self.check_entity(entity)?;
        let (start, _) = self.ordered(selection)?;
        let removed = self.remove_range(selection)?;
        let meta = CharMeta::new(style.cloned().unwrap_or_default(), entity);
        removed.update_block(start.key, |block| {
            block.splice(start.offset..start.offset, text, &meta);
            Ok(())
        })
    }

    /// Removes the selection and splits the start block at its offset.
    /// Returns the new document and the key of the lower half.
    pub fn split_block(&self, selection: &Selection) -> Result<(Document, BlockKey), DocError> {
        let (start, _) = self.ordered(selection)?;
        let mut next = self.remove_range(selection)?;
        let index = next.index_of(start.key)?;
        let upper = Arc::make_mut(&mut next.blocks[index]);
        let (tail_text, tail_chars) = upper.split_off(start.offset);
        let mut lower = Block::new(upper.kind.clone())
            .with_depth(upper.depth)
            .with_data(upper.data.clone());
        lower.append(&tail_text, tail_chars);
        let lower_key = lower.key;
        next.blocks.insert(index + 1, Arc::new(lower));
        Ok((next, lower_key))
    }

    /// Lazily yields the ranges in `key` whose entity has type `kind`.
    pub fn find_entity_ranges_of_type<'a>(
        &'a self,
        key: BlockKey,
        kind: &'a EntityType,
    ) -> Result<EntityRanges<'a>, DocError> {
        let block = self
            .block(key)
            .ok_or(DocError::NotFound(Missing::Block(key)))?;
        Ok(EntityRanges {
            chars: block.chars(),
            entities: &self.entities,
            kind,
            position: 0,
        })
    }

    pub fn set_block_flag(&self, key: BlockKey, name: &str, value: bool) -> Result<Document, DocError> {
        let mut partial = DataMap::new();
        partial.insert(name.to_string(), DataValue::Bool(value));
        self.merge_block_data(key, partial)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`Document::find_entity_ranges_of_type`].
pub struct EntityRanges<'a> {
    chars: &'a [CharMeta],
    entities: &'a EntityMap,
    kind: &'a EntityType,
    position: usize,
}

impl EntityRanges<'_> {
    fn matches(&self, entity: Option<EntityKey>) -> bool {
        entity
            .and_then(|key| self.entities.get(key))
            .is_some_and(|entity| entity.kind == *self.kind)
    }
}

impl Iterator for EntityRanges<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.chars.len() {
            let start = self.position;
            let entity = self.chars[start].entity;
            let mut end = start + 1;
            while end < self.chars.len() && self.chars[end].entity == entity {
                end += 1;
            }
            self.position = end;
            if self.matches(entity) {
                return Some(start..end);
            }
        }
        None
    }
}
