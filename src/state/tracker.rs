//! Selection queries.
//!
//! Pure functions that read a [`Document`] through a [`Selection`]: which
//! block holds the anchor, which entity sits at the start, which style the
//! next typed character gets. [`sync_active_quote`] is the one function
//! producing a new document; it keeps the quote `active` flags in line
//! with the anchor.

use super::EditorState;
use crate::core::{BlockKey, EntityKey, StyleSet};
use crate::doc::markup::keys;
use crate::doc::{Block, Document, Entity, Mutability, Position, Selection};

pub fn anchor_block<'a>(doc: &'a Document, selection: &Selection) -> Option<&'a Block> {
    doc.block(selection.anchor_key)
}

pub fn focus_block<'a>(doc: &'a Document, selection: &Selection) -> Option<&'a Block> {
    doc.block(selection.focus_key)
}

/// The earlier end of the selection in document order.
pub fn start(doc: &Document, selection: &Selection) -> Option<Position> {
    doc.ordered(selection).ok().map(|(start, _)| start)
}

pub fn end(doc: &Document, selection: &Selection) -> Option<Position> {
    doc.ordered(selection).ok().map(|(_, end)| end)
}

pub fn start_block<'a>(doc: &'a Document, selection: &Selection) -> Option<&'a Block> {
    start(doc, selection).and_then(|position| doc.block(position.key))
}

pub fn end_block<'a>(doc: &'a Document, selection: &Selection) -> Option<&'a Block> {
    end(doc, selection).and_then(|position| doc.block(position.key))
}

/// Entity on the character at the selection start. A collapsed caret at
/// the end of a non-empty block looks at the character before it.
pub fn start_entity_key(doc: &Document, selection: &Selection) -> Option<EntityKey> {
    let position = start(doc, selection)?;
    let block = doc.block(position.key)?;
    if selection.is_collapsed() && position.offset == block.len() && position.offset > 0 {
        return block.entity_at(position.offset - 1);
    }
    block.entity_at(position.offset)
}

pub fn start_entity<'a>(doc: &'a Document, selection: &Selection) -> Option<&'a Entity> {
    start_entity_key(doc, selection).and_then(|key| doc.entity(key))
}

/// Style a character typed now would carry.
pub fn current_inline_style(state: &EditorState) -> StyleSet {
    if let Some(style) = state.style_override() {
        return style.clone();
    }
    let doc = state.document();
    let selection = state.selection();
    let Some(position) = start(doc, selection) else {
        return StyleSet::new();
    };
    let Some(block) = doc.block(position.key) else {
        return StyleSet::new();
    };
    if selection.is_collapsed() && position.offset > 0 {
        block.style_at(position.offset - 1)
    } else {
        block.style_at(position.offset)
    }
}

/// Entity inserted text should carry. A collapsed caret inherits only a
/// mutable entity that continues on both sides of it.
pub fn entity_for_insertion(doc: &Document, selection: &Selection) -> Option<EntityKey> {
    let position = start(doc, selection)?;
    let block = doc.block(position.key)?;
    let candidate = if selection.is_collapsed() {
        if position.offset == 0 {
            return None;
        }
        let before = block.entity_at(position.offset - 1)?;
        (block.entity_at(position.offset) == Some(before)).then_some(before)?
    } else {
        block.entity_at(position.offset)?
    };
    doc.entity(candidate)
        .filter(|entity| entity.mutability == Mutability::Mutable)
        .map(|entity| entity.key)
}

/// Marks the quote holding the anchor active and every other quote
/// inactive. `None` when every flag is already right.
pub fn sync_active_quote(doc: &Document, selection: &Selection) -> Option<Document> {
    let changes: Vec<(BlockKey, bool)> = doc
        .blocks()
        .filter(|block| block.is_quote())
        .filter_map(|block| {
            let active = block.key == selection.anchor_key;
            (block.data_bool(keys::ACTIVE) != Some(active)).then_some((block.key, active))
        })
        .collect();
    if changes.is_empty() {
        return None;
    }
    changes
        .into_iter()
        .try_fold(doc.clone(), |next, (key, active)| {
            next.set_block_flag(key, keys::ACTIVE, active)
        })
        .ok()
}

/// Moves endpoints that point at missing blocks or past a block's end
/// back into the document.
pub fn clamp_selection(doc: &Document, selection: &Selection) -> Selection {
    let clamp = |position: Position| match doc.block(position.key) {
        Some(block) => Position::new(block.key, position.offset.min(block.len())),
        None => {
            let last = doc.last_block();
            Position::new(last.key, last.len())
        }
    };
    Selection::between(clamp(selection.anchor()), clamp(selection.focus()))
        .with_focus(selection.has_focus)
}

/// Caret at the end of the last block.
pub fn end_of_document(doc: &Document) -> Selection {
    let last = doc.last_block();
    Selection::collapsed(last.key, last.len())
}
