//! Generic key command handling.
//!
//! Runs after every plugin interceptor has declined. Each function returns
//! the next state, or `None` when the command does not apply here (for
//! example backspace at the very start of the document).

use super::KeyCommand;
use crate::core::{EntityKey, InlineStyle};
use crate::doc::markup::{keys, quote_data};
use crate::doc::{Block, BlockType, DocError, Document, Mutability, Position, Selection};
use crate::state::{EditorState, tracker};
use std::ops::Range;

pub fn handle_key_command(state: &EditorState, command: &KeyCommand) -> Option<EditorState> {
    if let Some(style) = command.inline_style() {
        return toggle_inline_style(state, style);
    }
    match command {
        KeyCommand::Backspace => backspace(state, Granularity::Grapheme),
        KeyCommand::BackspaceWord => backspace(state, Granularity::Word),
        KeyCommand::Delete => delete(state, Granularity::Grapheme),
        KeyCommand::DeleteWord => delete(state, Granularity::Word),
        KeyCommand::SplitBlock => split_block(state),
        KeyCommand::InsertSoftNewline => insert_soft_newline(state),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Grapheme,
    Word,
}

/// Replaces the selection with `text`, styled like the surrounding text
/// and tagged with `entity`. The caret ends up after the insertion.
pub fn insert_tagged(
    state: &EditorState,
    text: &str,
    entity: Option<EntityKey>,
) -> Result<EditorState, DocError> {
    let doc = state.document();
    let selection = state.selection();
    let (start, _) = doc.ordered(selection)?;
    let style = tracker::current_inline_style(state);
    let next = doc.replace_text_in_range(selection, text, Some(&style), entity)?;
    let caret = Selection::collapsed(start.key, start.offset + text.chars().count());
    Ok(state.push(next, caret))
}

pub fn insert_soft_newline(state: &EditorState) -> Option<EditorState> {
    insert_tagged(state, "\n", None).ok()
}

fn remove_selection(state: &EditorState) -> Option<EditorState> {
    let doc = state.document();
    let (start, _) = doc.ordered(state.selection()).ok()?;
    let next = doc.remove_range(state.selection()).ok()?;
    Some(state.push(next, Selection::collapsed(start.key, start.offset)))
}

/// Removes `range` of one block, widened to whole immutable entity runs.
fn remove_in_block(state: &EditorState, block: &Block, range: Range<usize>) -> Option<EditorState> {
    let range = widen_to_immutable(state.document(), block, range);
    let removal = Selection::between(
        Position::new(block.key, range.start),
        Position::new(block.key, range.end),
    );
    let next = state.document().remove_range(&removal).ok()?;
    Some(state.push(next, Selection::collapsed(block.key, range.start)))
}

fn widen_to_immutable(doc: &Document, block: &Block, range: Range<usize>) -> Range<usize> {
    let mut widened = range.clone();
    for (run, key) in block.entity_ranges() {
        let immutable = doc
            .entity(key)
            .is_some_and(|entity| entity.mutability == Mutability::Immutable);
        if immutable && run.start < range.end && range.start < run.end {
            widened.start = widened.start.min(run.start);
            widened.end = widened.end.max(run.end);
        }
    }
    widened
}

/// Joins `lower` onto the end of `upper`; the caret sits at the seam.
fn merge_blocks(state: &EditorState, upper: &Block, lower: &Block) -> Option<EditorState> {
    let seam = Position::new(upper.key, upper.len());
    let removal = Selection::between(seam, Position::new(lower.key, 0));
    let next = state.document().remove_range(&removal).ok()?;
    Some(state.push(next, Selection::collapsed(seam.key, seam.offset)))
}

fn backspace(state: &EditorState, granularity: Granularity) -> Option<EditorState> {
    let selection = state.selection();
    if !selection.is_collapsed() {
        return remove_selection(state);
    }
    let doc = state.document();
    let block = doc.block(selection.anchor_key)?;
    let offset = selection.anchor_offset.min(block.len());

    if offset == 0 {
        if block.is_empty() && block.kind != BlockType::Unstyled {
            let next = doc.set_block_type(block.key, BlockType::Unstyled).ok()?;
            return Some(state.with_document(next));
        }
        let upper = doc.block_before(block.key)?;
        return merge_blocks(state, upper, block);
    }
    let from = match granularity {
        Granularity::Grapheme => block.prev_grapheme_boundary(offset),
        Granularity::Word => block.prev_word_boundary(offset),
    };
    remove_in_block(state, block, from..offset)
}

fn delete(state: &EditorState, granularity: Granularity) -> Option<EditorState> {
    let selection = state.selection();
    if !selection.is_collapsed() {
        return remove_selection(state);
    }
    let doc = state.document();
    let block = doc.block(selection.anchor_key)?;
    let offset = selection.anchor_offset.min(block.len());

    if offset == block.len() {
        let lower = doc.block_after(block.key)?;
        return merge_blocks(state, block, lower);
    }
    let to = match granularity {
        Granularity::Grapheme => block.next_grapheme_boundary(offset),
        Granularity::Word => block.next_word_boundary(offset),
    };
    remove_in_block(state, block, offset..to)
}

fn split_block(state: &EditorState) -> Option<EditorState> {
    let doc = state.document();
    let selection = state.selection();
    let block = tracker::start_block(doc, selection)?;
    if selection.is_collapsed() && block.is_empty() && block.kind.is_list() {
        let next = doc.set_block_type(block.key, BlockType::Unstyled).ok()?;
        return Some(state.with_document(next));
    }
    let (next, lower) = doc.split_block(selection).ok()?;
    Some(state.push(next, Selection::collapsed(lower, 0)))
}

/// Collapsed caret: flips the style in the pending override. Range: sets
/// the style on every selected character, or clears it when all of them
/// already carry it.
pub fn toggle_inline_style(state: &EditorState, style: InlineStyle) -> Option<EditorState> {
    let doc = state.document();
    let selection = state.selection();
    if selection.is_collapsed() {
        let mut pending = tracker::current_inline_style(state);
        if !pending.remove(&style) {
            pending.insert(style);
        }
        return Some(state.with_style_override(Some(pending)));
    }
    let ranges = doc.selected_ranges(selection).ok()?;
    let all_styled = ranges.iter().all(|(key, range)| {
        doc.block(*key).is_some_and(|block| {
            block.chars()[range.clone()]
                .iter()
                .all(|meta| meta.style.contains(&style))
        })
    });
    let next = doc.set_style_in_range(selection, style, !all_styled).ok()?;
    Some(state.with_document(next))
}

/// Sets every selected block to `kind`, or back to a paragraph when the
/// start block already has it.
pub fn toggle_block_type(state: &EditorState, kind: &BlockType) -> Option<EditorState> {
    let doc = state.document();
    let selection = state.selection();
    let start = tracker::start_block(doc, selection)?;
    let target = if start.kind == *kind {
        BlockType::Unstyled
    } else {
        kind.clone()
    };
    let ranges = doc.selected_ranges(selection).ok()?;

    let mut next = doc.clone();
    let touches_last = ranges
        .last()
        .is_some_and(|(key, _)| *key == doc.last_block().key);
    if target == BlockType::Quote && touches_last {
        next = next.append_block(Block::new(BlockType::Unstyled)).ok()?;
    }
    for (key, _) in ranges {
        next = next.set_block_type(key, target.clone()).ok()?;
        let needs_data = next
            .block(key)
            .is_some_and(|block| block.is_quote() && block.data_str(keys::USERNAME).is_none());
        if needs_data {
            next = next.set_block_data(key, quote_data("", "", "")).ok()?;
        }
    }
    Some(state.with_document(next))
}

/// Indents (or with `shift`, outdents) a list item. Only applies within
/// one block whose predecessor is a list item of the same type; the new
/// depth never exceeds `max_depth` or the predecessor's depth plus one.
pub fn on_tab(state: &EditorState, shift: bool, max_depth: u8) -> Option<EditorState> {
    let doc = state.document();
    let selection = state.selection();
    let (start, end) = doc.ordered(selection).ok()?;
    if start.key != end.key {
        return None;
    }
    let block = doc.block(start.key)?;
    if !block.kind.is_list() {
        return None;
    }
    let previous = doc.block_before(block.key)?;
    if previous.kind != block.kind {
        return None;
    }
    let depth = if shift {
        block.depth.saturating_sub(1)
    } else {
        block
            .depth
            .saturating_add(1)
            .min(previous.depth.saturating_add(1))
            .min(max_depth)
    };
    // An unshifted tab never pulls an over-indented item back out.
    if depth == block.depth || (!shift && depth < block.depth) {
        return None;
    }
    let next = doc.set_block_depth(block.key, depth).ok()?;
    Some(state.with_document(next))
}
