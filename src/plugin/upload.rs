//! Upload placeholders.
//!
//! `uploadstart` drops a run of placeholder text tagged with an UPLOAD
//! entity. When the host reports `uploadfinish`, every run of that upload
//! is retargeted to a freshly created IMAGE entity; upload entities are
//! immutable, so they are never rewritten in place. `uploadfail` removes
//! the placeholder text.

use super::{EditorPlugin, Event, decode_payload, insert_dimensions};
use crate::core::{BlockKey, DataMap, DataValue, EntityKey};
use crate::doc::markup::keys;
use crate::doc::{DocError, Document, EntityType, Mutability, Position, Selection};
use crate::editor::rich_text;
use crate::state::{EditorState, tracker};
use serde::Deserialize;
use std::ops::Range;
use tracing::{debug, warn};

const DEFAULT_NAME: &str = "upload";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadStart {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadFinish {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadFail {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPlugin;

impl EditorPlugin for UploadPlugin {
    fn name(&self) -> &str {
        "upload"
    }

    fn reduce(&self, state: EditorState, event: &Event<'_>) -> EditorState {
        let Event::Named { name, payload } = event else {
            return state;
        };
        let result = match *name {
            "uploadstart" => decode_payload::<UploadStart>(name, payload)
                .map(|start| start_upload(&state, &start)),
            "uploadfinish" => decode_payload::<UploadFinish>(name, payload)
                .map(|finish| finish_upload(&state, &finish)),
            "uploadfail" => {
                decode_payload::<UploadFail>(name, payload).map(|fail| fail_upload(&state, &fail))
            }
            _ => None,
        };
        match result {
            Some(Ok(next)) => next,
            Some(Err(err)) => {
                warn!(event = *name, error = %err, "upload event rejected");
                state
            }
            None => state,
        }
    }
}

fn start_upload(state: &EditorState, start: &UploadStart) -> Result<EditorState, DocError> {
    let name = if start.name.is_empty() {
        DEFAULT_NAME
    } else {
        start.name.as_str()
    };
    let mut data = DataMap::new();
    data.insert(keys::ID.into(), DataValue::from(start.id.as_str()));
    data.insert(keys::NAME.into(), DataValue::from(name));
    let (doc, key) = state
        .document()
        .create_entity(EntityType::Upload, Mutability::Immutable, data);
    debug!(id = %start.id, "upload placeholder inserted");
    rich_text::insert_tagged(&state.with_document(doc), name, Some(key))
}

fn finish_upload(state: &EditorState, finish: &UploadFinish) -> Result<EditorState, DocError> {
    let placeholders = placeholder_ranges(state.document(), &finish.id);
    if placeholders.is_empty() {
        warn!(id = %finish.id, "no placeholder for finished upload");
        return Ok(state.clone());
    }
    let mut data = DataMap::new();
    data.insert(keys::SRC.into(), DataValue::from(finish.src.as_str()));
    insert_dimensions(&mut data, finish.width, finish.height);
    let (doc, image) =
        state
            .document()
            .create_entity(EntityType::Image, Mutability::Immutable, data);
    let next = placeholders
        .into_iter()
        .try_fold(doc, |doc, (block, range)| {
            doc.apply_entity_to_range(block, range, Some(image))
        })?;
    debug!(id = %finish.id, "upload placeholder replaced");
    Ok(state.with_document(next))
}

fn fail_upload(state: &EditorState, fail: &UploadFail) -> Result<EditorState, DocError> {
    let mut placeholders = placeholder_ranges(state.document(), &fail.id);
    // Right to left so earlier offsets in the same block stay valid.
    placeholders.reverse();
    let mut doc = state.document().clone();
    let mut selection = *state.selection();
    for (block, range) in placeholders {
        let removal = Selection::between(
            Position::new(block, range.start),
            Position::new(block, range.end),
        );
        doc = doc.remove_range(&removal)?;
        selection = Selection::between(
            shift_position(selection.anchor(), block, &range),
            shift_position(selection.focus(), block, &range),
        )
        .with_focus(selection.has_focus);
    }
    let selection = tracker::clamp_selection(&doc, &selection);
    debug!(id = %fail.id, "upload placeholder removed");
    Ok(state.push(doc, selection))
}

/// Every range, in document order, tagged with an UPLOAD entity for `id`.
fn placeholder_ranges(doc: &Document, id: &str) -> Vec<(BlockKey, Range<usize>)> {
    let is_placeholder = |key: EntityKey| {
        doc.entity(key).is_some_and(|entity| {
            entity.kind == EntityType::Upload && entity.data_str(keys::ID) == Some(id)
        })
    };
    let mut ranges = Vec::new();
    for block in doc.blocks() {
        for (range, key) in block.entity_ranges() {
            if is_placeholder(key) {
                ranges.push((block.key, range));
            }
        }
    }
    ranges
}

/// Position after `range` is removed from `block`.
fn shift_position(position: Position, block: BlockKey, range: &Range<usize>) -> Position {
    if position.key != block || position.offset <= range.start {
        return position;
    }
    let offset = if position.offset >= range.end {
        position.offset - (range.end - range.start)
    } else {
        range.start
    };
    Position::new(block, offset)
}
