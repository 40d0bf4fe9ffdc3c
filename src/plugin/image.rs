use super::{EditorPlugin, Event, decode_payload, insert_dimensions};
use crate::core::{DataMap, DataValue};
use crate::doc::markup::keys;
use crate::doc::{EntityType, Mutability};
use crate::editor::rich_text;
use crate::state::EditorState;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_ALT: &str = "image";

/// Payload of the `imageadd` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageAdd {
    pub src: String,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Inserts images as alt text carrying an immutable IMAGE entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePlugin;

impl EditorPlugin for ImagePlugin {
    fn name(&self) -> &str {
        "image"
    }

    fn reduce(&self, state: EditorState, event: &Event<'_>) -> EditorState {
        let Event::Named {
            name: "imageadd",
            payload,
        } = event
        else {
            return state;
        };
        let Some(image) = decode_payload::<ImageAdd>("imageadd", payload) else {
            return state;
        };

        let mut data = DataMap::new();
        data.insert(keys::SRC.into(), DataValue::from(image.src.as_str()));
        insert_dimensions(&mut data, image.width, image.height);
        let (doc, key) =
            state
                .document()
                .create_entity(EntityType::Image, Mutability::Immutable, data);

        let alt = image
            .alt
            .as_deref()
            .filter(|alt| !alt.is_empty())
            .unwrap_or(DEFAULT_ALT);
        match rich_text::insert_tagged(&state.with_document(doc), alt, Some(key)) {
            Ok(next) => next,
            Err(err) => {
                warn!(error = %err, "imageadd rejected");
                state
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add(state: EditorState, payload: serde_json::Value) -> EditorState {
        let event = Event::Named {
            name: "imageadd",
            payload: &payload,
        };
        ImagePlugin.reduce(state, &event)
    }

    #[test]
    fn test_imageadd_inserts_tagged_alt_text() {
        let state = EditorState::create_empty();
        let key = state.document().first_block().key;
        let state = state.with_selection(crate::doc::Selection::collapsed(key, 0));
        let next = add(state, json!({"src": "cat.png", "width": 4, "height": 3}));
        let block = next.document().first_block();
        assert_eq!(block.text(), "image");
        let entity = next.document().entity(block.entity_at(0).unwrap()).unwrap();
        assert_eq!(entity.kind, EntityType::Image);
        assert_eq!(entity.mutability, Mutability::Immutable);
        assert_eq!(entity.data_int("width"), Some(4));
        assert_eq!(next.selection().anchor_offset, 5);
        assert_eq!(next.document().to_markup(), "![image|4x3](cat.png)");
    }

    #[test]
    fn test_imageadd_without_src_is_ignored() {
        let state = EditorState::create_empty();
        let next = add(state.clone(), json!({"alt": "x"}));
        assert_eq!(next, state);
    }
}
