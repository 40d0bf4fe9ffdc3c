//! Link editing.
//!
//! [`update_link`] resolves a [`LinkRequest`] against the current
//! selection:
//!
//! | text  | target link     | selection     | effect                         |
//! |-------|-----------------|---------------|--------------------------------|
//! | empty | same url        | any           | unlink the target              |
//! | empty | different url   | any           | update the target's url        |
//! | empty | none            | non-collapsed | link the selection             |
//! | other | -               | -             | replace selection with text    |
//!
//! The target is the entity named by the request, falling back to the
//! link at the selection start.

use super::{EditorPlugin, Event, decode_payload};
use crate::core::{DataMap, DataValue, EntityKey};
use crate::doc::markup::keys;
use crate::doc::{DocError, Entity, EntityType, Mutability};
use crate::editor::rich_text;
use crate::state::{EditorState, tracker};
use serde::Deserialize;
use tracing::{debug, warn};

/// Payload of the `linkupdate` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entity_key: Option<EntityKey>,
}

impl LinkRequest {
    pub fn new(url: &str, text: &str) -> Self {
        Self {
            url: url.to_string(),
            text: text.to_string(),
            entity_key: None,
        }
    }

    pub fn for_entity(mut self, key: EntityKey) -> Self {
        self.entity_key = Some(key);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkPlugin;

impl EditorPlugin for LinkPlugin {
    fn name(&self) -> &str {
        "link"
    }

    fn reduce(&self, state: EditorState, event: &Event<'_>) -> EditorState {
        let Event::Named { name, payload } = event else {
            return state;
        };
        let result = match *name {
            "linkupdate" => match decode_payload::<LinkRequest>(name, payload) {
                Some(request) => update_link(&state, &request),
                None => return state,
            },
            "unlink" => unlink(&state),
            _ => return state,
        };
        result.unwrap_or_else(|err| {
            warn!(event = *name, error = %err, "link event rejected");
            state
        })
    }
}

fn link_url(entity: &Entity) -> &str {
    entity.data_str(keys::URL).unwrap_or_default()
}

fn url_data(url: &str) -> DataMap {
    let mut data = DataMap::new();
    data.insert(keys::URL.into(), DataValue::from(url));
    data
}

fn target_link<'a>(state: &'a EditorState, request: &LinkRequest) -> Option<&'a Entity> {
    let doc = state.document();
    let named = request
        .entity_key
        .and_then(|key| doc.entity(key))
        .filter(|entity| entity.kind == EntityType::Link);
    named.or_else(|| {
        tracker::start_entity(doc, state.selection())
            .filter(|entity| entity.kind == EntityType::Link)
    })
}

pub fn update_link(state: &EditorState, request: &LinkRequest) -> Result<EditorState, DocError> {
    let url = request.url.trim();
    if url.is_empty() && request.text.is_empty() {
        return Ok(state.clone());
    }
    let doc = state.document();
    let selection = state.selection();
    let target = target_link(state, request);

    if request.text.is_empty() {
        match target {
            Some(entity) if link_url(entity) == url => {
                debug!(entity = %entity.key, "link removed");
                return unlink_entity(state, entity.key);
            }
            Some(entity) => {
                debug!(entity = %entity.key, url, "link url updated");
                let next = doc.merge_entity_data(entity.key, url_data(url))?;
                return Ok(state.with_document(next));
            }
            None if !selection.is_collapsed() => {
                let (next, key) =
                    doc.create_entity(EntityType::Link, Mutability::Mutable, url_data(url));
                debug!(entity = %key, url, "selection linked");
                let next = next.apply_entity_to_selection(selection, Some(key))?;
                return Ok(state.with_document(next));
            }
            None => {}
        }
    }

    let text = if request.text.is_empty() {
        url
    } else {
        request.text.as_str()
    };
    if url.is_empty() {
        return rich_text::insert_tagged(state, text, None);
    }
    match target.filter(|entity| link_url(entity) == url) {
        Some(entity) => rich_text::insert_tagged(state, text, Some(entity.key)),
        None => {
            let (next, key) =
                doc.create_entity(EntityType::Link, Mutability::Mutable, url_data(url));
            debug!(entity = %key, url, "link inserted");
            rich_text::insert_tagged(&state.with_document(next), text, Some(key))
        }
    }
}

/// Clears the start entity from every range of it in the anchor block.
pub fn unlink(state: &EditorState) -> Result<EditorState, DocError> {
    match tracker::start_entity_key(state.document(), state.selection()) {
        Some(key) => unlink_entity(state, key),
        None => Ok(state.clone()),
    }
}

fn unlink_entity(state: &EditorState, key: EntityKey) -> Result<EditorState, DocError> {
    let doc = state.document();
    let Some(block) = tracker::anchor_block(doc, state.selection()) else {
        return Ok(state.clone());
    };
    let next = block
        .ranges_of_entity(key)
        .into_iter()
        .try_fold(doc.clone(), |next, range| {
            next.apply_entity_to_range(block.key, range, None)
        })?;
    Ok(state.with_document(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{MarkupParser, Position, Selection};

    fn state_with(markup: &str, selection: impl Fn(&crate::doc::Document) -> Selection) -> EditorState {
        let doc = MarkupParser::parse(markup, &[]);
        let selection = selection(&doc);
        EditorState::create_with_content(doc, Default::default()).with_selection(selection)
    }

    fn caret(offset: usize) -> impl Fn(&crate::doc::Document) -> Selection {
        move |doc: &crate::doc::Document| Selection::collapsed(doc.first_block().key, offset)
    }

    #[test]
    fn test_empty_text_same_url_unlinks() {
        let state = state_with("a [bc](http://y) [d](http://y)", caret(3));
        let next = update_link(&state, &LinkRequest::new("http://y", "")).unwrap();
        let block = next.document().first_block();
        assert_eq!(block.text(), "a bc d");
        assert_eq!(block.entity_at(2), None);
        // Separate entity, untouched.
        assert!(block.entity_at(5).is_some());
    }

    #[test]
    fn test_empty_text_new_url_updates_in_place() {
        let state = state_with("a [bc](http://y)", caret(3));
        let key = state.document().first_block().entity_at(2).unwrap();
        let next = update_link(&state, &LinkRequest::new("http://x", "")).unwrap();
        let doc = next.document();
        assert_eq!(doc.entities().len(), 1);
        assert_eq!(doc.entity(key).unwrap().data_str("url"), Some("http://x"));
        assert_eq!(doc.first_block().entity_at(2), Some(key));
    }

    #[test]
    fn test_empty_text_links_selection() {
        let state = state_with("hello world", |doc| {
            let key = doc.first_block().key;
            Selection::between(Position::new(key, 6), Position::new(key, 11))
        });
        let next = update_link(&state, &LinkRequest::new(" http://w ", "")).unwrap();
        assert_eq!(next.document().to_markup(), "hello [world](http://w)");
    }

    #[test]
    fn test_text_replaces_selection_with_new_link() {
        let state = state_with("see ", caret(4));
        let next = update_link(&state, &LinkRequest::new("http://z", "zed")).unwrap();
        assert_eq!(next.document().to_markup(), "see [zed](http://z)");
        assert_eq!(next.selection().anchor_offset, 7);
    }

    #[test]
    fn test_url_used_as_text_when_collapsed() {
        let state = state_with("", caret(0));
        let next = update_link(&state, &LinkRequest::new("http://z", "")).unwrap();
        assert_eq!(next.document().first_block().text(), "http://z");
        assert_eq!(next.document().entities().len(), 1);
    }

    #[test]
    fn test_text_inside_same_link_reuses_entity() {
        let state = state_with("[ab](http://y)", caret(1));
        let key = state.document().first_block().entity_at(0).unwrap();
        let next = update_link(&state, &LinkRequest::new("http://y", "X")).unwrap();
        let block = next.document().first_block();
        assert_eq!(block.text(), "aXb");
        assert_eq!(block.ranges_of_entity(key), vec![0..3]);
        assert_eq!(next.document().entities().len(), 1);
    }

    #[test]
    fn test_blank_url_inserts_plain_text() {
        let state = state_with("", caret(0));
        let next = update_link(&state, &LinkRequest::new("  ", "plain")).unwrap();
        assert_eq!(next.document().to_markup(), "plain");
        assert!(next.document().entities().is_empty());

        let unchanged = update_link(&state, &LinkRequest::new("", "")).unwrap();
        assert_eq!(unchanged, state);
    }

    #[test]
    fn test_unlink_clears_only_anchor_block_ranges() {
        let doc = MarkupParser::parse("[ab](u)\n\n[cd](u)", &[]);
        let first = doc.first_block().key;
        let second = doc.last_block().key;
        let key = doc.first_block().entity_at(0).unwrap();
        let doc = doc.apply_entity_to_range(second, 0..2, Some(key)).unwrap();
        let state = EditorState::create_with_content(doc, Default::default())
            .with_selection(Selection::collapsed(first, 1));
        let next = unlink(&state).unwrap();
        assert_eq!(next.document().first_block().entity_at(0), None);
        assert_eq!(next.document().last_block().entity_at(0), Some(key));
    }
}
