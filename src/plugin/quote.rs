use super::{BlockRendering, EditorPlugin, Event, RenderDescriptor, decode_payload};
use crate::core::{BlockKey, DataMap, DataValue};
use crate::doc::markup::{keys, quote_data};
use crate::doc::{Block, BlockType, DocError, Missing, Selection};
use crate::editor::{KeyCommand, rich_text};
use crate::state::{EditorState, tracker};
use serde::Deserialize;
use tracing::{debug, warn};

/// Payload of the `quoteadd` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuoteAdd {
    pub username: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub text: String,
}

/// Which side of a quote a jump lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpDirection {
    Above,
    Below,
}

/// Payload of the `quotejump` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteJump {
    pub block_key: BlockKey,
    pub direction: JumpDirection,
}

/// Quoted replies: rendering, soft newlines on Enter, `quoteadd` and
/// `quotejump`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotePlugin;

impl EditorPlugin for QuotePlugin {
    fn name(&self) -> &str {
        "quote"
    }

    fn block_render_map(&self) -> Vec<(BlockType, BlockRendering)> {
        vec![(BlockType::Quote, BlockRendering::new("blockquote"))]
    }

    fn reduce(&self, state: EditorState, event: &Event<'_>) -> EditorState {
        let Event::Named { name, payload } = event else {
            return state;
        };
        let result = match *name {
            "quoteadd" => match decode_payload::<QuoteAdd>(name, payload) {
                Some(quote) => add_quote_block(&state, &quote),
                None => return state,
            },
            "quotejump" => match decode_payload::<QuoteJump>(name, payload) {
                Some(jump) => jump_from_quote(&state, jump.block_key, jump.direction),
                None => return state,
            },
            _ => return state,
        };
        match result {
            Ok(next) => next,
            Err(err) => {
                warn!(event = *name, error = %err, "quote event rejected");
                state
            }
        }
    }

    fn render_block(&self, block: &Block) -> Option<RenderDescriptor> {
        if !block.is_quote() {
            return None;
        }
        let mut props = DataMap::new();
        props.insert(
            keys::ACTIVE.into(),
            DataValue::Bool(block.data_bool(keys::ACTIVE).unwrap_or(false)),
        );
        for key in [keys::USERNAME, keys::AVATAR_URL] {
            let value = block.data_str(key).unwrap_or_default();
            props.insert(key.into(), DataValue::from(value));
        }
        Some(RenderDescriptor {
            component: "quote".into(),
            editable: true,
            props,
        })
    }

    fn handle_key_command(&self, state: &EditorState, command: &KeyCommand) -> Option<EditorState> {
        if *command != KeyCommand::SplitBlock {
            return None;
        }
        let block = tracker::start_block(state.document(), state.selection())?;
        if !block.is_quote() {
            return None;
        }
        rich_text::insert_soft_newline(state)
    }
}

/// Inserts a quote before the trailing empty paragraph, creating that
/// paragraph when the document does not end with one. The caret moves to
/// the trailing paragraph.
pub fn add_quote_block(state: &EditorState, quote: &QuoteAdd) -> Result<EditorState, DocError> {
    let block = Block::with_text(BlockType::Quote, &quote.text).with_data(quote_data(
        &quote.username,
        &quote.avatar_url,
        &quote.source_url,
    ));
    let doc = state.document();
    let last = doc.last_block();

    let (next, trailing) = if last.kind == BlockType::Unstyled && last.is_empty() {
        (doc.insert_block_before(last.key, block)?, last.key)
    } else {
        let fresh = Block::new(BlockType::Unstyled);
        let fresh_key = fresh.key;
        let appended = doc.append_block(fresh)?;
        (appended.insert_block_before(fresh_key, block)?, fresh_key)
    };
    debug!(username = %quote.username, "added quote block");
    Ok(state.push(next, Selection::collapsed(trailing, 0)))
}

/// Puts the caret in an empty paragraph directly above or below the
/// quote `key`. An empty paragraph already there is reused; otherwise one
/// is inserted.
pub fn jump_from_quote(
    state: &EditorState,
    key: BlockKey,
    direction: JumpDirection,
) -> Result<EditorState, DocError> {
    let doc = state.document();
    let quote = doc.block(key).ok_or(DocError::NotFound(Missing::Block(key)))?;
    if !quote.is_quote() {
        return Err(DocError::InvariantViolation("jumps start from a quote block"));
    }
    let neighbour = match direction {
        JumpDirection::Above => doc.block_before(key),
        JumpDirection::Below => doc.block_after(key),
    };
    if let Some(block) = neighbour
        && block.kind == BlockType::Unstyled
        && block.is_empty()
    {
        let target = block.key;
        return Ok(state.push(doc.clone(), Selection::collapsed(target, 0)));
    }

    let fresh = Block::new(BlockType::Unstyled);
    let target = fresh.key;
    let next = match direction {
        JumpDirection::Above => doc.insert_block_before(key, fresh)?,
        JumpDirection::Below => doc.insert_block_after(key, fresh)?,
    };
    debug!(block = %key, ?direction, "inserted paragraph beside quote");
    Ok(state.push(next, Selection::collapsed(target, 0)))
}
