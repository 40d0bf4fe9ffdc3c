use super::EditorPlugin;
use crate::doc::Selection;
use crate::editor::KeyCommand;
use crate::state::EditorState;
use tracing::debug;

/// Removes empty blocks on `delete`/`backspace` where the generic handler
/// would merge text instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorePlugin;

impl EditorPlugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn handle_key_command(&self, state: &EditorState, command: &KeyCommand) -> Option<EditorState> {
        let doc = state.document();
        let selection = state.selection();
        if !selection.is_collapsed() {
            return None;
        }
        let block = doc.block(selection.anchor_key)?;
        if !block.is_empty() {
            return None;
        }

        let caret_block = match command {
            KeyCommand::Delete => doc.block_after(block.key)?.key,
            KeyCommand::Backspace if doc.block_before(block.key).is_none() => {
                doc.block_after(block.key)?.key
            }
            _ => return None,
        };
        let next = doc.delete_block(block.key).ok()?;
        debug!(block = %block.key, command = command.as_str(), "removed empty block");
        Some(state.push(next, Selection::collapsed(caret_block, 0)))
    }
}
