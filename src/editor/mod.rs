//! The command router.
//!
//! [`Editor`] owns the current [`EditorState`] and turns every intent
//! into a new state through one commit path, [`Editor::on_change`]:
//!
//! 1. reducers fold the candidate state with [`Event::Change`]
//! 2. a trailing quote gets an empty paragraph appended after it
//! 3. quote `active` flags are re-derived from the anchor
//! 4. the state is replaced, and a change emission is scheduled when the
//!    document differs from the one replaced
//!
//! Key commands go to plugin interceptors first and fall back to the
//! generic handler in [`rich_text`].

use crate::config::EditorConfig;
use crate::core::{BlockKey, InlineStyle};
use crate::doc::{Block, BlockType, Document, MarkupParser, QuoteSource, Selection};
use crate::plugin::quote::{self, JumpDirection};
use crate::plugin::{Event, LinkRequest, Pipeline, RenderDescriptor, link};
use crate::state::{EditorState, tracker};
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace, warn};

pub mod emitter;
pub mod rich_text;

use emitter::{ChangeEmitter, Clock, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    Backspace,
    BackspaceWord,
    Delete,
    DeleteWord,
    SplitBlock,
    InsertSoftNewline,
    Bold,
    Italic,
    Underline,
    Code,
    Strikethrough,
    Custom(String),
}

impl KeyCommand {
    pub fn from_name(name: &str) -> Self {
        match name {
            "backspace" => KeyCommand::Backspace,
            "backspace-word" => KeyCommand::BackspaceWord,
            "delete" => KeyCommand::Delete,
            "delete-word" => KeyCommand::DeleteWord,
            "split-block" => KeyCommand::SplitBlock,
            "insert-soft-newline" => KeyCommand::InsertSoftNewline,
            "bold" => KeyCommand::Bold,
            "italic" => KeyCommand::Italic,
            "underline" => KeyCommand::Underline,
            "code" => KeyCommand::Code,
            "strikethrough" => KeyCommand::Strikethrough,
            other => KeyCommand::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyCommand::Backspace => "backspace",
            KeyCommand::BackspaceWord => "backspace-word",
            KeyCommand::Delete => "delete",
            KeyCommand::DeleteWord => "delete-word",
            KeyCommand::SplitBlock => "split-block",
            KeyCommand::InsertSoftNewline => "insert-soft-newline",
            KeyCommand::Bold => "bold",
            KeyCommand::Italic => "italic",
            KeyCommand::Underline => "underline",
            KeyCommand::Code => "code",
            KeyCommand::Strikethrough => "strikethrough",
            KeyCommand::Custom(name) => name,
        }
    }

    /// The style a formatting command toggles.
    pub fn inline_style(&self) -> Option<InlineStyle> {
        match self {
            KeyCommand::Bold => Some(InlineStyle::Bold),
            KeyCommand::Italic => Some(InlineStyle::Italic),
            KeyCommand::Underline => Some(InlineStyle::Underline),
            KeyCommand::Code => Some(InlineStyle::Code),
            KeyCommand::Strikethrough => Some(InlineStyle::Strikethrough),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Editor {
    state: EditorState,
    pipeline: Pipeline,
    config: EditorConfig,
    emitter: ChangeEmitter,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(config: EditorConfig, on_value_change: impl FnMut(String) + 'static) -> Self {
        Self::with_clock(config, Box::new(SystemClock), on_value_change)
    }

    pub fn with_clock(
        config: EditorConfig,
        clock: Box<dyn Clock>,
        on_value_change: impl FnMut(String) + 'static,
    ) -> Self {
        Self {
            state: EditorState::create_empty(),
            pipeline: config.pipeline(),
            emitter: ChangeEmitter::new(config.debounce(), Box::new(on_value_change)),
            config,
            clock,
        }
    }

    /// Replaces the configured plugins.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Loads initial content and replaces the current state outright.
    ///
    /// Unlike every other entry point this bypasses the commit path, so no
    /// reducer sees the new content and no change is emitted. A host that
    /// expects its loaded value echoed back through `on_value_change` has
    /// to call [`Editor::flush`] after a following commit, or treat the
    /// markup it passed in as already delivered.
    pub fn load(&mut self, markup: &str, quotes: &[QuoteSource]) {
        let doc = ensure_trailing_block(MarkupParser::parse(markup, quotes));
        debug!(blocks = doc.block_count(), "loaded document");
        self.state = EditorState::create_with_content(doc, self.state.decorator().clone());
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        self.state.document()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn to_markup(&self) -> String {
        self.state.document().to_markup()
    }

    /// Commits `next` as the new state.
    pub fn on_change(&mut self, next: EditorState) {
        let reduced = self.pipeline.reduce(next, &Event::Change { prev: &self.state });
        let doc = ensure_trailing_block(reduced.document().clone());
        let mut state = reduced.with_document(doc);
        if let Some(doc) = tracker::sync_active_quote(state.document(), state.selection()) {
            trace!("active quote changed");
            state = state.with_document(doc);
        }
        let changed = state.document() != self.state.document();
        self.state = state;
        if changed {
            self.emitter.schedule(self.clock.now());
        }
    }

    pub fn handle_event(&mut self, name: &str, payload: &Value) {
        debug!(event = name, "handling event");
        let event = Event::Named { name, payload };
        let next = self.pipeline.reduce(self.state.clone(), &event);
        self.on_change(next);
    }

    /// `false` when nothing handled the command.
    pub fn handle_key_command(&mut self, command: &KeyCommand) -> bool {
        let next = self
            .pipeline
            .handle_key_command(&self.state, command)
            .or_else(|| rich_text::handle_key_command(&self.state, command));
        match next {
            Some(next) => {
                trace!(%command, "key command handled");
                self.on_change(next);
                true
            }
            None => {
                debug!(%command, "unhandled key command");
                false
            }
        }
    }

    pub fn handle_tab(&mut self, shift: bool) -> bool {
        match rich_text::on_tab(&self.state, shift, self.config.max_tab_depth) {
            Some(next) => {
                self.on_change(next);
                true
            }
            None => false,
        }
    }

    pub fn toggle_block_type(&mut self, kind: BlockType) {
        if let Some(next) = rich_text::toggle_block_type(&self.state, &kind) {
            self.on_change(next);
        }
    }

    pub fn toggle_inline_style(&mut self, style: InlineStyle) {
        if let Some(next) = rich_text::toggle_inline_style(&self.state, style) {
            self.on_change(next);
        }
    }

    pub fn update_link(&mut self, request: &LinkRequest) {
        match link::update_link(&self.state, request) {
            Ok(next) => self.on_change(next),
            Err(err) => warn!(error = %err, "link update rejected"),
        }
    }

    pub fn unlink(&mut self) {
        match link::unlink(&self.state) {
            Ok(next) => self.on_change(next),
            Err(err) => warn!(error = %err, "unlink rejected"),
        }
    }

    /// Moves the caret to an empty paragraph above or below the quote
    /// `key`, inserting one when the neighbour is not already empty.
    pub fn jump_from_quote(&mut self, key: BlockKey, direction: JumpDirection) {
        match quote::jump_from_quote(&self.state, key, direction) {
            Ok(next) => self.on_change(next),
            Err(err) => warn!(error = %err, "quote jump rejected"),
        }
    }

    /// Types `text` at the selection, like a native edit.
    pub fn insert_text(&mut self, text: &str) {
        let entity = tracker::entity_for_insertion(self.state.document(), self.state.selection());
        match rich_text::insert_tagged(&self.state, text, entity) {
            Ok(next) => self.on_change(next),
            Err(err) => warn!(error = %err, "text insertion rejected"),
        }
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let selection = tracker::clamp_selection(self.state.document(), &selection);
        let next = self.state.with_selection(selection);
        self.on_change(next);
    }

    pub fn focus_end(&mut self) {
        let selection = tracker::end_of_document(self.state.document());
        self.set_selection(selection);
    }

    /// A click on the editor surface outside the text focuses the end of
    /// the document unless the editor already has focus.
    pub fn handle_click(&mut self) {
        if !self.state.selection().has_focus {
            self.focus_end();
        }
    }

    pub fn render_block(&self, block: &Block) -> Option<RenderDescriptor> {
        self.pipeline.render_block(block)
    }

    /// Delivers the pending change if its window has closed.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        self.emitter.poll(now, self.state.document())
    }

    /// Delivers the pending change now.
    pub fn flush(&mut self) -> bool {
        self.emitter.flush(self.state.document())
    }

    pub fn has_pending_change(&self) -> bool {
        self.emitter.is_pending()
    }
}

/// Appends an empty paragraph when the document ends with a quote.
fn ensure_trailing_block(doc: Document) -> Document {
    if !doc.last_block().is_quote() {
        return doc;
    }
    match doc.append_block(Block::new(BlockType::Unstyled)) {
        Ok(next) => next,
        Err(err) => {
            warn!(error = %err, "could not append trailing block");
            doc
        }
    }
}
