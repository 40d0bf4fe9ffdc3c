//! Editor state snapshots.
//!
//! An [`EditorState`] bundles the current [`Document`], the [`Selection`],
//! the entity decorators used by the renderer, and the pending inline
//! style for a collapsed caret. Every accepted edit replaces the whole
//! value; nothing inside is mutated in place.

use crate::core::{BlockKey, StyleSet};
use crate::doc::{Document, EntityType, Selection};
use std::ops::Range;
use std::sync::Arc;

pub mod tracker;

/// Maps entity types to the component that renders their ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorConfig {
    strategies: Vec<(EntityType, String)>,
}

/// A decorated range inside one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub range: Range<usize>,
    pub component: String,
}

impl DecoratorConfig {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, kind: EntityType, component: impl Into<String>) -> Self {
        self.strategies.push((kind, component.into()));
        self
    }

    /// Decorations for `block`, ordered by strategy then offset.
    pub fn decorate(&self, doc: &Document, block: BlockKey) -> Vec<Decoration> {
        let mut out = Vec::new();
        for (kind, component) in &self.strategies {
            let Ok(ranges) = doc.find_entity_ranges_of_type(block, kind) else {
                continue;
            };
            out.extend(ranges.map(|range| Decoration {
                range,
                component: component.clone(),
            }));
        }
        out
    }
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self::empty()
            .with_strategy(EntityType::Link, "link")
            .with_strategy(EntityType::Image, "image")
            .with_strategy(EntityType::Upload, "upload")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    document: Document,
    selection: Selection,
    decorator: Arc<DecoratorConfig>,
    style_override: Option<StyleSet>,
}

impl EditorState {
    /// A state over `document` with an unfocused caret at its start.
    pub fn create_with_content(document: Document, decorator: DecoratorConfig) -> Self {
        let first = document.first_block().key;
        Self {
            document,
            selection: Selection::collapsed(first, 0).with_focus(false),
            decorator: Arc::new(decorator),
            style_override: None,
        }
    }

    pub fn create_empty() -> Self {
        Self::create_with_content(Document::new(), DecoratorConfig::default())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn decorator(&self) -> &DecoratorConfig {
        &self.decorator
    }

    pub fn style_override(&self) -> Option<&StyleSet> {
        self.style_override.as_ref()
    }

    pub fn with_document(&self, document: Document) -> Self {
        Self {
            document,
            ..self.clone()
        }
    }

    /// Moving the selection drops any pending inline style.
    pub fn with_selection(&self, selection: Selection) -> Self {
        let style_override = if selection == self.selection {
            self.style_override.clone()
        } else {
            None
        };
        Self {
            selection,
            style_override,
            ..self.clone()
        }
    }

    pub fn with_style_override(&self, style: Option<StyleSet>) -> Self {
        Self {
            style_override: style,
            ..self.clone()
        }
    }

    /// The result of an edit: new content and the selection after it.
    pub fn push(&self, document: Document, selection: Selection) -> Self {
        Self {
            document,
            selection,
            decorator: Arc::clone(&self.decorator),
            style_override: None,
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::create_empty()
    }
}
