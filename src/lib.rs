//! beditor: an immutable-snapshot rich-text editor core.
//!
//! Documents are ordered blocks of styled text with out-of-line entities
//! (links, images, upload placeholders) and quoted replies. Every edit
//! produces a new snapshot; unchanged blocks are shared between snapshots.
//!
//! - **Document model** - Blocks, entities, selections and the markup codec
//! - **Editor state** - Snapshots plus selection queries
//! - **Plugins** - Composable reducers, renderers and key interceptors
//! - **Editor** - The command router and debounced change emission
//!
//! # Quick Start
//!
//! ```rust
//! use beditor::{Editor, EditorConfig, KeyCommand};
//!
//! let mut editor = Editor::new(EditorConfig::default(), |markup| println!("{markup}"));
//! editor.load("Hello", &[]);
//! editor.focus_end();
//! editor.handle_key_command(&KeyCommand::Bold);
//! editor.insert_text(" world");
//! assert_eq!(editor.to_markup(), "Hello** world**");
//! editor.flush();
//! ```
//!
//! # Features
//!
//! - `cli` - Builds the `beditor` command-line tool (enabled by default)

// Keys, data maps and inline styles
pub mod core;

// Document model, markup codec and raw export
pub mod doc;

// Editor state and selection queries
pub mod state;

// Plugin pipeline and built-in plugins
pub mod plugin;

// Command router and change emission
pub mod editor;

pub mod config;

// Re-export core types
pub use core::{BlockKey, CharMeta, DataMap, DataValue, EntityKey, InlineStyle, StyleSet};

// Re-export doc types
pub use doc::raw::RawDocument;
pub use doc::{
    Block, BlockType, DocError, Document, Entity, EntityMap, EntityType, MarkupParser, Mutability,
    Position, QuoteSource, Selection,
};

// Re-export state types
pub use state::{DecoratorConfig, EditorState};

// Re-export plugin types
pub use plugin::{
    EditorPlugin, Event, JumpDirection, LinkRequest, Pipeline, Plugin, PluginKind,
    RenderDescriptor,
};

// Re-export editor types
pub use config::{ConfigError, EditorConfig};
pub use editor::emitter::{Clock, Debouncer, ManualClock, SystemClock};
pub use editor::{Editor, KeyCommand};
