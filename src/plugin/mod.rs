//! Plugin pipeline.
//!
//! A plugin bundles up to four optional capabilities:
//!
//! - **block render map**: block type to element/wrapper description
//! - **reducer**: folds every event into the editor state, in order
//! - **block renderer**: first plugin returning a descriptor wins
//! - **key command interceptor**: first plugin returning a state wins
//!
//! Built-in plugins are variants of [`Plugin`]; anything else plugs in
//! through [`Plugin::Custom`].

use crate::core::{DataMap, DataValue};
use crate::doc::{Block, BlockType};
use crate::editor::KeyCommand;
use crate::state::EditorState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

pub mod core;
pub mod image;
pub mod link;
pub mod quote;
pub mod upload;

pub use self::core::CorePlugin;
pub use self::image::ImagePlugin;
pub use self::link::{LinkPlugin, LinkRequest};
pub use self::quote::{JumpDirection, QuotePlugin};
pub use self::upload::UploadPlugin;

/// What a reducer is asked to fold in.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A committed change; `prev` is the state being replaced.
    Change { prev: &'a EditorState },
    /// A host event such as `quoteadd`.
    Named { name: &'a str, payload: &'a Value },
}

impl Event<'_> {
    pub fn name(&self) -> &str {
        match self {
            Event::Change { .. } => "change",
            Event::Named { name, .. } => name,
        }
    }
}

/// How blocks of one type map onto output elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRendering {
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper: Option<String>,
}

impl BlockRendering {
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            wrapper: None,
        }
    }

    pub fn wrapped(element: &str, wrapper: &str) -> Self {
        Self {
            element: element.to_string(),
            wrapper: Some(wrapper.to_string()),
        }
    }
}

/// A custom rendering decision for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDescriptor {
    pub component: String,
    pub editable: bool,
    pub props: DataMap,
}

pub trait EditorPlugin: fmt::Debug {
    fn name(&self) -> &str;

    fn block_render_map(&self) -> Vec<(BlockType, BlockRendering)> {
        Vec::new()
    }

    fn reduce(&self, state: EditorState, _event: &Event<'_>) -> EditorState {
        state
    }

    fn render_block(&self, _block: &Block) -> Option<RenderDescriptor> {
        None
    }

    fn handle_key_command(
        &self,
        _state: &EditorState,
        _command: &KeyCommand,
    ) -> Option<EditorState> {
        None
    }
}

/// Names of the built-in plugins, as used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Core,
    Quote,
    Image,
    Link,
    Upload,
}

impl PluginKind {
    pub const DEFAULT_ORDER: [PluginKind; 5] = [
        PluginKind::Core,
        PluginKind::Quote,
        PluginKind::Image,
        PluginKind::Link,
        PluginKind::Upload,
    ];
}

#[derive(Debug)]
pub enum Plugin {
    Core,
    Quote,
    Image,
    Link,
    Upload,
    Custom(Box<dyn EditorPlugin>),
}

impl Plugin {
    fn as_dyn(&self) -> &dyn EditorPlugin {
        match self {
            Plugin::Core => &CorePlugin,
            Plugin::Quote => &QuotePlugin,
            Plugin::Image => &ImagePlugin,
            Plugin::Link => &LinkPlugin,
            Plugin::Upload => &UploadPlugin,
            Plugin::Custom(plugin) => plugin.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        self.as_dyn().name()
    }
}

impl From<PluginKind> for Plugin {
    fn from(kind: PluginKind) -> Self {
        match kind {
            PluginKind::Core => Plugin::Core,
            PluginKind::Quote => Plugin::Quote,
            PluginKind::Image => Plugin::Image,
            PluginKind::Link => Plugin::Link,
            PluginKind::Upload => Plugin::Upload,
        }
    }
}

/// The ordered plugin list.
#[derive(Debug)]
pub struct Pipeline {
    plugins: Vec<Plugin>,
}

impl Pipeline {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }

    pub fn from_kinds(kinds: &[PluginKind]) -> Self {
        Self::new(kinds.iter().copied().map(Plugin::from).collect())
    }

    pub fn with(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Folds `event` through every reducer in registration order.
    pub fn reduce(&self, state: EditorState, event: &Event<'_>) -> EditorState {
        self.plugins.iter().fold(state, |state, plugin| {
            trace!(plugin = plugin.name(), event = event.name(), "reduce");
            plugin.as_dyn().reduce(state, event)
        })
    }

    pub fn render_block(&self, block: &Block) -> Option<RenderDescriptor> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.as_dyn().render_block(block))
    }

    pub fn handle_key_command(
        &self,
        state: &EditorState,
        command: &KeyCommand,
    ) -> Option<EditorState> {
        self.plugins.iter().find_map(|plugin| {
            let next = plugin.as_dyn().handle_key_command(state, command)?;
            trace!(plugin = plugin.name(), command = command.as_str(), "intercepted");
            Some(next)
        })
    }

    /// Base element map merged with every plugin's entries; later plugins
    /// override earlier ones.
    pub fn block_render_map(&self) -> HashMap<BlockType, BlockRendering> {
        let mut map = HashMap::from([
            (BlockType::Unstyled, BlockRendering::new("div")),
            (
                BlockType::UnorderedListItem,
                BlockRendering::wrapped("li", "ul"),
            ),
            (
                BlockType::OrderedListItem,
                BlockRendering::wrapped("li", "ol"),
            ),
        ]);
        for plugin in &self.plugins {
            map.extend(plugin.as_dyn().block_render_map());
        }
        map
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_kinds(&PluginKind::DEFAULT_ORDER)
    }
}

/// Decodes an event payload, logging and returning `None` when it does
/// not fit.
pub(crate) fn decode_payload<T: DeserializeOwned>(event: &str, payload: &Value) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(event, error = %err, "ignoring malformed event payload");
            None
        }
    }
}

/// Adds `width` and `height` to an image data map. A lone dimension is
/// dropped; images are sized by both or neither.
pub(crate) fn insert_dimensions(data: &mut DataMap, width: Option<i64>, height: Option<i64>) {
    if let (Some(width), Some(height)) = (width, height) {
        data.insert("width".into(), DataValue::Int(width));
        data.insert("height".into(), DataValue::Int(height));
    }
}
