use crate::core::BlockKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub key: BlockKey,
    pub offset: usize,
}

impl Position {
    pub fn new(key: BlockKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// A selection range. Direction is not stored; it follows from document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    pub has_focus: bool,
}

impl Selection {
    pub fn collapsed(key: BlockKey, offset: usize) -> Self {
        Self {
            anchor_key: key,
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            has_focus: true,
        }
    }

    pub fn between(anchor: Position, focus: Position) -> Self {
        Self {
            anchor_key: anchor.key,
            anchor_offset: anchor.offset,
            focus_key: focus.key,
            focus_offset: focus.offset,
            has_focus: true,
        }
    }

    pub fn with_focus(mut self, has_focus: bool) -> Self {
        self.has_focus = has_focus;
        self
    }

    pub fn anchor(&self) -> Position {
        Position::new(self.anchor_key, self.anchor_offset)
    }

    pub fn focus(&self) -> Position {
        Position::new(self.focus_key, self.focus_offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }
}
