//! Serde view of a document: blocks with derived style and entity ranges,
//! plus the entity map keyed by entity key.

use super::{Document, Entity};
use crate::core::{BlockKey, DataMap, EntityKey, StyleRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    pub entity_map: BTreeMap<String, Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub key: BlockKey,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub depth: u8,
    pub inline_style_ranges: Vec<StyleRange>,
    pub entity_ranges: Vec<RawEntityRange>,
    pub data: DataMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntityRange {
    pub key: EntityKey,
    pub offset: usize,
    pub length: usize,
}

impl Document {
    pub fn to_raw(&self) -> RawDocument {
        let blocks = self
            .blocks()
            .map(|block| RawBlock {
                key: block.key,
                kind: block.kind.as_str().to_string(),
                text: block.text().to_string(),
                depth: block.depth,
                inline_style_ranges: block.inline_style_ranges(),
                entity_ranges: block
                    .entity_ranges()
                    .into_iter()
                    .map(|(range, key)| RawEntityRange {
                        key,
                        offset: range.start,
                        length: range.end - range.start,
                    })
                    .collect(),
                data: block.data.clone(),
            })
            .collect();
        let entity_map = self
            .entities()
            .iter()
            .map(|entity| (entity.key.to_string(), entity.clone()))
            .collect();
        RawDocument { blocks, entity_map }
    }
}
