//! Structural view of a document, for comparing documents that were built
//! independently and so do not share block or entity keys.

use beditor::{BlockType, DataMap, Document, EntityType, StyleSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockShape {
    pub kind: BlockType,
    pub depth: u8,
    pub text: String,
    pub chars: Vec<(StyleSet, Option<(EntityType, DataMap)>)>,
    pub data: DataMap,
}

/// Depth only counts for list items and data only for quotes; the
/// `active` flag is editor state, not content.
pub fn shape(doc: &Document) -> Vec<BlockShape> {
    doc.blocks()
        .map(|block| {
            let chars = block
                .chars()
                .iter()
                .map(|meta| {
                    let entity = meta
                        .entity
                        .and_then(|key| doc.entity(key))
                        .map(|entity| (entity.kind.clone(), entity.data.clone()));
                    (meta.style.clone(), entity)
                })
                .collect();
            let mut data = if block.is_quote() {
                block.data.clone()
            } else {
                DataMap::new()
            };
            data.remove("active");
            BlockShape {
                kind: block.kind.clone(),
                depth: if block.kind.is_list() { block.depth } else { 0 },
                text: block.text().to_string(),
                chars,
                data,
            }
        })
        .collect()
}
