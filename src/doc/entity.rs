use crate::core::{DataMap, EntityKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Link,
    Image,
    Upload,
    Custom(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Link => "LINK",
            EntityType::Image => "IMAGE",
            EntityType::Upload => "UPLOAD",
            EntityType::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "LINK" => EntityType::Link,
            "IMAGE" => EntityType::Image,
            "UPLOAD" => EntityType::Upload,
            other => EntityType::Custom(other.to_string()),
        }
    }

    pub fn default_mutability(&self) -> Mutability {
        match self {
            EntityType::Link => Mutability::Mutable,
            EntityType::Image | EntityType::Upload => Mutability::Immutable,
            EntityType::Custom(_) => Mutability::Mutable,
        }
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        EntityType::from_name(&name)
    }
}

impl From<EntityType> for String {
    fn from(kind: EntityType) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    Mutable,
    Immutable,
    Segmented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub mutability: Mutability,
    pub data: DataMap,
}

impl Entity {
    pub fn data_str(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(|value| value.as_str())
    }

    pub fn data_int(&self, name: &str) -> Option<i64> {
        self.data.get(name).and_then(|value| value.as_int())
    }
}

/// The entity side table. Keys are handed out in increasing order and never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMap {
    entries: BTreeMap<EntityKey, Arc<Entity>>,
    next_key: u64,
}

impl EntityMap {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_key: 1,
        }
    }

    pub fn create(&mut self, kind: EntityType, mutability: Mutability, data: DataMap) -> EntityKey {
        // `Default` starts at zero; keep zero unused either way.
        let key = EntityKey(self.next_key.max(1));
        self.next_key = key.0 + 1;
        self.entries.insert(
            key,
            Arc::new(Entity {
                key,
                kind,
                mutability,
                data,
            }),
        );
        key
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entries.get(&key).map(Arc::as_ref)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values().map(Arc::as_ref)
    }

    /// Shallow-merges `partial` into the entity's data. `false` if the key is unknown.
    pub(crate) fn merge_data(&mut self, key: EntityKey, partial: DataMap) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        let entity = Arc::make_mut(entry);
        entity.data.extend(partial);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_map;

    #[test]
    fn test_keys_are_monotonic() {
        let mut map = EntityMap::new();
        let a = map.create(EntityType::Link, Mutability::Mutable, DataMap::new());
        let b = map.create(EntityType::Image, Mutability::Immutable, DataMap::new());
        assert!(b > a);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_merge_data_is_shallow() {
        let mut map = EntityMap::new();
        let key = map.create(
            EntityType::Image,
            Mutability::Immutable,
            data_map([("src", "a.png"), ("alt", "cat")]),
        );
        assert!(map.merge_data(key, data_map([("src", "b.png")])));
        let entity = map.get(key).unwrap();
        assert_eq!(entity.data_str("src"), Some("b.png"));
        assert_eq!(entity.data_str("alt"), Some("cat"));
        assert!(!map.merge_data(EntityKey(99), DataMap::new()));
    }

    #[test]
    fn test_default_mutability() {
        assert_eq!(EntityType::Link.default_mutability(), Mutability::Mutable);
        assert_eq!(
            EntityType::Upload.default_mutability(),
            Mutability::Immutable
        );
    }
}
