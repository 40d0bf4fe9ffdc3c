use crate::plugin::{Pipeline, PluginKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_MAX_TAB_DEPTH: u8 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plugin {0:?} listed twice")]
    DuplicatePlugin(PluginKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub debounce_ms: u64,
    pub max_tab_depth: u8,
    pub plugins: Vec<PluginKind>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_tab_depth: DEFAULT_MAX_TAB_DEPTH,
            plugins: PluginKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, kind) in self.plugins.iter().enumerate() {
            if self.plugins[..index].contains(kind) {
                return Err(ConfigError::DuplicatePlugin(*kind));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_kinds(&self.plugins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EditorConfig::from_json(r#"{"debounceMs": 250}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.max_tab_depth, 4);
        assert_eq!(config.plugins.len(), 5);
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_rejects_duplicate_plugins() {
        let err = EditorConfig::from_json(r#"{"plugins": ["core", "link", "core"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePlugin(PluginKind::Core)));
    }

    #[test]
    fn test_rejects_unknown_plugin() {
        assert!(matches!(
            EditorConfig::from_json(r#"{"plugins": ["emoji"]}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{"maxTabDepth": 2}"#).unwrap();
        assert_eq!(EditorConfig::from_path(&path).unwrap().max_tab_depth, 2);
        assert!(matches!(
            EditorConfig::from_path(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
