use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Host-level configuration for an embedded vellum engine.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// [editor]
/// undo_depth = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Ceiling on step-listener passes before a commit fails.
    pub max_listener_passes: usize,
    /// Number of checkpoint states kept reachable for undo.
    pub undo_depth: usize,
    /// Whether new transactions link their result back for undo.
    pub snapshot_by_default: bool,
    /// Element kinds that are not block-level.
    pub inline_kinds: Vec<String>,
    /// Element kinds with no addressable content.
    pub void_kinds: Vec<String>,
}

pub const DEFAULT_INLINE_KINDS: &[&str] = &[
    "span", "a", "strong", "em", "b", "i", "u", "s", "code", "sub", "sup", "mark", "label", "abbr",
];

pub const DEFAULT_VOID_KINDS: &[&str] = &["br", "img", "hr", "input"];

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_listener_passes: 64,
            undo_depth: 100,
            snapshot_by_default: true,
            inline_kinds: DEFAULT_INLINE_KINDS.iter().map(|s| s.to_string()).collect(),
            void_kinds: DEFAULT_VOID_KINDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/vellum");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/vellum/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.editor.max_listener_passes, 64);
        assert_eq!(config.editor.undo_depth, 100);
        assert!(config.editor.snapshot_by_default);
        assert!(config.editor.inline_kinds.contains(&"strong".to_string()));
        assert_eq!(config.editor.void_kinds, vec!["br", "img", "hr", "input"]);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_editor_table() {
        let config_content = r#"
[editor]
undo_depth = 5
void_kinds = ["br", "widget"]
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.editor.undo_depth, 5);
        assert_eq!(config.editor.void_kinds, vec!["br", "widget"]);
        // untouched keys keep their defaults
        assert_eq!(config.editor.max_listener_passes, 64);
        assert!(config.editor.snapshot_by_default);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut original = Config::default();
        original.editor.snapshot_by_default = false;
        original.editor.inline_kinds = vec!["span".to_string()];

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[editor]\nundo_depth = \"lots\"\n").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.editor.max_listener_passes = 8;

        test_config.save_to_path(&config_file).unwrap();
        assert!(config_file.exists(), "Config file should exist");

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
