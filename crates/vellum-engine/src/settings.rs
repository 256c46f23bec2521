use vellum_config::{Config, EditorConfig};

use crate::model::Schema;

/// Engine-side view of [`vellum_config::EditorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_listener_passes: usize,
    pub undo_depth: usize,
    pub snapshot_by_default: bool,
    pub schema: Schema,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for EngineSettings {
    fn from(editor: &EditorConfig) -> Self {
        Self {
            max_listener_passes: editor.max_listener_passes,
            undo_depth: editor.undo_depth,
            snapshot_by_default: editor.snapshot_by_default,
            schema: Schema::from(editor),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self::from(&config.editor)
    }
}
