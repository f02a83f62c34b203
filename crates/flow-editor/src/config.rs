//! Editor configuration with a JSON overlay file.
//!
//! Defaults cover every field; a config file only needs the keys it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Horizontal stagger applied per paste.
    pub offset_x: f32,
    /// Vertical stagger applied per paste.
    pub offset_y: f32,
    /// Largest selection `copy` accepts.
    pub max_nodes: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            offset_x: 30.0,
            offset_y: 30.0,
            max_nodes: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Maximum undo depth. The oldest entry is evicted past this.
    pub max_history: usize,
    /// Gap kept between a container edge and a child dropped into it.
    pub embed_padding: f32,
    pub clipboard: ClipboardConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            embed_padding: 10.0,
            clipboard: ClipboardConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClipboardConfigFile {
    offset_x: Option<f32>,
    offset_y: Option<f32>,
    max_nodes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditorConfigFile {
    max_history: Option<usize>,
    embed_padding: Option<f32>,
    clipboard: Option<ClipboardConfigFile>,
}

impl EditorConfig {
    /// Overlay the keys present in `text` on top of the defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let parsed: EditorConfigFile = serde_json::from_str(text)?;
        let mut config = Self::default();

        if let Some(v) = parsed.max_history {
            config.max_history = v;
        }
        if let Some(v) = parsed.embed_padding {
            config.embed_padding = v;
        }
        if let Some(clip) = parsed.clipboard {
            if let Some(v) = clip.offset_x {
                config.clipboard.offset_x = v;
            }
            if let Some(v) = clip.offset_y {
                config.clipboard.offset_y = v;
            }
            if let Some(v) = clip.max_nodes {
                config.clipboard.max_nodes = v;
            }
        }
        Ok(config)
    }
}

/// Load configuration from `path`, or return the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config = EditorConfig::from_json_str(&contents)?;
    log::debug!("loaded editor config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_overlay_keeps_other_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "maxHistory": 3, "clipboard": { "offsetX": 12 } }"#).unwrap();
        assert_eq!(config.max_history, 3);
        assert_eq!(config.clipboard.offset_x, 12.0);
        assert_eq!(config.clipboard.offset_y, 30.0);
        assert_eq!(config.clipboard.max_nodes, 50);
        assert_eq!(config.embed_padding, 10.0);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            EditorConfig::from_json_str("{ maxHistory: }"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_config(Some(Path::new("/nonexistent/flow-editor.json")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
