use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub paper: PaperConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(?path, "loaded configuration");
        Ok(config)
    }
}

/// Options for the LilyPond text produced by the notation assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub version: String,
    pub language: String,
    /// Drop a dynamic that repeats the previous one within a voice.
    pub suppress_repeated_dynamics: bool,
    pub midi_instrument: String,
    /// Insert `\break` after every this many complete bars.
    pub bars_per_line: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            version: "2.24.3".to_string(),
            language: "english".to_string(),
            suppress_repeated_dynamics: false,
            midi_instrument: "acoustic grand".to_string(),
            bars_per_line: None,
        }
    }
}

/// Page setup for full scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub size: PaperSize,
    pub margins: Margins,
    pub staff_size: Option<f32>,
    pub indent: Option<f32>,
    pub short_indent: Option<f32>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            size: PaperSize::default(),
            margins: Margins::default(),
            staff_size: None,
            indent: None,
            short_indent: None,
        }
    }
}

/// A LilyPond paper name such as `"a4landscape"`, or width and height in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaperSize {
    Named(String),
    Custom([f32; 2]),
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::Named("a4landscape".to_string())
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 10.0,
            bottom: 10.0,
            left: 10.0,
            right: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{
                "render": { "suppress_repeated_dynamics": true, "bars_per_line": 4 },
                "paper": { "size": [210, 297] }
            }"#,
        )
        .unwrap();

        assert!(config.render.suppress_repeated_dynamics);
        assert_eq!(config.render.bars_per_line, Some(4));
        assert_eq!(config.render.version, "2.24.3");
        assert_eq!(config.paper.size, PaperSize::Custom([210.0, 297.0]));
        assert_eq!(config.paper.margins, Margins::default());
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(AppConfig::from_json_str("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AppConfig::from_json_str("{ render: }").is_err());
    }
}
