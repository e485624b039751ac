use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::render::mode::RenderMode;

const SETTINGS_FILE: &str = "viewer.json";

/// Persisted viewer settings. Everything here survives restarts; per-entity
/// state (sequence, body value, controllers) does not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    pub background_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub floor_length: f32,
    pub texture_repeat_length: f32,
    pub render_mode: RenderMode,
    pub backface_culling: bool,
    pub wireframe_overlay: bool,
    pub show_ground: bool,
    pub mirror_on_ground: bool,
    pub fov: f32,
    pub top_color: i32,
    pub bottom_color: i32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            background_color: [0.25, 0.25, 0.25],
            ground_color: [0.85, 0.85, 0.69],
            floor_length: 100.0,
            texture_repeat_length: 100.0,
            render_mode: RenderMode::TextureShaded,
            backface_culling: true,
            wireframe_overlay: false,
            show_ground: false,
            mirror_on_ground: false,
            fov: 65.0,
            top_color: 0,
            bottom_color: 0,
        }
    }
}

impl ViewerSettings {
    /// Loads settings from the default settings file.
    /// Returns default settings if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(SETTINGS_FILE)
    }

    /// Loads settings from a specified path.
    /// Returns default settings if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to the default settings file.
    pub fn save(&self) -> Result<()> {
        self.save_to(SETTINGS_FILE)
    }

    /// Saves settings to a specified path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.floor_length, 100.0);
        assert_eq!(settings.render_mode, RenderMode::TextureShaded);
        assert!(settings.backface_culling);
        assert!(!settings.show_ground);
        assert!(!settings.mirror_on_ground);
        assert_eq!(settings.fov, 65.0);
        assert_eq!(settings.top_color, 0);
    }

    #[test]
    fn test_json_serialization() {
        let settings = ViewerSettings {
            render_mode: RenderMode::Wireframe,
            show_ground: true,
            mirror_on_ground: true,
            top_color: 120,
            bottom_color: 200,
            ..Default::default()
        };

        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: ViewerSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_file_io() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_viewer.json");

        let settings = ViewerSettings {
            floor_length: 200.0,
            fov: 90.0,
            ..Default::default()
        };

        settings.save_to(&file_path).unwrap();
        let loaded = ViewerSettings::load_from(&file_path).unwrap();

        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nonexistent.json");

        let settings = ViewerSettings::load_from(&file_path).unwrap();
        assert_eq!(settings, ViewerSettings::default());
    }

    #[test]
    fn test_unknown_fields_fall_back_to_defaults() {
        let settings: ViewerSettings = serde_json::from_str(r#"{"fov": 75.0}"#).unwrap();
        assert_eq!(settings.fov, 75.0);
        assert!(settings.backface_culling);
    }
}
