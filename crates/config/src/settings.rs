// Application settings
// Loaded from ~/.config/canvas-studio/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::APP_DIR;

pub const DEFAULT_FONT_CDN_BASE: &str = "https://cdn.jsdelivr.net/fontsource/fonts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Editor
    #[serde(rename = "editor.debounceMs")]
    pub debounce_ms: u64,

    // Canvas viewport
    #[serde(rename = "canvas.paddingPx")]
    pub padding_px: f64,

    #[serde(rename = "canvas.viewportWidth")]
    pub viewport_width: f64,

    #[serde(rename = "canvas.viewportHeight")]
    pub viewport_height: f64,

    // Script watchdog (0 = unbounded)
    #[serde(rename = "script.timeoutMs")]
    pub timeout_ms: u64,

    #[serde(rename = "script.instructionLimit")]
    pub instruction_limit: u64,

    // Fonts
    #[serde(rename = "fonts.enabled")]
    pub fonts_enabled: bool,

    #[serde(rename = "fonts.cdnBase")]
    pub font_cdn_base: String,

    // Storage
    #[serde(rename = "storage.path")]
    pub storage_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Editor
            debounce_ms: 800,
            // Canvas
            padding_px: 20.0,
            viewport_width: 1024.0,
            viewport_height: 768.0,
            // Script
            timeout_ms: 5_000,
            instruction_limit: 200_000_000,
            // Fonts
            fonts_enabled: true,
            font_cdn_base: DEFAULT_FONT_CDN_BASE.to_string(),
            // Storage
            storage_path: None,
        }
    }
}

const DEFAULT_SETTINGS_FILE: &str = r#"{
    // Quiet period after the last edit before the script runs
    "editor.debounceMs": 800,

    // Display container (logical pixels) and padding around the canvas
    "canvas.paddingPx": 20,
    "canvas.viewportWidth": 1024,
    "canvas.viewportHeight": 768,

    // Script watchdog, 0 disables a limit
    "script.timeoutMs": 5000,
    "script.instructionLimit": 200000000,

    // Web fonts declared in config.fonts
    "fonts.enabled": true,
    "fonts.cdnBase": "https://cdn.jsdelivr.net/fontsource/fonts",

    // Where the last successful script is kept (null = platform data dir)
    "storage.path": null
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("settings.json")
    }

    /// Load settings from the platform config dir, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file is created with the
    /// commented defaults; an unreadable one yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}. Using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to the platform config dir
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Storage file: the override, or `<data_dir>/canvas-studio/storage.json`
    pub fn storage_file(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("storage.json")
        })
    }

    /// Downloaded font faces
    pub fn font_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("fonts")
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

/// Write the commented default file
fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("Error creating config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, DEFAULT_SETTINGS_FILE) {
        log::warn!("Error writing default settings.json: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_parses_to_defaults() {
        assert_eq!(Settings::parse(DEFAULT_SETTINGS_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings = Settings::parse(
            r#"{
                // faster feedback
                "editor.debounceMs": 250,
                "script.timeoutMs": 0
            }"#,
        )
        .unwrap();
        assert_eq!(settings.debounce(), Duration::from_millis(250));
        assert_eq!(settings.timeout_ms, 0);
        assert_eq!(settings.padding_px, 20.0);
        assert!(settings.fonts_enabled);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            viewport_width: 640.0,
            storage_path: Some(dir.path().join("store.json")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.storage_file(), dir.path().join("store.json"));
    }
}
