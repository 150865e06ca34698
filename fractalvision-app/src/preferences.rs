use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use fractalvision_core::{Viewport, ViewHistory};
use fractalvision_render::{ExportFormat, RenderSettings};

// ---------------------------------------------------------------------------
// Application preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Engine, palette and quality used when no flag overrides them.
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Where exports without an explicit path go. Current directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Canonical form of the last exported view.
    #[serde(default)]
    pub last_view: Option<String>,
}

fn default_width() -> u32 {
    Viewport::DEFAULT_WIDTH
}
fn default_height() -> u32 {
    Viewport::DEFAULT_HEIGHT
}
fn default_history_depth() -> usize {
    ViewHistory::DEFAULT_MAX_DEPTH
}
fn default_jpeg_quality() -> u8 {
    ExportFormat::DEFAULT_JPEG_QUALITY
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            width: default_width(),
            height: default_height(),
            history_depth: default_history_depth(),
            jpeg_quality: default_jpeg_quality(),
            output_dir: None,
            last_view: None,
        }
    }
}

impl Preferences {
    /// Load preferences from the OS config directory, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Preferences>(&json) {
                Ok(prefs) => {
                    info!("Loaded preferences from {}", path.display());
                    return prefs;
                }
                Err(e) => error!("Failed to parse preferences: {e}"),
            },
            Err(e) => error!("Failed to read preferences file: {e}"),
        }
        Self::default()
    }

    /// Persist preferences to the OS config directory.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences to {}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }
}

pub fn config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "FractalVision")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("preferences.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalvision_core::{EscapeTimeEngine, FractalKind, FractalParams};
    use fractalvision_render::{ColorScheme, Palette, RenderQuality};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("fractalvision_prefs_{name}_{}", std::process::id()))
            .join("preferences.json")
    }

    #[test]
    fn missing_file_gives_defaults() {
        let prefs = Preferences::load_from(Path::new("/definitely/not/here/preferences.json"));
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.width, 800);
        assert_eq!(prefs.history_depth, 50);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let path = scratch("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Preferences::load_from(&path), Preferences::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = scratch("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "width": 1024, "render": { "palette": { "scheme": "fire" } } }"#).unwrap();

        let prefs = Preferences::load_from(&path);
        assert_eq!(prefs.width, 1024);
        assert_eq!(prefs.height, 600);
        assert_eq!(prefs.render.palette, Palette::from_scheme(ColorScheme::Fire));
        assert_eq!(prefs.render.engine, EscapeTimeEngine::default());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn save_then_load() {
        let path = scratch("roundtrip");
        let prefs = Preferences {
            render: RenderSettings {
                engine: EscapeTimeEngine::new(FractalKind::Julia, FractalParams::new(500, 4.0).unwrap()),
                palette: Palette::custom([10, 20, 30], [200, 100, 0], 128).unwrap(),
                quality: RenderQuality::Preview,
            },
            jpeg_quality: 75,
            last_view: Some("-0.5,0,2,640,480".into()),
            ..Preferences::default()
        };
        prefs.save_to(&path);
        assert_eq!(Preferences::load_from(&path), prefs);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_engine_settings_are_rejected_whole() {
        let path = scratch("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{ "render": { "engine": { "params": { "max_iterations": 0, "escape_radius": 2.0 } } } }"#,
        )
        .unwrap();
        assert_eq!(Preferences::load_from(&path), Preferences::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
