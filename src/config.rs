//! Configuration for the Area window controller
//!
//! Loads configuration from TOML file at `~/.config/area/window.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::wm::decorations::ButtonKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decorations: WindowDecorationConfig,
    pub colors: WindowColors,
    pub behavior: WindowBehaviorConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("window.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Frame decoration geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDecorationConfig {
    /// Titlebar height in pixels
    pub title_height: u32,
    /// Handle (bottom bar) height in pixels
    pub handle_height: u32,
    /// Border width in pixels
    pub border_width: u32,
    /// Spacing between titlebar elements
    pub bevel_width: u32,
    /// Width of each resize grip
    pub grip_width: u32,
    /// Horizontal advance of one label character
    pub font_advance: u32,
    /// Buttons placed at each end of the titlebar
    pub button_layout: ButtonLayout,
}

impl Default for WindowDecorationConfig {
    fn default() -> Self {
        Self {
            title_height: 20,
            handle_height: 6,
            border_width: 1,
            bevel_width: 2,
            grip_width: 20,
            font_advance: 7,
            button_layout: ButtonLayout::default(),
        }
    }
}

/// Titlebar button placement, outermost button first on each side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonLayout {
    pub left: Vec<ButtonKind>,
    pub right: Vec<ButtonKind>,
}

impl Default for ButtonLayout {
    fn default() -> Self {
        Self {
            left: vec![ButtonKind::Iconify],
            right: vec![ButtonKind::Close, ButtonKind::Maximize],
        }
    }
}

/// Decoration colors (hex: 0xRRGGBB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowColors {
    pub focused_title: u32,
    pub unfocused_title: u32,
    pub focused_label: u32,
    pub unfocused_label: u32,
    pub focused_text: u32,
    pub unfocused_text: u32,
    pub focused_button: u32,
    pub unfocused_button: u32,
    pub pressed_button: u32,
    pub focused_handle: u32,
    pub unfocused_handle: u32,
    pub focused_grip: u32,
    pub unfocused_grip: u32,
    pub focused_border: u32,
    pub unfocused_border: u32,
}

impl Default for WindowColors {
    fn default() -> Self {
        // Nord
        Self {
            focused_title: 0x3b4252,
            unfocused_title: 0x2e3440,
            focused_label: 0x434c5e,
            unfocused_label: 0x2e3440,
            focused_text: 0xeceff4,
            unfocused_text: 0x7b88a1,
            focused_button: 0x4c566a,
            unfocused_button: 0x3b4252,
            pressed_button: 0x5e81ac,
            focused_handle: 0x3b4252,
            unfocused_handle: 0x2e3440,
            focused_grip: 0x5e81ac,
            unfocused_grip: 0x434c5e,
            focused_border: 0x5e81ac,
            unfocused_border: 0x2e3440,
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowBehaviorConfig {
    /// Maximum delay between two titlebar clicks that shade the window
    pub double_click_interval_ms: u64,
    /// Move the frame while dragging instead of only on release
    pub opaque_move: bool,
    /// Give focus to windows when they are mapped or deiconified
    pub focus_new_windows: bool,
    /// Raise window when clicked
    pub raise_on_focus: bool,
}

impl WindowBehaviorConfig {
    pub fn double_click_interval(&self) -> Duration {
        Duration::from_millis(self.double_click_interval_ms)
    }
}

impl Default for WindowBehaviorConfig {
    fn default() -> Self {
        Self {
            double_click_interval_ms: 250,
            opaque_move: true,
            focus_new_windows: true,
            raise_on_focus: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[decorations]\ntitle_height = 24\n\n[behavior]\ndouble_click_interval_ms = 400\n"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.decorations.title_height, 24);
        assert_eq!(config.decorations.border_width, 1);
        assert_eq!(config.behavior.double_click_interval(), Duration::from_millis(400));
        assert!(config.behavior.opaque_move);
    }

    #[test]
    fn test_button_layout_from_toml() {
        let config: Config = toml::from_str(
            "[decorations.button_layout]\nleft = []\nright = [\"iconify\", \"maximize\", \"close\"]\n",
        )
        .unwrap();
        assert!(config.decorations.button_layout.left.is_empty());
        assert_eq!(
            config.decorations.button_layout.right,
            vec![ButtonKind::Iconify, ButtonKind::Maximize, ButtonKind::Close]
        );
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_garbage_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "decorations = 5").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
