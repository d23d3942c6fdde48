//! Configuration system for hush
//!
//! Loads configuration from TOML file at `~/.config/hush/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::screen::Gap;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keybindings: Vec<KeyBindingConfig>,
    pub window_manager: WindowManagerConfig,
    pub colors: WindowColors,
    pub menu: MenuConfig,
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };
        Self::load_from(&config_path)
    }

    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("hush");

        Ok(config_dir.join("config.toml"))
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

/// Window manager behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowManagerConfig {
    /// Border width in pixels
    pub border_width: i32,
    /// Distance within which a dragged window snaps to the screen edge (0 = off)
    pub snap_distance: i32,
    /// Space kept free at the screen edges
    pub gap: Gap,
    /// New windows join the active group
    pub sticky_groups: bool,
    /// Window names that are skipped when cycling
    pub ignore: Vec<String>,
    pub autogroup: Vec<AutogroupRule>,
}

impl Default for WindowManagerConfig {
    fn default() -> Self {
        Self {
            border_width: 1,
            snap_distance: 0,
            gap: Gap::default(),
            sticky_groups: false,
            ignore: Vec::new(),
            autogroup: Vec::new(),
        }
    }
}

/// Put windows of a given class (and optionally name) into a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutogroupRule {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub group: usize,
}

/// Colors (hex: 0xRRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowColors {
    /// Border of the active window
    pub active: u32,
    /// Border of every other window
    pub inactive: u32,
    /// Active border while grouping
    pub group: u32,
    /// Active border while ungrouping
    pub ungroup: u32,
    pub menu_foreground: u32,
    pub menu_background: u32,
}

impl Default for WindowColors {
    fn default() -> Self {
        Self {
            active: 0xcccccc,
            inactive: 0x666666,
            group: 0x0000ff,
            ungroup: 0xff0000,
            menu_foreground: 0x000000,
            menu_background: 0xffffff,
        }
    }
}

/// Menu appearance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// X core font name
    pub font: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            font: "fixed".to_string(),
        }
    }
}

/// A key binding overriding or extending the built-in table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingConfig {
    /// Modifier names: shift, control, alt/mod1, super/mod4
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Key name (single character, or Return, Tab, Up, ...)
    pub key: String,
    /// Action name (cycle, maximize, search, bigmoveleft, ...)
    pub action: String,
}
