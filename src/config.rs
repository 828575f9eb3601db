//! Configuration file handling for gbcam.
//!
//! Loads configuration from `<config_dir>/gameboy-camera/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::camera::CaptureSettings;
use crate::palette::PaletteMode;
use crate::strip::StripLayout;

/// Configuration file structure for gbcam.
/// Loaded from the user config directory (or custom path via --config).
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub strip: StripConfig,
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub filter: PaletteMode,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            filter: PaletteMode::default(),
            mirror: false,
            refresh_hz: default_refresh_hz(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct StripConfig {
    #[serde(default = "default_strip_width")]
    pub width: u32,
    #[serde(default = "default_slot_height")]
    pub slot_height: u32,
    #[serde(default = "default_spacing")]
    pub spacing: u32,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            width: default_strip_width(),
            slot_height: default_slot_height(),
            spacing: default_spacing(),
        }
    }
}

fn default_refresh_hz() -> u32 {
    60
}

fn default_strip_width() -> u32 {
    200
}

fn default_slot_height() -> u32 {
    150
}

fn default_spacing() -> u32 {
    10
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Directory holding the database and fallback files.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            mode: self.camera.filter,
            mirror: self.camera.mirror,
            refresh_hz: self.camera.refresh_hz,
        }
    }

    pub fn strip_layout(&self) -> StripLayout {
        StripLayout {
            width: self.strip.width,
            slot_height: self.strip.slot_height,
            spacing: self.strip.spacing,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("gameboy-camera")
        .join("config.toml")
}

/// Get the default data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| home_dir().join(".local/share"))
        .join("gameboy-camera")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Contents written by `gbcam config init`.
pub const DEFAULT_CONFIG: &str = r#"# gbcam configuration

[camera]
# Palette: none, 2bit, gameboy
filter = "2bit"
# Mirror horizontally (selfie mode)
mirror = false
# Frames processed per second
refresh_hz = 60

[storage]
# Where photos and strips are kept (default: user data directory)
# data_dir = "/path/to/gameboy-camera"

[strip]
# Strip width and per-photo slot height, in pixels
width = 200
slot_height = 150
# Gap between slots and around the edges
spacing = 10
"#;
