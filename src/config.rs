//! Configuration file support.
//!
//! Settings are stored as pretty-printed JSON in the platform config
//! directory. Missing fields take their defaults, so older files keep
//! loading as preferences are added.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DRAG_THRESHOLD, DEFAULT_MAX_BITMAP_DIMENSION};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    /// Folder loads, deletions and config changes
    #[default]
    Info,
    /// Cache hits and misses, zoom and drag changes
    Debug,
    /// Everything, including per-frame timing
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn from_name(name: &str) -> Option<LogLevel> {
        LogLevel::all()
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(name))
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Keep decoded images in memory
    pub use_caching: bool,

    pub log_level: LogLevel,

    /// Pointer travel in pixels (per axis) before a press becomes a drag
    pub drag_threshold: f32,

    /// Largest bitmap edge the renderer accepts
    pub max_bitmap_dimension: u32,

    /// Last opened file or folder
    pub last_path: Option<PathBuf>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            use_caching: true,
            log_level: LogLevel::default(),
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            max_bitmap_dimension: DEFAULT_MAX_BITMAP_DIMENSION,
            last_path: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.sanitize();
        Ok(config)
    }

    /// Replace out-of-range values with their defaults.
    fn sanitize(&mut self) {
        let prefs = &mut self.preferences;
        if prefs.drag_threshold.is_nan() || prefs.drag_threshold < 0.0 {
            log::warn!("Ignoring invalid drag threshold {}", prefs.drag_threshold);
            prefs.drag_threshold = DEFAULT_DRAG_THRESHOLD;
        }
        if prefs.max_bitmap_dimension == 0 {
            log::warn!("Ignoring zero max bitmap dimension");
            prefs.max_bitmap_dimension = DEFAULT_MAX_BITMAP_DIMENSION;
        }
    }

    pub fn default_filename() -> &'static str {
        "config.json"
    }

    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("picture-browser").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("picture-browser")
                    .join(Self::default_filename())
            })
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load `path` (or the default path), falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };

        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            log::warn!("Failed to load config file {:?}: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
