//! Application settings persistence
//!
//! Handles saving and loading user preferences.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::database::DEFAULT_QUOTA_BYTES;

/// Shallowest and deepest directory recursion a scan may be configured with
pub const MIN_SCAN_DEPTH: usize = 3;
pub const MAX_SCAN_DEPTH: usize = 5;

/// Which store backend holds the library
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// SQLite records referencing files on disk
    #[default]
    Records,
    /// Quota-limited JSON playlist with embedded bytes
    Serialized,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Records => write!(f, "records"),
            StorageBackend::Serialized => write!(f, "serialized"),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Overrides the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Capacity of the serialized store in bytes
    #[serde(default = "default_quota")]
    pub serialized_quota_bytes: u64,
}

/// Device scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Directory levels below the scan root that are still visited
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// How often the launch scan re-prompts after a dismissed picker
    #[serde(default = "default_auto_scan_attempts")]
    pub auto_scan_attempts: u32,
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Progress refresh period
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_quota() -> u64 {
    DEFAULT_QUOTA_BYTES
}

fn default_max_depth() -> usize {
    MIN_SCAN_DEPTH
}

fn default_auto_scan_attempts() -> u32 {
    3
}

fn default_tick_interval() -> u64 {
    250
}

fn default_volume() -> f32 {
    1.0
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Records,
            data_dir: None,
            serialized_quota_bytes: default_quota(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            auto_scan_attempts: default_auto_scan_attempts(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            volume: default_volume(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mediadeck", "Mediadeck")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .map(|path| Self::load_or_default(&path))
            .unwrap_or_default()
    }

    /// Load from `path`, falling back to defaults when missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))?;
        Ok(settings.normalized())
    }

    /// Clamp every field into its accepted range
    pub fn normalized(mut self) -> Self {
        self.scan.max_depth = self.scan.max_depth.clamp(MIN_SCAN_DEPTH, MAX_SCAN_DEPTH);
        self.playback.volume = if self.playback.volume.is_finite() {
            self.playback.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        self.playback.tick_interval_ms = self.playback.tick_interval_ms.max(10);
        self
    }
}

/// Errors that can occur with settings
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
