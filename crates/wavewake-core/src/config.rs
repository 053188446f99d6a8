use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Get the local data directory for wavewake.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("wavewake");
    Ok(path)
}

/// Daemon configuration, read from `config.toml` in the data directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub sensor: SensorConfig,
    pub display: DisplayConfig,
    pub wakelock: WakelockConfig,
    pub pulse: PulseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// IIO device directory; discovered under `iio_root` when unset
    pub device: Option<PathBuf>,
    pub iio_root: PathBuf,
    pub max_range: f32,
    /// Raw intensity at or above which the object counts as near
    pub near_threshold: i64,
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device: None,
            iio_root: PathBuf::from("/sys/bus/iio/devices"),
            max_range: 5.0,
            near_threshold: 1,
            poll_interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Backlight directory; discovered under `backlight_root` when unset
    pub backlight: Option<PathBuf>,
    pub backlight_root: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backlight: None,
            backlight_root: PathBuf::from("/sys/class/backlight"),
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakelockConfig {
    pub name: String,
    pub sysfs_root: PathBuf,
}

impl Default for WakelockConfig {
    fn default() -> Self {
        Self {
            name: String::from("WavewakeWakeLock"),
            sysfs_root: PathBuf::from("/sys/power"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Program and arguments run on every doze pulse; empty for log-only
    pub command: Vec<String>,
}

impl DaemonConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Load `config.toml` from the data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unknown or the file is invalid
    pub fn load_default() -> Result<Self> {
        Self::load(&get_data_dir()?.join("config.toml"))
    }
}
