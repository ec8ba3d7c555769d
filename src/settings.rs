//! Application settings management
//!
//! Device selection, mapping file location and timing knobs, stored as TOML
//! in the user's config directory. Every field has a default so a missing or
//! partial file is fine.

use crate::poller::PollConfig;
use crate::protocol::{CONTOUR_VENDOR_ID, READ_BUFFER_SIZE, SHUTTLEPRO_V2_PID};
use crate::shuttle::RepeatTiming;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Mapping file; defaults to `mappings.toml` next to the settings file
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,

    /// How often the mapping file is checked for changes
    #[serde(default = "default_mapping_check_interval_ms")]
    pub mapping_check_interval_ms: u64,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub jog: JogSettings,

    #[serde(default)]
    pub shuttle: ShuttleSettings,
}

fn default_mapping_check_interval_ms() -> u64 {
    250
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// Sleep between device reads
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_report_size")]
    pub report_size: usize,
}

fn default_vendor_id() -> u16 {
    CONTOUR_VENDOR_ID
}

fn default_product_id() -> u16 {
    SHUTTLEPRO_V2_PID
}

fn default_poll_interval_ms() -> u64 {
    5
}

fn default_report_size() -> usize {
    READ_BUFFER_SIZE
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            poll_interval_ms: default_poll_interval_ms(),
            report_size: default_report_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JogSettings {
    /// Minimum time between two jog steps
    #[serde(default = "default_jog_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_jog_interval_ms() -> u64 {
    10
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: default_jog_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuttleSettings {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    /// Interval reduction per step of ring displacement
    #[serde(default = "default_step_reduction_ms")]
    pub step_reduction_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

fn default_base_interval_ms() -> u64 {
    250
}

fn default_step_reduction_ms() -> u64 {
    30
}

fn default_min_interval_ms() -> u64 {
    10
}

fn default_idle_poll_ms() -> u64 {
    50
}

impl Default for ShuttleSettings {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            step_reduction_ms: default_step_reduction_ms(),
            min_interval_ms: default_min_interval_ms(),
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            mapping_path: None,
            mapping_check_interval_ms: default_mapping_check_interval_ms(),
            device: DeviceSettings::default(),
            jog: JogSettings::default(),
            shuttle: ShuttleSettings::default(),
        }
    }
}

/// `~/.config/shuttlelinux`
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not find config directory")?
        .join("shuttlelinux"))
}

impl AppSettings {
    /// Default settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("settings.toml"))
    }

    /// Load settings from file (or defaults if it doesn't exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {:?}", path))?;
            let settings: AppSettings = toml::from_str(&content)
                .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            info!("No settings file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save settings to file, creating the directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Mapping file to watch. Relative paths are taken relative to `base`
    /// (the settings file's directory).
    pub fn resolve_mapping_path(&self, base: &Path) -> PathBuf {
        match &self.mapping_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => base.join(p),
            None => base.join("mappings.toml"),
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.device.poll_interval_ms),
            report_size: self.device.report_size,
            mapping_check_interval: Duration::from_millis(self.mapping_check_interval_ms),
        }
    }

    pub fn jog_interval(&self) -> Duration {
        Duration::from_millis(self.jog.min_interval_ms)
    }

    pub fn repeat_timing(&self) -> RepeatTiming {
        RepeatTiming {
            base_interval: Duration::from_millis(self.shuttle.base_interval_ms),
            step_reduction: Duration::from_millis(self.shuttle.step_reduction_ms),
            min_interval: Duration::from_millis(self.shuttle.min_interval_ms),
            // zero would spin the repeater
            idle_poll: Duration::from_millis(self.shuttle.idle_poll_ms.max(1)),
        }
    }
}
