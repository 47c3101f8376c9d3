//! Settings persistence
//!
//! Stores tool paths, encode quality and timeouts in
//! ~/.config/tunepress/config.json. A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::engine::EncodeSettings;

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ffmpeg executable (name on PATH or absolute path)
    pub ffmpeg_path: PathBuf,
    /// yt-dlp executable (name on PATH or absolute path)
    pub ytdlp_path: PathBuf,
    /// Target MP3 bitrate in kbit/s
    pub bitrate_kbps: u32,
    /// LAME VBR quality hint (0 best .. 9 worst)
    pub vbr_quality: u8,
    /// Timeout for a metadata lookup, in seconds
    pub resolve_timeout_secs: u64,
    /// Timeout for a whole fetch (download + encode), in seconds
    pub fetch_timeout_secs: u64,
    /// Folder used by `download` when `--dest` is not given
    pub download_folder: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            bitrate_kbps: 192,
            vbr_quality: 2,
            resolve_timeout_secs: 30,
            fetch_timeout_secs: 600,
            download_folder: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from a specific file, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let settings: Self =
            serde_json::from_str(&contents).context("Failed to parse settings")?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Get the settings file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("tunepress").join("config.json"))
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            bitrate_kbps: self.bitrate_kbps,
            vbr_quality: self.vbr_quality,
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
