//! Audio decode/encode engine
//!
//! The actual codec work is delegated to an external program. Everything in
//! the crate talks to it through [`AudioEngine`] so the batch driver and the
//! fetcher can be exercised without one installed.

pub mod ffmpeg;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

pub use ffmpeg::FfmpegEngine;

/// Fixed MP3 output quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    /// Target bitrate in kbit/s
    pub bitrate_kbps: u32,
    /// LAME VBR quality hint (0 best .. 9 worst)
    pub vbr_quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            bitrate_kbps: 192,
            vbr_quality: 2,
        }
    }
}

/// Failure reported by an [`AudioEngine`]
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input could not be decoded (corrupt or unrecognized format)
    #[error("unsupported or corrupt input: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other encoder failure
    #[error("encoder failed: {0}")]
    Failed(String),
}

impl EngineError {
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, EngineError::UnsupportedFormat(_))
    }
}

/// Decodes an audio file and re-encodes it as MP3
///
/// Implementations must only make `output` appear once the encode has fully
/// succeeded; a failed call leaves no file at `output`.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &EncodeSettings,
    ) -> Result<(), EngineError>;
}
