//! ffmpeg-backed audio engine

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{AudioEngine, EncodeSettings, EngineError};

/// ffmpeg stderr fragments that mean the input itself is unusable
const UNSUPPORTED_MARKERS: &[&str] = &[
    "invalid data found when processing input",
    "could not find codec parameters",
    "does not contain any stream",
    "unknown format",
    "moov atom not found",
    "end of file",
];

/// Transcodes with an `ffmpeg` executable using libmp3lame
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the ffmpeg argument list for one conversion
    fn build_args(input: &Path, partial: &Path, settings: &EncodeSettings) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-codec:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            format!("{}k", settings.bitrate_kbps),
            "-q:a".to_string(),
            settings.vbr_quality.to_string(),
            "-f".to_string(),
            "mp3".to_string(),
            partial.to_string_lossy().to_string(),
        ]
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl AudioEngine for FfmpegEngine {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &EncodeSettings,
    ) -> Result<(), EngineError> {
        // Surfaces a missing or unreadable source as a plain I/O error
        fs::metadata(input).await?;

        let partial = partial_path(output);
        let _cleanup = PartialFile(partial.clone());
        let args = Self::build_args(input, &partial, settings);
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                EngineError::Failed(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(classify_failure(&stderr));
        }

        fs::rename(&partial, output).await?;

        debug!("Encoded {} -> {}", input.display(), output.display());
        Ok(())
    }
}

/// Hidden sibling file ffmpeg writes into before the final rename
pub(crate) fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.mp3".to_string());
    output.with_file_name(format!(".{}.part", name))
}

/// Deletes the partial file when dropped, which also covers a cancelled
/// encode. After a successful rename there is nothing left to delete.
struct PartialFile(PathBuf);

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove partial output {}: {}", self.0.display(), e);
        }
    }
}

/// Map ffmpeg stderr to an engine error
fn classify_failure(stderr: &str) -> EngineError {
    let lowered = stderr.to_lowercase();
    let detail = last_line(stderr);

    if UNSUPPORTED_MARKERS.iter().any(|m| lowered.contains(m)) {
        EngineError::UnsupportedFormat(detail)
    } else {
        EngineError::Failed(detail)
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("ffmpeg exited with an error")
        .to_string()
}
