//! yt-dlp-backed platform client
//!
//! Metadata and stream URLs come from `yt-dlp --dump-single-json`; the chosen
//! stream is then fetched directly over HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::client::{ClientError, RemoteClient};
use super::models::{AudioStream, RemoteTrack};

/// Platform client driving a `yt-dlp` executable
#[derive(Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
    http_client: Client,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .user_agent(concat!("tunepress/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            binary: binary.into(),
            http_client,
        })
    }
}

#[async_trait]
impl RemoteClient for YtDlpClient {
    async fn lookup(&self, url: &str) -> Result<RemoteTrack, ClientError> {
        debug!("Looking up {} with {}", url, self.binary.display());

        let output = Command::new(&self.binary)
            .args([
                "--dump-single-json",
                "--no-playlist",
                "--skip-download",
                "--no-warnings",
            ])
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ClientError::Lookup(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .to_string();
            return Err(ClientError::Lookup(message));
        }

        let track = parse_video(&output.stdout)?;
        debug!(
            "Resolved {} ({} audio streams)",
            track.title,
            track.streams.len()
        );
        Ok(track)
    }

    async fn download(&self, stream: &AudioStream, dest: &Path) -> Result<u64, ClientError> {
        debug!("Downloading stream {} to {}", stream.format_id, dest.display());

        let mut request = self.http_client.get(&stream.url);
        for (name, value) in &stream.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?.error_for_status()?;

        let mut file = File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk: Bytes = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes", written);
        Ok(written)
    }
}

/// Subset of the yt-dlp info JSON used here
#[derive(Debug, Deserialize)]
struct YtDlpVideo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    description: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Option<Vec<YtDlpFormat>>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    url: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    ext: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    protocol: Option<String>,
    http_headers: Option<HashMap<String, String>>,
}

impl YtDlpFormat {
    /// Audio-only and fetchable with a single HTTP request
    fn is_plain_audio(&self) -> bool {
        let audio = self.acodec.as_deref().is_some_and(|c| c != "none");
        let no_video = self.vcodec.as_deref() == Some("none");
        let plain_http = self
            .protocol
            .as_deref()
            .is_none_or(|p| p == "https" || p == "http");
        audio && no_video && plain_http && self.url.is_some()
    }

    fn into_stream(self) -> Option<AudioStream> {
        Some(AudioStream {
            url: self.url?,
            format_id: self.format_id,
            bitrate_kbps: self.abr,
            extension: self.ext.unwrap_or_else(|| "audio".to_string()),
            byte_size: self.filesize.or(self.filesize_approx),
            http_headers: self.http_headers.unwrap_or_default(),
        })
    }
}

fn parse_video(json: &[u8]) -> Result<RemoteTrack, ClientError> {
    let video: YtDlpVideo = serde_json::from_slice(json)?;

    let streams = video
        .formats
        .unwrap_or_default()
        .into_iter()
        .filter(YtDlpFormat::is_plain_audio)
        .filter_map(YtDlpFormat::into_stream)
        .collect();

    Ok(RemoteTrack {
        title: video.title.unwrap_or_else(|| video.id.clone()),
        author: video
            .uploader
            .or(video.channel)
            .unwrap_or_else(|| "Unknown".to_string()),
        duration_seconds: video.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
        view_count: video.view_count.unwrap_or(0),
        description: video.description.unwrap_or_default(),
        thumbnail_url: video.thumbnail,
        video_id: video.id,
        streams,
    })
}
