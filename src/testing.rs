//! In-process stand-ins for the external engine and platform, for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::engine::{AudioEngine, EncodeSettings, EngineError};
use crate::remote::{AudioStream, ClientError, RemoteClient, RemoteTrack};

/// "Encodes" by copying bytes; inputs starting with `corrupt` are undecodable
#[derive(Debug, Default)]
pub(crate) struct CopyEngine {
    fail: bool,
    calls: AtomicUsize,
}

impl CopyEngine {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioEngine for CopyEngine {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _settings: &EncodeSettings,
    ) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let data = tokio::fs::read(input).await?;
        if self.fail {
            return Err(EngineError::Failed("simulated encoder failure".to_string()));
        }
        if data.starts_with(b"corrupt") {
            return Err(EngineError::UnsupportedFormat(
                "Invalid data found when processing input".to_string(),
            ));
        }
        tokio::fs::write(output, data).await?;
        Ok(())
    }
}

/// Platform with a fixed catalogue keyed by URL
#[derive(Debug, Default)]
pub(crate) struct FakeClient {
    tracks: HashMap<String, RemoteTrack>,
    lookup_delay: Option<Duration>,
    download_delay: Option<Duration>,
    fail_downloads: bool,
    lookups: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_track(mut self, url: &str, track: RemoteTrack) -> Self {
        self.tracks.insert(url.to_string(), track);
        self
    }

    pub(crate) fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub(crate) fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    pub(crate) fn with_failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub(crate) fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for FakeClient {
    async fn lookup(&self, url: &str) -> Result<RemoteTrack, ClientError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.tracks
            .get(url)
            .cloned()
            .ok_or_else(|| ClientError::Lookup("ERROR: Video unavailable".to_string()))
    }

    async fn download(&self, stream: &AudioStream, dest: &Path) -> Result<u64, ClientError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_downloads {
            return Err(ClientError::Lookup("HTTP 403 Forbidden".to_string()));
        }
        let data = format!("audio:{}", stream.format_id).into_bytes();
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }
}

pub(crate) fn sample_track(video_id: &str, title: &str) -> RemoteTrack {
    RemoteTrack {
        streams: vec![
            AudioStream {
                format_id: "140".to_string(),
                url: format!("https://media.example/{}/140", video_id),
                bitrate_kbps: Some(129.5),
                extension: "m4a".to_string(),
                byte_size: Some(3_400_000),
                http_headers: HashMap::new(),
            },
            AudioStream {
                format_id: "251".to_string(),
                url: format!("https://media.example/{}/251", video_id),
                bitrate_kbps: Some(160.0),
                extension: "webm".to_string(),
                byte_size: Some(3_900_000),
                http_headers: HashMap::new(),
            },
        ],
        ..track_without_streams(video_id, title)
    }
}

pub(crate) fn track_without_streams(video_id: &str, title: &str) -> RemoteTrack {
    RemoteTrack {
        video_id: video_id.to_string(),
        title: title.to_string(),
        author: "Test Channel".to_string(),
        duration_seconds: 185,
        view_count: 42,
        description: "A test upload".to_string(),
        thumbnail_url: None,
        streams: Vec::new(),
    }
}
