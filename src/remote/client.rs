//! Remote platform client contract

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::models::{AudioStream, RemoteTrack};

/// Failure talking to the platform
#[derive(Debug, Error)]
pub enum ClientError {
    /// The platform (or its extractor) refused or failed the lookup
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("failed to parse platform response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of track metadata and audio streams
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Look up metadata and available audio-only streams for a track URL
    async fn lookup(&self, url: &str) -> Result<RemoteTrack, ClientError>;

    /// Download a stream to `dest`, returning the number of bytes written
    async fn download(&self, stream: &AudioStream, dest: &Path) -> Result<u64, ClientError>;
}
