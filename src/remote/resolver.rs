//! Metadata lookup with validation and a timeout

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::client::{ClientError, RemoteClient};
use super::link::validate_url;
use super::models::{RemoteTrack, TrackInfo};

/// Failure resolving track metadata
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("not a valid track URL: {0}")]
    InvalidUrl(String),

    #[error("lookup timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Platform(#[from] ClientError),
}

/// Resolves track URLs to metadata through a [`RemoteClient`]
#[derive(Clone)]
pub struct Resolver {
    client: Arc<dyn RemoteClient>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(client: Arc<dyn RemoteClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// Full lookup including available audio streams
    pub async fn lookup(&self, url: &str) -> Result<RemoteTrack, ResolveError> {
        let url = url.trim();
        if !validate_url(url) {
            return Err(ResolveError::InvalidUrl(url.to_string()));
        }

        match tokio::time::timeout(self.timeout, self.client.lookup(url)).await {
            Ok(Ok(track)) => {
                debug!("Resolved {} -> {}", url, track.title);
                Ok(track)
            }
            Ok(Err(e)) => {
                warn!("Lookup failed for {}: {}", url, e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Lookup timed out for {}", url);
                Err(ResolveError::Timeout(self.timeout))
            }
        }
    }

    /// Metadata preview for a track URL
    pub async fn resolve(&self, url: &str) -> Result<TrackInfo, ResolveError> {
        self.lookup(url).await.map(|track| track.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_track, FakeClient};

    const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_resolve_success() {
        let client = FakeClient::new().with_track(URL, sample_track("dQw4w9WgXcQ", "Song"));
        let resolver = Resolver::new(Arc::new(client), Duration::from_secs(5));

        let info = resolver.resolve(URL).await.unwrap();
        assert_eq!(info.title, "Song");
        assert_eq!(info.video_id, "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_invalid_url_skips_network() {
        let client = Arc::new(FakeClient::new());
        let resolver = Resolver::new(client.clone(), Duration::from_secs(5));

        let err = resolver.resolve("https://example.com/x").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUrl(_)));
        assert_eq!(client.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_platform_error_is_message() {
        let resolver = Resolver::new(Arc::new(FakeClient::new()), Duration::from_secs(5));

        let err = resolver.resolve(URL).await.unwrap_err();
        assert!(matches!(err, ResolveError::Platform(_)));
        assert!(err.to_string().contains("Video unavailable"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let client = FakeClient::new()
            .with_track(URL, sample_track("dQw4w9WgXcQ", "Slow"))
            .with_lookup_delay(Duration::from_millis(200));
        let resolver = Resolver::new(Arc::new(client), Duration::from_millis(20));

        let err = resolver.resolve(URL).await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout(_)));
    }
}
