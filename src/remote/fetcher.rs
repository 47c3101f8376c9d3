//! Download a remote track and encode it to MP3
//!
//! The stream goes to a private temporary directory first; only the encoded
//! MP3 ever lands in the destination folder. The temporary directory is
//! removed on every exit path, including timeouts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use super::client::ClientError;
use super::resolver::{ResolveError, Resolver};
use crate::engine::{AudioEngine, EncodeSettings, EngineError};
use crate::progress::{FetchProgress, Reporter};
use crate::utils::sanitize_filename;

/// Failure fetching a remote track
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("no audio stream found")]
    NoAudioStream,

    #[error("download failed: {0}")]
    Download(#[source] ClientError),

    #[error("conversion failed: {0}")]
    Encode(#[source] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// A successfully fetched and encoded track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTrack {
    /// Path of the written MP3
    pub path: PathBuf,
    pub file_name: String,
    pub message: String,
}

/// Fetches tracks through a [`Resolver`] and encodes them with an [`AudioEngine`]
#[derive(Clone)]
pub struct Fetcher {
    resolver: Resolver,
    engine: Arc<dyn AudioEngine>,
    settings: EncodeSettings,
    timeout: Duration,
    /// Parent of the per-fetch temporary directories; system temp dir if unset
    temp_root: Option<PathBuf>,
}

impl Fetcher {
    pub fn new(
        resolver: Resolver,
        engine: Arc<dyn AudioEngine>,
        settings: EncodeSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            engine,
            settings,
            timeout,
            temp_root: None,
        }
    }

    /// Create temporary download directories under `root`
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Download the best audio stream of `url` and encode it into `dest_folder`
    ///
    /// Every failure, including a timeout, comes back as a [`FetchError`];
    /// the last progress message describes it.
    pub async fn fetch(
        &self,
        url: &str,
        dest_folder: &Path,
        progress: &Reporter<FetchProgress>,
    ) -> Result<FetchedTrack, FetchError> {
        let result = match tokio::time::timeout(
            self.timeout,
            self.fetch_inner(url, dest_folder, progress),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        match &result {
            Ok(track) => info!("Fetched {} -> {}", url, track.path.display()),
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                progress
                    .emit(FetchProgress::new(format!("download error: {}", e), 0))
                    .await;
            }
        }

        result
    }

    async fn fetch_inner(
        &self,
        url: &str,
        dest_folder: &Path,
        progress: &Reporter<FetchProgress>,
    ) -> Result<FetchedTrack, FetchError> {
        progress
            .emit(FetchProgress::new("fetching track info...", 5))
            .await;

        let track = self.resolver.lookup(url).await?;

        let mut base_name = sanitize_filename(&track.title);
        if base_name.is_empty() {
            base_name = track.video_id.clone();
        }

        progress
            .emit(FetchProgress::new(
                format!("downloading: {}...", truncate_chars(&base_name, 30)),
                15,
            ))
            .await;

        let stream = track
            .best_audio_stream()
            .ok_or(FetchError::NoAudioStream)?;
        debug!(
            "Selected stream {} ({:?} kbit/s)",
            stream.format_id, stream.bitrate_kbps
        );

        fs::create_dir_all(dest_folder).await?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("tunepress-");
        let temp_dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let temp_file = temp_dir.path().join(format!("audio.{}", stream.extension));

        progress
            .emit(FetchProgress::new("downloading audio stream...", 30))
            .await;

        self.resolver
            .client()
            .download(stream, &temp_file)
            .await
            .map_err(FetchError::Download)?;

        progress
            .emit(FetchProgress::new("converting to MP3...", 70))
            .await;

        let output_path = unique_output_path(dest_folder, &base_name);
        self.engine
            .transcode(&temp_file, &output_path, &self.settings)
            .await
            .map_err(FetchError::Encode)?;

        // Explicit close so a cleanup failure is at least logged
        if let Err(e) = temp_dir.close() {
            warn!("Failed to remove temporary directory: {}", e);
        }

        let file_name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        progress.emit(FetchProgress::new("done!", 100)).await;

        Ok(FetchedTrack {
            message: format!("downloaded: {}", file_name),
            path: output_path,
            file_name,
        })
    }
}

/// First free path among `<base>.mp3`, `<base> (1).mp3`, `<base> (2).mp3`, ...
///
/// Not a reservation: only safe while fetches into one folder are sequential.
pub fn unique_output_path(dest_folder: &Path, base_name: &str) -> PathBuf {
    let mut candidate = dest_folder.join(format!("{}.mp3", base_name));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dest_folder.join(format!("{} ({}).mp3", base_name, counter));
        counter += 1;
    }
    candidate
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_track, track_without_streams, CopyEngine, FakeClient};
    use tokio::sync::mpsc;

    const URL_A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
    const URL_B: &str = "https://youtu.be/bbbbbbbbbbb";

    fn fetcher(client: FakeClient) -> Fetcher {
        let resolver = Resolver::new(Arc::new(client), Duration::from_secs(5));
        Fetcher::new(
            resolver,
            Arc::new(CopyEngine::default()),
            EncodeSettings::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_fetch_writes_mp3() {
        let dest = tempfile::tempdir().unwrap();
        let f = fetcher(FakeClient::new().with_track(URL_A, sample_track("aaaaaaaaaaa", "My: Song?")));

        let track = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap();
        assert_eq!(track.file_name, "My_ Song_.mp3");
        assert_eq!(track.path, dest.path().join("My_ Song_.mp3"));
        assert!(track.path.exists());
        assert_eq!(track.message, "downloaded: My_ Song_.mp3");
    }

    #[tokio::test]
    async fn test_same_title_gets_numbered_suffix() {
        let dest = tempfile::tempdir().unwrap();
        let f = fetcher(
            FakeClient::new()
                .with_track(URL_A, sample_track("aaaaaaaaaaa", "Same Title"))
                .with_track(URL_B, sample_track("bbbbbbbbbbb", "Same Title")),
        );

        let first = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap();
        let second = f.fetch(URL_B, dest.path(), &Reporter::silent()).await.unwrap();

        assert_eq!(first.file_name, "Same Title.mp3");
        assert_eq!(second.file_name, "Same Title (1).mp3");
        assert!(dest.path().join("Same Title.mp3").exists());
        assert!(dest.path().join("Same Title (1).mp3").exists());
    }

    #[tokio::test]
    async fn test_no_audio_stream_before_download() {
        let dest = tempfile::tempdir().unwrap();
        let client = Arc::new(
            FakeClient::new().with_track(URL_A, track_without_streams("aaaaaaaaaaa", "Silent")),
        );
        let f = Fetcher::new(
            Resolver::new(client.clone(), Duration::from_secs(5)),
            Arc::new(CopyEngine::default()),
            EncodeSettings::default(),
            Duration::from_secs(5),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::NoAudioStream));
        assert_eq!(err.to_string(), "no audio stream found");
        assert_eq!(client.download_count(), 0);
    }

    #[tokio::test]
    async fn test_encode_failure_leaves_no_output() {
        let dest = tempfile::tempdir().unwrap();
        let f = Fetcher::new(
            Resolver::new(
                Arc::new(FakeClient::new().with_track(URL_A, sample_track("aaaaaaaaaaa", "Broken"))),
                Duration::from_secs(5),
            ),
            Arc::new(CopyEngine::failing()),
            EncodeSettings::default(),
            Duration::from_secs(5),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::Encode(_)));
        assert!(!dest.path().join("Broken.mp3").exists());
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let dest = tempfile::tempdir().unwrap();
        let f = fetcher(
            FakeClient::new()
                .with_track(URL_A, sample_track("aaaaaaaaaaa", "Flaky"))
                .with_failing_downloads(),
        );

        let (tx, mut rx) = mpsc::channel(32);
        let err = f.fetch(URL_A, dest.path(), &Reporter::new(tx)).await.unwrap_err();
        assert!(matches!(err, FetchError::Download(_)));

        let mut last = None;
        while let Ok(p) = rx.try_recv() {
            last = Some(p);
        }
        let last = last.unwrap();
        assert!(last.message.starts_with("download error:"));
    }

    #[tokio::test]
    async fn test_progress_steps_in_order() {
        let dest = tempfile::tempdir().unwrap();
        let f = fetcher(FakeClient::new().with_track(URL_A, sample_track("aaaaaaaaaaa", "Steps")));

        let (tx, mut rx) = mpsc::channel(32);
        f.fetch(URL_A, dest.path(), &Reporter::new(tx)).await.unwrap();

        let mut percents = Vec::new();
        while let Ok(p) = rx.try_recv() {
            percents.push(p.percent);
        }
        assert_eq!(percents, vec![5, 15, 30, 70, 100]);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let dest = tempfile::tempdir().unwrap();
        let client = FakeClient::new()
            .with_track(URL_A, sample_track("aaaaaaaaaaa", "Slow"))
            .with_download_delay(Duration::from_millis(300));
        let f = Fetcher::new(
            Resolver::new(Arc::new(client), Duration::from_secs(5)),
            Arc::new(CopyEngine::default()),
            EncodeSettings::default(),
            Duration::from_millis(50),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(!dest.path().join("Slow.mp3").exists());
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    fn fetcher_in(client: FakeClient, engine: CopyEngine, timeout: Duration, root: &Path) -> Fetcher {
        Fetcher::new(
            Resolver::new(Arc::new(client), Duration::from_secs(5)),
            Arc::new(engine),
            EncodeSettings::default(),
            timeout,
        )
        .with_temp_root(root)
    }

    #[tokio::test]
    async fn test_temp_dir_removed_after_success() {
        let dest = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let f = fetcher_in(
            FakeClient::new().with_track(URL_A, sample_track("aaaaaaaaaaa", "Clean")),
            CopyEngine::default(),
            Duration::from_secs(5),
            temp_root.path(),
        );

        f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap();
        assert!(dest.path().join("Clean.mp3").exists());
        assert!(is_empty_dir(temp_root.path()));
    }

    #[tokio::test]
    async fn test_temp_dir_removed_after_download_failure() {
        let dest = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let f = fetcher_in(
            FakeClient::new()
                .with_track(URL_A, sample_track("aaaaaaaaaaa", "Flaky"))
                .with_failing_downloads(),
            CopyEngine::default(),
            Duration::from_secs(5),
            temp_root.path(),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::Download(_)));
        assert!(is_empty_dir(temp_root.path()));
    }

    #[tokio::test]
    async fn test_temp_dir_removed_after_encode_failure() {
        let dest = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let f = fetcher_in(
            FakeClient::new().with_track(URL_A, sample_track("aaaaaaaaaaa", "Broken")),
            CopyEngine::failing(),
            Duration::from_secs(5),
            temp_root.path(),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::Encode(_)));
        assert!(is_empty_dir(temp_root.path()));
    }

    #[tokio::test]
    async fn test_temp_dir_removed_after_timeout() {
        let dest = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let f = fetcher_in(
            FakeClient::new()
                .with_track(URL_A, sample_track("aaaaaaaaaaa", "Slow"))
                .with_download_delay(Duration::from_millis(300)),
            CopyEngine::default(),
            Duration::from_millis(50),
            temp_root.path(),
        );

        let err = f.fetch(URL_A, dest.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(is_empty_dir(temp_root.path()));
    }

    #[test]
    fn test_unique_output_path_counts_up() {
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(dest.path().join("T.mp3"), b"").unwrap();
        std::fs::write(dest.path().join("T (1).mp3"), b"").unwrap();

        assert_eq!(unique_output_path(dest.path(), "T"), dest.path().join("T (2).mp3"));
        assert_eq!(unique_output_path(dest.path(), "U"), dest.path().join("U.mp3"));
    }
}
