//! Ordered download queue with per-item status
//!
//! The manager owns every [`QueueItem`] and is the only writer of their
//! status. A run walks the queue front to back, one fetch at a time; the
//! cursor API (`begin_run` / `step` / `finish_run`) lets a driver apply
//! queue edits strictly between items.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::progress::{FetchProgress, QueueEvent, Reporter};
use crate::remote::{
    validate_url, FetchError, FetchedTrack, Fetcher, ResolveError, Resolver, TrackInfo,
};
use crate::utils::{format_duration, sanitize_filename};

/// Lifecycle of a queued download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    /// Finished on an earlier run and still on disk
    AlreadyExists,
}

impl QueueStatus {
    /// Finished successfully, on this run or an earlier one
    pub fn is_done(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::AlreadyExists)
    }
}

/// A pending or processed download request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub url: String,
    pub dest_folder: PathBuf,
    pub title: String,
    pub formatted_duration: String,
    pub channel: String,
    pub status: QueueStatus,
    pub progress_percent: u8,
    /// `<sanitized title>.mp3`, fixed at insertion
    pub computed_filename: String,
    /// `dest_folder/computed_filename`, fixed at insertion
    pub computed_full_path: PathBuf,
    /// File written by the last successful fetch
    pub output_path: Option<PathBuf>,
    /// Last fetch message (success or error)
    pub last_message: Option<String>,
}

impl QueueItem {
    /// Path the item is expected on disk at
    pub fn target_path(&self) -> &Path {
        self.output_path
            .as_deref()
            .unwrap_or(&self.computed_full_path)
    }

    /// Already downloaded and still present
    fn should_skip(&self) -> bool {
        self.status.is_done() && self.target_path().exists()
    }
}

/// Result of an accepted `enqueue` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Added at `index`; `overwrites_existing` if the target file already exists
    Accepted {
        index: usize,
        overwrites_existing: bool,
    },
    /// Not added: the target file exists and overwriting was not allowed
    WouldOverwrite { title: String, path: PathBuf },
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EnqueueOutcome::Accepted { .. })
    }
}

/// Failure of a queue operation
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("not a valid track URL: {0}")]
    InvalidUrl(String),

    #[error("no destination folder given")]
    EmptyDestination,

    #[error("already in the queue: {0}")]
    DuplicateUrl(String),

    #[error("could not fetch track info: {0}")]
    Resolve(#[from] ResolveError),

    #[error("the queue is empty")]
    EmptyQueue,

    #[error("the queue is already running")]
    AlreadyRunning,

    #[error("no queue item at index {0}")]
    IndexOutOfRange(usize),

    #[error("the queue worker has stopped")]
    WorkerGone,
}

/// What a run would do with the current queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    /// Already downloaded and still on disk
    pub existing: usize,
    /// Never attempted (or downloaded but since removed)
    pub new_downloads: usize,
    /// Failed on an earlier run
    pub retries: usize,
}

impl QueueSummary {
    /// Items a run would actually fetch
    pub fn to_process(&self) -> usize {
        self.new_downloads + self.retries
    }
}

/// Totals reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub successful: usize,
    pub total: usize,
}

#[derive(Debug)]
struct RunState {
    /// Index of the next item to process
    cursor: usize,
}

/// Owner of the download queue
pub struct QueueManager {
    items: Vec<QueueItem>,
    resolver: Resolver,
    fetcher: Fetcher,
    run: Option<RunState>,
}

impl QueueManager {
    pub fn new(resolver: Resolver, fetcher: Fetcher) -> Self {
        Self {
            items: Vec::new(),
            resolver,
            fetcher,
            run: None,
        }
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.items.iter().any(|item| item.url == url)
    }

    /// File name and full path a track would be saved under
    pub fn target_for(title: &str, video_id: &str, dest_folder: &Path) -> (String, PathBuf) {
        let mut base = sanitize_filename(title);
        if base.is_empty() {
            base = video_id.to_string();
        }
        let filename = format!("{}.mp3", base);
        let full_path = dest_folder.join(&filename);
        (filename, full_path)
    }

    /// Whether a track with this title already has a file in `dest_folder`
    pub fn would_collide(info: &TrackInfo, dest_folder: &Path) -> bool {
        Self::target_for(&info.title, &info.video_id, dest_folder)
            .1
            .exists()
    }

    /// Reject malformed or duplicate requests before any lookup
    pub fn check_request(&self, url: &str, dest_folder: &Path) -> Result<(), QueueError> {
        if !validate_url(url) {
            return Err(QueueError::InvalidUrl(url.to_string()));
        }
        if dest_folder.as_os_str().is_empty() {
            return Err(QueueError::EmptyDestination);
        }
        if self.contains_url(url) {
            return Err(QueueError::DuplicateUrl(url.to_string()));
        }
        Ok(())
    }

    /// Validate, resolve and add a URL
    ///
    /// If the target file already exists and `overwrite` is false nothing is
    /// added and [`EnqueueOutcome::WouldOverwrite`] lets the caller ask first.
    pub async fn enqueue(
        &mut self,
        url: &str,
        dest_folder: &Path,
        overwrite: bool,
    ) -> Result<EnqueueOutcome, QueueError> {
        let url = url.trim();
        self.check_request(url, dest_folder)?;

        let info = self.resolver.resolve(url).await?;
        self.insert(url, dest_folder, &info, overwrite)
    }

    /// Add a URL whose metadata the caller already resolved
    pub fn insert(
        &mut self,
        url: &str,
        dest_folder: &Path,
        info: &TrackInfo,
        overwrite: bool,
    ) -> Result<EnqueueOutcome, QueueError> {
        let url = url.trim();
        self.check_request(url, dest_folder)?;

        let (computed_filename, computed_full_path) =
            Self::target_for(&info.title, &info.video_id, dest_folder);
        let exists = computed_full_path.exists();

        if exists && !overwrite {
            debug!("Not queueing {}: {} exists", url, computed_full_path.display());
            return Ok(EnqueueOutcome::WouldOverwrite {
                title: info.title.clone(),
                path: computed_full_path,
            });
        }

        self.items.push(QueueItem {
            url: url.to_string(),
            dest_folder: dest_folder.to_path_buf(),
            title: info.title.clone(),
            formatted_duration: format_duration(info.duration_seconds),
            channel: info.author.clone(),
            status: QueueStatus::Pending,
            progress_percent: 0,
            computed_filename,
            computed_full_path,
            output_path: None,
            last_message: None,
        });

        let index = self.items.len() - 1;
        info!("Queued #{}: {}", index + 1, info.title);
        Ok(EnqueueOutcome::Accepted {
            index,
            overwrites_existing: exists,
        })
    }

    /// Remove one item; safe between items of a run
    pub fn remove(&mut self, index: usize) -> Result<QueueItem, QueueError> {
        if index >= self.items.len() {
            return Err(QueueError::IndexOutOfRange(index));
        }

        let removed = self.items.remove(index);
        if let Some(run) = self.run.as_mut()
            && index < run.cursor
        {
            run.cursor -= 1;
        }

        debug!("Removed from queue: {}", removed.title);
        Ok(removed)
    }

    /// Drop every item
    ///
    /// A run in progress restarts at index 0: it ends at its next step unless
    /// items are added first, in which case those are processed in the same run.
    pub fn clear(&mut self) {
        self.items.clear();
        if let Some(run) = self.run.as_mut() {
            run.cursor = 0;
        }
        debug!("Queue cleared");
    }

    /// Preview of what a run would do
    pub fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary {
            total: self.items.len(),
            ..QueueSummary::default()
        };

        for item in &self.items {
            if item.should_skip() {
                summary.existing += 1;
            } else if item.status == QueueStatus::Failed {
                summary.retries += 1;
            } else {
                summary.new_downloads += 1;
            }
        }

        summary
    }

    /// Process the whole queue, one item at a time
    pub async fn run(&mut self, events: &Reporter<QueueEvent>) -> Result<RunReport, QueueError> {
        self.begin_run()?;
        while self.step(events).await {}
        Ok(self.finish_run(events).await)
    }

    /// Start a run at index 0
    pub fn begin_run(&mut self) -> Result<(), QueueError> {
        if self.run.is_some() {
            return Err(QueueError::AlreadyRunning);
        }
        if self.items.is_empty() {
            return Err(QueueError::EmptyQueue);
        }

        info!("Starting queue run over {} items", self.items.len());
        self.run = Some(RunState { cursor: 0 });
        Ok(())
    }

    /// Process the item under the cursor
    ///
    /// Returns `false` once the cursor is past the last item or no run is
    /// active.
    pub async fn step(&mut self, events: &Reporter<QueueEvent>) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        let index = run.cursor;
        if index >= self.items.len() {
            return false;
        }
        run.cursor += 1;

        let fetcher = &self.fetcher;
        let item = &mut self.items[index];

        if item.should_skip() {
            debug!("Skipping {}: already on disk", item.title);
            item.status = QueueStatus::AlreadyExists;
            item.progress_percent = 100;
            events
                .emit(QueueEvent::ItemSkipped {
                    index,
                    title: item.title.clone(),
                })
                .await;
            return true;
        }

        item.status = QueueStatus::Downloading;
        item.progress_percent = 0;
        events
            .emit(QueueEvent::ItemStarted {
                index,
                title: item.title.clone(),
            })
            .await;

        let result = fetch_with_progress(fetcher, item, index, events).await;

        match result {
            Ok(track) => {
                item.status = QueueStatus::Completed;
                item.progress_percent = 100;
                item.last_message = Some(track.message);
                item.output_path = Some(track.path.clone());
                events
                    .emit(QueueEvent::ItemCompleted {
                        index,
                        path: track.path,
                    })
                    .await;
            }
            Err(e) => {
                let message = e.to_string();
                item.status = QueueStatus::Failed;
                item.progress_percent = 0;
                item.last_message = Some(message.clone());
                events.emit(QueueEvent::ItemFailed { index, message }).await;
            }
        }

        true
    }

    /// End the active run and report totals; no-op without an active run
    pub async fn finish_run(&mut self, events: &Reporter<QueueEvent>) -> RunReport {
        let was_running = self.run.take().is_some();

        let report = RunReport {
            successful: self.items.iter().filter(|i| i.status.is_done()).count(),
            total: self.items.len(),
        };

        if was_running {
            info!(
                "Queue finished: {}/{} downloaded",
                report.successful, report.total
            );
            events
                .emit(QueueEvent::Complete {
                    successful: report.successful,
                    total: report.total,
                })
                .await;
        }

        report
    }
}

/// Run one fetch, mirroring its step messages into the item and the queue
/// event channel
async fn fetch_with_progress(
    fetcher: &Fetcher,
    item: &mut QueueItem,
    index: usize,
    events: &Reporter<QueueEvent>,
) -> Result<FetchedTrack, FetchError> {
    let (tx, mut rx) = mpsc::channel::<FetchProgress>(16);
    let url = item.url.clone();
    let dest = item.dest_folder.clone();

    let fetch = async move {
        let reporter = Reporter::new(tx);
        fetcher.fetch(&url, &dest, &reporter).await
    };

    let forward = async {
        while let Some(step) = rx.recv().await {
            item.progress_percent = step.percent;
            item.last_message = Some(step.message.clone());
            events
                .emit(QueueEvent::ItemProgress {
                    index,
                    message: step.message,
                    percent: step.percent,
                })
                .await;
        }
    };

    let (result, ()) = tokio::join!(fetch, forward);
    result
}
