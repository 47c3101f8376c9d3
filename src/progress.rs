//! Progress reporting shared by batch conversion, fetching and the queue
//!
//! Work runs on a background task and reports through a one-way
//! `tokio::sync::mpsc` channel. The consumer drains the receiver on its own
//! context; the producer never waits for the consumer to act on an event.

use std::path::PathBuf;
use tokio::sync::mpsc;

/// Optional sending half of a progress channel
///
/// A reporter without a channel, or with a closed receiver, silently drops
/// events so that reporting can never fail the work it describes.
#[derive(Debug)]
pub struct Reporter<E> {
    tx: Option<mpsc::Sender<E>>,
}

impl<E> Reporter<E> {
    /// Report into the given channel
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Reporter that discards every event
    pub fn silent() -> Self {
        Self { tx: None }
    }

    /// Send an event, ignoring a closed receiver
    pub async fn emit(&self, event: E) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}

impl<E> Clone for Reporter<E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<E> Default for Reporter<E> {
    fn default() -> Self {
        Self::silent()
    }
}

impl<E> From<mpsc::Sender<E>> for Reporter<E> {
    fn from(tx: mpsc::Sender<E>) -> Self {
        Self::new(tx)
    }
}

/// Per-item update from the batch conversion driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertProgress {
    /// Items processed so far, including the one this event describes
    pub processed: usize,
    /// Total number of items in the batch
    pub total: usize,
    /// Status label, e.g. `converting: song.flac`
    pub label: String,
    /// `Some(true)` for success or skip, `Some(false)` for failure,
    /// `None` while the conversion is still in flight
    pub outcome: Option<bool>,
}

impl ConvertProgress {
    pub fn is_in_flight(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Step message from the remote track fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProgress {
    pub message: String,
    /// Rough completion of the fetch, 0..=100
    pub percent: u8,
}

impl FetchProgress {
    pub fn new(message: impl Into<String>, percent: u8) -> Self {
        Self {
            message: message.into(),
            percent: percent.min(100),
        }
    }
}

/// Status change reported by the download queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// An item is about to be fetched
    ItemStarted { index: usize, title: String },
    /// A step message from the fetch in progress
    ItemProgress {
        index: usize,
        message: String,
        percent: u8,
    },
    /// An item finished downloading
    ItemCompleted { index: usize, path: PathBuf },
    /// An item failed; it will be retried on the next run
    ItemFailed { index: usize, message: String },
    /// An item was skipped because its file is already on disk
    ItemSkipped { index: usize, title: String },
    /// The run ended; fires exactly once per run
    Complete { successful: usize, total: usize },
}
