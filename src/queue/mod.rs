//! Sequential download queue
//!
//! [`QueueManager`] holds the items and processes them one at a time;
//! [`QueueWorker`] runs it on a background task behind a [`QueueHandle`].

pub mod manager;
pub mod worker;

pub use manager::{
    EnqueueOutcome, QueueError, QueueItem, QueueManager, QueueStatus, QueueSummary, RunReport,
};
pub use worker::{QueueCommand, QueueHandle, QueueWorker};
