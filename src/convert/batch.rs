//! Sequential batch conversion driver

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tracing::{debug, info, warn};

use super::scanner::ScanItem;
use crate::engine::{AudioEngine, EncodeSettings, EngineError};
use crate::progress::{ConvertProgress, Reporter};

/// Aggregate result of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// One message per failed item, in processing order
    pub errors: Vec<String>,
    /// The run was stopped before every item was processed
    pub stopped: bool,
}

impl ConversionOutcome {
    /// Number of items that were processed
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.stopped
    }
}

/// Converts scanned files to MP3 one at a time
#[derive(Clone)]
pub struct BatchConverter {
    engine: Arc<dyn AudioEngine>,
    settings: EncodeSettings,
    stop: Option<Arc<AtomicBool>>,
}

impl BatchConverter {
    pub fn new(engine: Arc<dyn AudioEngine>, settings: EncodeSettings) -> Self {
        Self {
            engine,
            settings,
            stop: None,
        }
    }

    /// Check `flag` before each item and stop once it is set
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Convert every item in order, reporting progress per item
    ///
    /// A failing item never aborts the batch; it is counted and its message
    /// recorded. Existing outputs are re-checked right before each item, so a
    /// stale scan never causes redundant work.
    pub async fn convert(
        &self,
        items: &[ScanItem],
        progress: &Reporter<ConvertProgress>,
    ) -> ConversionOutcome {
        let mut outcome = ConversionOutcome::default();
        let total = items.len();

        for (idx, item) in items.iter().enumerate() {
            if self.stop_requested() {
                info!("Conversion stopped after {} of {} files", idx, total);
                outcome.stopped = true;
                break;
            }

            let processed = idx + 1;
            let name = &item.display_name;

            if fs::try_exists(&item.dest_path).await.unwrap_or(false) {
                debug!("Skipping {}: {} exists", name, item.dest_path.display());
                outcome.skipped += 1;
                progress
                    .emit(ConvertProgress {
                        processed,
                        total,
                        label: format!("skipped: {}", name),
                        outcome: Some(true),
                    })
                    .await;
                continue;
            }

            progress
                .emit(ConvertProgress {
                    processed,
                    total,
                    label: format!("converting: {}", name),
                    outcome: None,
                })
                .await;

            match self.convert_one(item).await {
                Ok(()) => {
                    info!("Converted {}", name);
                    outcome.succeeded += 1;
                    progress
                        .emit(ConvertProgress {
                            processed,
                            total,
                            label: format!("completed: {}", name),
                            outcome: Some(true),
                        })
                        .await;
                }
                Err(e) => {
                    let message = if e.is_unsupported_format() {
                        format!("unsupported format: {}", name)
                    } else {
                        format!("error ({}): {}", name, e)
                    };
                    warn!("{}", message);
                    outcome.failed += 1;
                    outcome.errors.push(message);
                    progress
                        .emit(ConvertProgress {
                            processed,
                            total,
                            label: format!("error: {}", name),
                            outcome: Some(false),
                        })
                        .await;
                }
            }
        }

        outcome
    }

    async fn convert_one(&self, item: &ScanItem) -> Result<(), EngineError> {
        if let Some(parent) = item.dest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        self.engine
            .transcode(&item.source_path, &item.dest_path, &self.settings)
            .await
    }
}
