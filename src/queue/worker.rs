//! Background task owning the download queue
//!
//! The [`QueueManager`] lives inside one tokio task. Everything else talks to
//! it through a [`QueueHandle`], and while a run is active commands are only
//! applied between items.

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::manager::{
    EnqueueOutcome, QueueError, QueueItem, QueueManager, QueueSummary, RunReport,
};
use crate::progress::{QueueEvent, Reporter};

const COMMAND_BUFFER: usize = 32;

/// Request sent to the queue worker
#[derive(Debug)]
pub enum QueueCommand {
    Enqueue {
        url: String,
        dest_folder: PathBuf,
        overwrite: bool,
        reply: oneshot::Sender<Result<EnqueueOutcome, QueueError>>,
    },
    Remove {
        index: usize,
        reply: oneshot::Sender<Result<QueueItem, QueueError>>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<QueueItem>>,
    },
    Summary {
        reply: oneshot::Sender<QueueSummary>,
    },
    /// Replies once the run has ended
    Run {
        reply: oneshot::Sender<Result<RunReport, QueueError>>,
    },
    /// Replies `true` if a run was active and will stop after its current item
    Stop {
        reply: oneshot::Sender<bool>,
    },
}

/// What the worker loop must do after a command
enum Control {
    Continue,
    Stop,
    Run(oneshot::Sender<Result<RunReport, QueueError>>),
}

/// Cloneable handle to a running [`QueueWorker`]
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueueCommand>,
}

impl QueueHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| QueueError::WorkerGone)?;
        rx.await.map_err(|_| QueueError::WorkerGone)
    }

    pub async fn enqueue(
        &self,
        url: impl Into<String>,
        dest_folder: impl Into<PathBuf>,
        overwrite: bool,
    ) -> Result<EnqueueOutcome, QueueError> {
        let url = url.into();
        let dest_folder = dest_folder.into();
        self.request(|reply| QueueCommand::Enqueue {
            url,
            dest_folder,
            overwrite,
            reply,
        })
        .await?
    }

    pub async fn remove(&self, index: usize) -> Result<QueueItem, QueueError> {
        self.request(|reply| QueueCommand::Remove { index, reply })
            .await?
    }

    pub async fn clear(&self) -> Result<(), QueueError> {
        self.request(|reply| QueueCommand::Clear { reply }).await
    }

    /// Copy of the current queue
    pub async fn snapshot(&self) -> Result<Vec<QueueItem>, QueueError> {
        self.request(|reply| QueueCommand::Snapshot { reply }).await
    }

    pub async fn summary(&self) -> Result<QueueSummary, QueueError> {
        self.request(|reply| QueueCommand::Summary { reply }).await
    }

    /// Process the queue and wait for the run to end
    pub async fn run(&self) -> Result<RunReport, QueueError> {
        self.request(|reply| QueueCommand::Run { reply }).await?
    }

    pub async fn stop(&self) -> Result<bool, QueueError> {
        self.request(|reply| QueueCommand::Stop { reply }).await
    }
}

/// Task that owns a [`QueueManager`] and serves [`QueueCommand`]s
pub struct QueueWorker {
    manager: QueueManager,
    rx: mpsc::Receiver<QueueCommand>,
    events: Reporter<QueueEvent>,
}

impl QueueWorker {
    /// Move `manager` into a new task
    ///
    /// The task ends once every handle is dropped and hands the manager back
    /// through the returned `JoinHandle`.
    pub fn spawn(
        manager: QueueManager,
        events: Reporter<QueueEvent>,
    ) -> (QueueHandle, JoinHandle<QueueManager>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = Self {
            manager,
            rx,
            events,
        };
        let task = tokio::spawn(worker.serve());
        (QueueHandle { tx }, task)
    }

    async fn serve(mut self) -> QueueManager {
        debug!("Queue worker started");

        while let Some(command) = self.rx.recv().await {
            if let Control::Run(reply) = self.apply(command).await {
                let report = self.run_queue().await;
                let _ = reply.send(report);
            }
        }

        debug!("Queue worker stopped");
        self.manager
    }

    async fn run_queue(&mut self) -> Result<RunReport, QueueError> {
        self.manager.begin_run()?;

        loop {
            let mut stop = false;
            while let Ok(command) = self.rx.try_recv() {
                match self.apply(command).await {
                    Control::Continue => {}
                    Control::Stop => stop = true,
                    Control::Run(reply) => {
                        let _ = reply.send(Err(QueueError::AlreadyRunning));
                    }
                }
            }

            if stop {
                info!("Queue run stopped on request");
                break;
            }
            if !self.manager.step(&self.events).await {
                break;
            }
        }

        Ok(self.manager.finish_run(&self.events).await)
    }

    async fn apply(&mut self, command: QueueCommand) -> Control {
        match command {
            QueueCommand::Enqueue {
                url,
                dest_folder,
                overwrite,
                reply,
            } => {
                let result = self.manager.enqueue(&url, &dest_folder, overwrite).await;
                let _ = reply.send(result);
            }
            QueueCommand::Remove { index, reply } => {
                let _ = reply.send(self.manager.remove(index));
            }
            QueueCommand::Clear { reply } => {
                self.manager.clear();
                let _ = reply.send(());
            }
            QueueCommand::Snapshot { reply } => {
                let _ = reply.send(self.manager.items().to_vec());
            }
            QueueCommand::Summary { reply } => {
                let _ = reply.send(self.manager.summary());
            }
            QueueCommand::Run { reply } => return Control::Run(reply),
            QueueCommand::Stop { reply } => {
                let running = self.manager.is_running();
                let _ = reply.send(running);
                if running {
                    return Control::Stop;
                }
            }
        }
        Control::Continue
    }
}
