//! Audio worker
//!
//! Runs a [`Dispatcher`] on a dedicated thread so the caller never blocks on
//! audio work. Commands and replies travel over unbounded tokio channels and
//! are processed strictly in arrival order.

pub mod dispatcher;
pub mod protocol;

pub use dispatcher::Dispatcher;
pub use protocol::{Command, Envelope, Reply, SoundEffectOptions, SoundEffectRequest, SpeechRequest};

use crate::config::EngineConfig;
use crate::error::{Result, VoxscapeError};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Caller side of a running worker
pub struct WorkerHandle {
    commands: Option<UnboundedSender<Envelope>>,
    replies: UnboundedReceiver<Reply>,
    thread: Option<JoinHandle<()>>,
}

/// Start a worker thread owning a fresh engine
///
/// The first reply is always `audio_worker_ready`.
pub fn spawn_worker(config: EngineConfig) -> Result<WorkerHandle> {
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Envelope>();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Reply>();

    let thread = std::thread::Builder::new()
        .name("voxscape-audio".to_string())
        .spawn(move || {
            let mut dispatcher = Dispatcher::new(config);
            if reply_tx.send(Reply::AudioWorkerReady).is_err() {
                return;
            }
            info!("[WORKER] Ready");

            while let Some(envelope) = command_rx.blocking_recv() {
                if let Some(reply) = dispatcher.handle(envelope) {
                    if reply_tx.send(reply).is_err() {
                        debug!("[WORKER] Reply receiver dropped");
                        break;
                    }
                }
            }

            dispatcher.shutdown();
            info!("[WORKER] Stopped after {} commands", dispatcher.handled());
        })?;

    Ok(WorkerHandle {
        commands: Some(command_tx),
        replies: reply_rx,
        thread: Some(thread),
    })
}

impl WorkerHandle {
    /// Queue a command
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or(VoxscapeError::WorkerClosed)?
            .send(envelope)
            .map_err(|_| VoxscapeError::WorkerClosed)
    }

    /// Parse and queue a JSON command
    pub fn send_json(&self, text: &str) -> Result<()> {
        let envelope: Envelope = serde_json::from_str(text)?;
        self.send(envelope)
    }

    /// Next reply; `None` once the worker has exited and drained
    pub async fn recv(&mut self) -> Option<Reply> {
        self.replies.recv().await
    }

    /// Next reply if one is already waiting
    pub fn try_recv(&mut self) -> Option<Reply> {
        self.replies.try_recv().ok()
    }

    /// Close the command channel and wait for the worker to finish
    ///
    /// Replies produced before the worker exited stay readable.
    pub fn shutdown(&mut self) {
        self.commands = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("[WORKER] Worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
