//! Sequential prompt playback queue.
//!
//! Segments play strictly in FIFO order, one at a time. Skip cancels the
//! current segment immediately; clear drops pending segments. The busy
//! watch is how the turn controller defers think-time while prompts play.

use crate::engine::SpeechEngine;
use crate::error::{TtsError, TtsResult};
use crate::sink::AudioSink;
use crate::types::{ClipSource, PromptClip};
use crate::ClipFetcher;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum QueueCommand {
    Enqueue(Vec<PromptClip>, oneshot::Sender<()>),
    Skip,
    Clear,
    Shutdown,
}

/// Cheap cloneable handle to the queue task.
#[derive(Clone)]
pub struct PlaybackHandle {
    cmd_tx: mpsc::Sender<QueueCommand>,
    busy_rx: watch::Receiver<bool>,
}

impl PlaybackHandle {
    /// Append segments to the queue. Resolves once the queue has accepted
    /// them, so `is_busy` is accurate immediately afterwards.
    pub async fn enqueue(&self, clips: Vec<PromptClip>) -> bool {
        if clips.is_empty() {
            return true;
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(QueueCommand::Enqueue(clips, ack_tx))
            .await
            .is_err()
        {
            return false;
        }
        ack_rx.await.is_ok()
    }

    /// Stop the current segment immediately and advance.
    pub async fn skip(&self) {
        let _ = self.cmd_tx.send(QueueCommand::Skip).await;
    }

    /// Drop all pending segments; the current one keeps playing.
    pub async fn clear(&self) {
        let _ = self.cmd_tx.send(QueueCommand::Clear).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(QueueCommand::Shutdown).await;
    }

    pub fn is_busy(&self) -> bool {
        *self.busy_rx.borrow()
    }

    pub fn busy_watch(&self) -> watch::Receiver<bool> {
        self.busy_rx.clone()
    }

    /// Resolve once the queue is empty and nothing is playing.
    pub async fn wait_idle(&self) {
        let mut rx = self.busy_rx.clone();
        let _ = rx.wait_for(|busy| !busy).await;
    }
}

pub struct PlaybackQueue {
    engine: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
    fetcher: Option<Arc<dyn ClipFetcher>>,
}

impl PlaybackQueue {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        fetcher: Option<Arc<dyn ClipFetcher>>,
    ) -> Self {
        Self {
            engine,
            sink,
            fetcher,
        }
    }

    pub fn spawn(self) -> (PlaybackHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (busy_tx, busy_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(cmd_rx, busy_tx));
        (PlaybackHandle { cmd_tx, busy_rx }, task)
    }

    async fn run(self, mut cmd_rx: mpsc::Receiver<QueueCommand>, busy_tx: watch::Sender<bool>) {
        let mut pending: VecDeque<PromptClip> = VecDeque::new();

        'outer: loop {
            // Pull the next segment, idling until one arrives.
            let clip = loop {
                if let Some(clip) = pending.pop_front() {
                    break clip;
                }
                let _ = busy_tx.send(false);
                match cmd_rx.recv().await {
                    Some(QueueCommand::Enqueue(items, ack)) => {
                        pending.extend(items);
                        if !pending.is_empty() {
                            let _ = busy_tx.send(true);
                        }
                        let _ = ack.send(());
                    }
                    Some(QueueCommand::Skip) | Some(QueueCommand::Clear) => {}
                    Some(QueueCommand::Shutdown) | None => break 'outer,
                }
            };

            let _ = busy_tx.send(true);
            let wav = match resolve(self.engine.as_ref(), self.fetcher.as_deref(), &clip).await {
                Ok(wav) => wav,
                Err(e) => {
                    warn!(target: "tts", "Failed to resolve segment '{}': {}", clip.label, e);
                    continue;
                }
            };

            debug!(target: "tts", "Playing segment '{}'", clip.label);
            let play = self.sink.play(&wav);
            tokio::pin!(play);
            loop {
                tokio::select! {
                    res = &mut play => {
                        if let Err(e) = res {
                            warn!(target: "tts", "Playback of '{}' failed: {}", clip.label, e);
                        }
                        break;
                    }
                    cmd = cmd_rx.recv() => match cmd {
                        Some(QueueCommand::Enqueue(items, ack)) => {
                            pending.extend(items);
                            let _ = ack.send(());
                        }
                        Some(QueueCommand::Skip) => {
                            debug!(target: "tts", "Skipping segment '{}'", clip.label);
                            break;
                        }
                        Some(QueueCommand::Clear) => pending.clear(),
                        Some(QueueCommand::Shutdown) | None => break 'outer,
                    }
                }
            }
        }

        let _ = busy_tx.send(false);
        debug!(target: "tts", "Playback queue stopped");
    }
}

async fn resolve(
    engine: &dyn SpeechEngine,
    fetcher: Option<&dyn ClipFetcher>,
    clip: &PromptClip,
) -> TtsResult<Vec<u8>> {
    match &clip.source {
        ClipSource::Wav(bytes) => Ok(bytes.clone()),
        ClipSource::Text(text) => Ok(engine.synthesize(text).await?.data),
        ClipSource::Url(url) => match fetcher {
            Some(fetcher) => fetcher.fetch(url).await,
            None => Err(TtsError::Fetch(format!(
                "no fetcher configured for '{}'",
                url
            ))),
        },
    }
}
