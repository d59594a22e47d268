use crate::capture::AudioFrame;
use crate::clip::AudioClip;
use async_trait::async_trait;
use intervox_foundation::MediaError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Per-turn segment capture. Only the turn controller drives this; the
/// session-wide stream stays open across segments.
#[async_trait]
pub trait SegmentRecorder: Send + Sync {
    /// Begin accumulating a new segment.
    async fn start(&mut self) -> Result<(), MediaError>;

    /// Finish the current segment and hand back the recorded clip.
    async fn stop(&mut self) -> Result<AudioClip, MediaError>;

    fn is_recording(&self) -> bool;

    /// Release any in-flight segment without producing a clip.
    async fn shutdown(&mut self);
}

struct ActiveSegment {
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<Vec<i16>>,
}

/// Recorder backed by the shared microphone broadcast.
pub struct MicSegmentRecorder {
    frame_tx: broadcast::Sender<AudioFrame>,
    sample_rate: u32,
    active: Option<ActiveSegment>,
}

impl MicSegmentRecorder {
    pub fn new(frame_tx: broadcast::Sender<AudioFrame>, sample_rate: u32) -> Self {
        Self {
            frame_tx,
            sample_rate,
            active: None,
        }
    }
}

#[async_trait]
impl SegmentRecorder for MicSegmentRecorder {
    async fn start(&mut self) -> Result<(), MediaError> {
        if self.active.is_some() {
            return Err(MediaError::AlreadyRecording);
        }

        let mut rx = self.frame_tx.subscribe();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let collector = tokio::spawn(async move {
            let mut samples = Vec::new();
            loop {
                tokio::select! {
                    res = rx.recv() => match res {
                        Ok(frame) => samples.extend_from_slice(&frame.data),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(target: "media", "Recorder lagged, lost {} frames", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut stop_rx => break,
                }
            }
            samples
        });

        self.active = Some(ActiveSegment { stop_tx, collector });
        tracing::debug!(target: "media", "Segment recording started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioClip, MediaError> {
        let segment = self.active.take().ok_or(MediaError::NotRecording)?;
        let _ = segment.stop_tx.send(());
        let samples = segment
            .collector
            .await
            .map_err(|e| MediaError::Fatal(format!("segment collector failed: {}", e)))?;
        tracing::debug!(
            target: "media",
            "Segment recording stopped ({} samples)",
            samples.len()
        );
        Ok(AudioClip::new(samples, self.sample_rate))
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    async fn shutdown(&mut self) {
        if let Some(segment) = self.active.take() {
            let _ = segment.stop_tx.send(());
            let _ = segment.collector.await;
        }
    }
}

/// Scripted recorder for tests and the offline demo flow.
pub struct MockRecorder {
    clips: Arc<Mutex<VecDeque<AudioClip>>>,
    fail_start: bool,
    recording: bool,
    pub shutdown_calls: Arc<Mutex<u32>>,
}

impl MockRecorder {
    pub fn new(clips: Vec<AudioClip>) -> Self {
        Self {
            clips: Arc::new(Mutex::new(clips.into())),
            fail_start: false,
            recording: false,
            shutdown_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Recorder whose every `start` fails as if microphone permission had
    /// been denied.
    pub fn denied() -> Self {
        Self {
            clips: Arc::new(Mutex::new(VecDeque::new())),
            fail_start: true,
            recording: false,
            shutdown_calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl SegmentRecorder for MockRecorder {
    async fn start(&mut self) -> Result<(), MediaError> {
        if self.fail_start {
            return Err(MediaError::PermissionDenied {
                reason: "denied by user".into(),
            });
        }
        if self.recording {
            return Err(MediaError::AlreadyRecording);
        }
        self.recording = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioClip, MediaError> {
        if !self.recording {
            return Err(MediaError::NotRecording);
        }
        self.recording = false;
        let clip = self
            .clips
            .lock()
            .pop_front()
            .unwrap_or_else(|| AudioClip::new(Vec::new(), 16_000));
        Ok(clip)
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    async fn shutdown(&mut self) {
        self.recording = false;
        *self.shutdown_calls.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<i16>) -> AudioFrame {
        AudioFrame {
            data,
            timestamp_ms: 0,
            sample_rate: 16_000,
        }
    }

    #[tokio::test]
    async fn recorder_accumulates_frames_between_start_and_stop() {
        let (tx, _keepalive) = broadcast::channel(16);
        let mut recorder = MicSegmentRecorder::new(tx.clone(), 16_000);

        recorder.start().await.unwrap();
        assert!(recorder.is_recording());

        tx.send(frame(vec![1, 2])).unwrap();
        tx.send(frame(vec![3])).unwrap();
        tokio::task::yield_now().await;
        // Give the collector a chance to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let clip = recorder.stop().await.unwrap();
        assert_eq!(clip.samples, vec![1, 2, 3]);
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn stop_without_start_is_an_error() {
        let (tx, _keepalive) = broadcast::channel(16);
        let mut recorder = MicSegmentRecorder::new(tx, 16_000);
        assert!(matches!(
            recorder.stop().await,
            Err(MediaError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let (tx, _keepalive) = broadcast::channel(16);
        let mut recorder = MicSegmentRecorder::new(tx, 16_000);
        recorder.start().await.unwrap();
        assert!(matches!(
            recorder.start().await,
            Err(MediaError::AlreadyRecording)
        ));
    }

    #[tokio::test]
    async fn mock_recorder_replays_script() {
        let mut recorder = MockRecorder::new(vec![AudioClip::new(vec![7], 16_000)]);
        recorder.start().await.unwrap();
        let clip = recorder.stop().await.unwrap();
        assert_eq!(clip.samples, vec![7]);
    }
}
