use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use intervox_foundation::MediaError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// One block of captured audio, downmixed to mono PCM16.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub data: Vec<i16>,
    pub timestamp_ms: u64,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Preferred input device name; host default when `None`.
    pub device: Option<String>,
    pub start_muted: bool,
}

/// Handle to the dedicated microphone capture thread.
///
/// Acquired once per session. Frames are fanned out through a broadcast
/// channel; the segment recorder and the level meter subscribe read-only.
pub struct MicCapture {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    muted: Arc<AtomicBool>,
    frame_tx: broadcast::Sender<AudioFrame>,
    sample_rate: u32,
}

impl MicCapture {
    pub fn spawn(config: CaptureConfig) -> Result<Self, MediaError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let muted = Arc::new(AtomicBool::new(config.start_muted));
        let (frame_tx, _) = broadcast::channel(256);
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<u32, MediaError>>();

        let thread_shutdown = shutdown.clone();
        let thread_muted = muted.clone();
        let thread_tx = frame_tx.clone();
        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_thread(config, thread_shutdown, thread_muted, thread_tx, ready_tx)
            })
            .map_err(|e| MediaError::Fatal(format!("capture thread spawn failed: {}", e)))?;

        // The stream must be built and played on its own thread; wait for the
        // open result so permission failures surface here, at acquisition.
        match ready_rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Ok(sample_rate)) => Ok(Self {
                handle,
                shutdown,
                muted,
                frame_tx,
                sample_rate,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(MediaError::NoDataTimeout {
                duration: Duration::from_secs(10),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.frame_tx.subscribe()
    }

    pub fn frame_sender(&self) -> broadcast::Sender<AudioFrame> {
        self.frame_tx.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Release the stream and join the capture thread.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
        tracing::info!(target: "media", "Microphone capture stopped");
    }
}

fn capture_thread(
    config: CaptureConfig,
    shutdown: Arc<AtomicBool>,
    muted: Arc<AtomicBool>,
    frame_tx: broadcast::Sender<AudioFrame>,
    ready_tx: std_mpsc::Sender<Result<u32, MediaError>>,
) {
    let stream = match open_stream(&config, muted, frame_tx) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Keep the stream alive until the session releases it.
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
}

fn open_stream(
    config: &CaptureConfig,
    muted: Arc<AtomicBool>,
    frame_tx: broadcast::Sender<AudioFrame>,
) -> Result<(Stream, u32), MediaError> {
    let manager = super::device::DeviceManager::new();
    let device = manager.input_device(config.device.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = manager.input_config(&device)?;
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;
    let started = Instant::now();

    let err_fn = |err: cpal::StreamError| {
        tracing::error!(target: "media", "Capture stream error: {}", err);
    };

    let forward = move |mono: Vec<i16>| {
        if muted.load(Ordering::SeqCst) || mono.is_empty() {
            return;
        }
        let frame = AudioFrame {
            data: mono,
            timestamp_ms: started.elapsed().as_millis() as u64,
            sample_rate,
        };
        // No subscribers is fine; the level meter may not be attached yet.
        let _ = frame_tx.send(frame);
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let forward = forward.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    forward(downmix(data.iter().map(|&s| s as i32), channels));
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let forward = forward.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    forward(downmix(data.iter().map(|&s| s as i32 - 32768), channels));
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::F32 => {
            let forward = forward.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    forward(downmix(
                        data.iter()
                            .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i32),
                        channels,
                    ));
                },
                err_fn,
                None,
            )?
        }
        other => {
            return Err(MediaError::FormatNotSupported {
                format: format!("{:?}", other),
            })
        }
    };

    stream.play()?;
    tracing::info!(
        target: "media",
        "Microphone stream started on {:?} ({} Hz, {} ch, {:?})",
        device_name,
        sample_rate,
        channels,
        sample_format
    );

    Ok((stream, sample_rate))
}

fn downmix(samples: impl Iterator<Item = i32>, channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.map(|s| s as i16).collect();
    }
    let mut mono = Vec::new();
    let mut acc = 0i32;
    let mut n = 0usize;
    for s in samples {
        acc += s;
        n += 1;
        if n == channels {
            mono.push((acc / channels as i32) as i16);
            acc = 0;
            n = 0;
        }
    }
    mono
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channel_pairs() {
        let interleaved = [100i32, 200, -100, -200];
        assert_eq!(downmix(interleaved.into_iter(), 2), vec![150, -150]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let samples = [1i32, 2, 3];
        assert_eq!(downmix(samples.into_iter(), 1), vec![1, 2, 3]);
    }
}
