use crate::capture::AudioFrame;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Read-only input level monitor (the waveform display's data source).
///
/// Publishes the RMS level of each frame in dBFS through a watch channel.
/// Purely observational; it never touches recording state.
pub struct LevelMeter;

const SILENCE_DBFS: f32 = -90.0;

impl LevelMeter {
    pub fn spawn(
        mut frames: broadcast::Receiver<AudioFrame>,
    ) -> (JoinHandle<()>, watch::Receiver<f32>) {
        let (tx, rx) = watch::channel(SILENCE_DBFS);
        let handle = tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Ok(frame) => {
                        let _ = tx.send(rms_dbfs(&frame.data));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        (handle, rx)
    }
}

fn rms_dbfs(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DBFS;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let x = s as f64;
            x * x
        })
        .sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();
    if rms <= f64::EPSILON {
        return SILENCE_DBFS;
    }
    (20.0 * (rms / i16::MAX as f64).log10()).max(SILENCE_DBFS as f64) as f32
}
