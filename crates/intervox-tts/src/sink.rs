//! Audio output sinks.
//!
//! The playback queue is the only caller; nothing else in the system may
//! drive a sink while a queued item is active.

use crate::error::{TtsError, TtsResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one WAV clip to completion. Cancellation is dropping the future.
    async fn play(&self, wav: &[u8]) -> TtsResult<()>;
}

/// Pipes WAV bytes to an external player process (`aplay -q -` by default).
/// The child is killed if the play future is dropped, which is how the
/// queue implements skip.
pub struct ProcessSink {
    command: String,
    args: Vec<String>,
}

impl ProcessSink {
    pub fn new() -> Self {
        Self {
            command: "aplay".to_string(),
            args: vec!["-q".to_string()],
        }
    }

    pub fn with_command(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl Default for ProcessSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for ProcessSink {
    async fn play(&self, wav: &[u8]) -> TtsResult<()> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Playback("player stdin unavailable".into()))?;
        stdin.write_all(wav).await?;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(TtsError::Playback(format!(
                "{} exited with {}",
                self.command, status
            )));
        }
        Ok(())
    }
}

/// Sink that plays nothing, optionally simulating playback time. Used when
/// no audio output exists and in tests.
pub struct NullSink {
    delay: Duration,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, _wav: &[u8]) -> TtsResult<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}
