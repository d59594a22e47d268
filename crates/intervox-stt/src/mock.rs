//! Scripted mock transcriber for tests and offline runs.

use crate::{SttError, Transcriber, Transcript};
use async_trait::async_trait;
use intervox_media::AudioClip;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScriptedResult {
    Text(String),
    Fail(String),
}

/// Returns scripted results in order, then repeats a fallback result.
/// Supports an artificial processing delay.
pub struct MockTranscriber {
    script: Mutex<VecDeque<ScriptedResult>>,
    fallback: ScriptedResult,
    delay: Duration,
}

impl MockTranscriber {
    pub fn new(script: Vec<ScriptedResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: ScriptedResult::Text("mock transcript".to_string()),
            delay: Duration::ZERO,
        }
    }

    /// A transcriber that always yields the same text.
    pub fn with_transcript(text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResult::Text(text.into()),
            delay: Duration::ZERO,
        }
    }

    /// A transcriber whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResult::Fail(message.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<Transcript, SttError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match next {
            ScriptedResult::Text(text) => Ok(Transcript { text }),
            ScriptedResult::Fail(message) => Err(SttError::Service {
                status: 503,
                message,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> AudioClip {
        AudioClip::new(vec![0; 160], 16_000)
    }

    #[tokio::test]
    async fn script_plays_in_order_then_falls_back() {
        let stt = MockTranscriber::new(vec![
            ScriptedResult::Text("first".into()),
            ScriptedResult::Fail("boom".into()),
        ]);
        assert_eq!(stt.transcribe(&clip()).await.unwrap().text, "first");
        assert!(stt.transcribe(&clip()).await.is_err());
        assert_eq!(
            stt.transcribe(&clip()).await.unwrap().text,
            "mock transcript"
        );
    }

    #[tokio::test]
    async fn failing_transcriber_keeps_failing() {
        let stt = MockTranscriber::failing("unreachable");
        assert!(stt.transcribe(&clip()).await.is_err());
        assert!(stt.transcribe(&clip()).await.is_err());
    }
}
