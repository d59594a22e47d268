//! Speech engine abstraction.

use crate::error::TtsResult;
use async_trait::async_trait;

/// A completed synthesis: WAV bytes ready for the sink.
#[derive(Debug, Clone)]
pub struct SynthesizedClip {
    pub synthesis_id: u64,
    pub data: Vec<u8>,
}

/// Core synthesis interface. Implementations render interviewer prompt text
/// to audio; playback is the queue's job, not the engine's.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Check whether the engine can run on this system.
    async fn is_available(&self) -> bool;

    async fn synthesize(&self, text: &str) -> TtsResult<SynthesizedClip>;
}

/// Engine that produces a short silent WAV for every request. Used when no
/// real engine is installed and in tests.
pub struct NullEngine;

#[async_trait]
impl SpeechEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(&self, _text: &str) -> TtsResult<SynthesizedClip> {
        Ok(SynthesizedClip {
            synthesis_id: crate::next_synthesis_id(),
            data: Vec::new(),
        })
    }
}
