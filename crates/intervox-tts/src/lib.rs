//! Interviewer prompt synthesis and playback for Intervox.
//!
//! The playback queue owns the audio output exclusively: prompt segments
//! play strictly in order, one at a time, and the turn controller consults
//! the queue's busy state before starting a think-time countdown.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod engine;
pub mod error;
pub mod espeak;
pub mod queue;
pub mod sink;
pub mod types;

pub use engine::{NullEngine, SpeechEngine, SynthesizedClip};
pub use error::{TtsError, TtsResult};
pub use espeak::EspeakEngine;
pub use queue::{PlaybackHandle, PlaybackQueue};
pub use sink::{AudioSink, NullSink, ProcessSink};
pub use types::{ClipSource, PromptClip, TtsConfig};

/// Generates unique synthesis IDs.
static SYNTHESIS_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_synthesis_id() -> u64 {
    SYNTHESIS_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Resolves a prompt clip URL to playable audio bytes. Implemented by the
/// backend client; the queue itself never talks to the network.
#[async_trait]
pub trait ClipFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> TtsResult<Vec<u8>>;
}
