//! Transcription abstraction layer for Intervox.
//!
//! Defines the `Transcriber` trait the turn controller speaks to, a remote
//! HTTP implementation for the external transcription service, a scripted
//! mock for tests and offline runs, and the transcript normalization pass.

use async_trait::async_trait;
use intervox_media::AudioClip;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub mod mock;
pub mod normalize;
pub mod remote;

pub use mock::{MockTranscriber, ScriptedResult};
pub use normalize::normalize_transcript;
pub use remote::{RemoteTranscriber, RemoteTranscriberConfig};

/// Stored in place of an answer when transcription itself failed. Distinct
/// from the empty string, which means the user gave no usable answer.
pub const TRANSCRIPTION_FAILED_TEXT: &str = "(transcription failed; answer not captured)";

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique transcription request ID.
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A completed transcription result.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
}

#[derive(Error, Debug)]
pub enum SttError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transcription service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Media error: {0}")]
    Media(#[from] intervox_foundation::MediaError),
}

/// Batch transcription interface: one recorded clip in, one transcript out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, SttError>;

    fn name(&self) -> &str;
}
