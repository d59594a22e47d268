//! Error types for synthesis and playback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    /// Engine is not available or not installed.
    #[error("Speech engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Prompt audio fetch failed: {0}")]
    Fetch(String),

    #[error("Invalid text input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TtsResult<T> = Result<T, TtsError>;
