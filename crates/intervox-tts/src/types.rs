//! Core types for prompt synthesis and playback.

use serde::{Deserialize, Serialize};

/// Synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub enabled: bool,
    /// Default voice identifier, engine-specific.
    pub voice: Option<String>,
    /// Speaking rate in words per minute.
    pub speech_rate: Option<u32>,
    /// Volume, 0.0-1.0.
    pub volume: Option<f32>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: None,
            speech_rate: Some(180),
            volume: Some(0.8),
        }
    }
}

/// Where a prompt segment's audio comes from.
#[derive(Debug, Clone)]
pub enum ClipSource {
    /// Synthesize locally from text.
    Text(String),
    /// Fetch pre-rendered audio from the backend.
    Url(String),
    /// Already-resolved WAV bytes.
    Wav(Vec<u8>),
}

/// One ordered playback segment (an interviewer comment, a question, a
/// follow-up prompt).
#[derive(Debug, Clone)]
pub struct PromptClip {
    pub source: ClipSource,
    pub label: String,
}

impl PromptClip {
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: ClipSource::Text(text.into()),
            label: label.into(),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source: ClipSource::Url(url.into()),
            label: label.into(),
        }
    }

    pub fn wav(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: ClipSource::Wav(bytes),
            label: label.into(),
        }
    }
}
