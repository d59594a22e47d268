//! eSpeak-backed speech engine.
//!
//! Shells out to `espeak`/`espeak-ng --stdout` and captures the rendered
//! WAV. No in-process synthesis dependency is needed.

use crate::engine::{SpeechEngine, SynthesizedClip};
use crate::error::{TtsError, TtsResult};
use crate::next_synthesis_id;
use crate::types::TtsConfig;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct EspeakEngine {
    config: TtsConfig,
}

impl EspeakEngine {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    /// Resolve the installed espeak binary name, if any.
    async fn espeak_command() -> Option<&'static str> {
        for candidate in ["espeak", "espeak-ng"] {
            if Command::new(candidate)
                .arg("--version")
                .output()
                .await
                .is_ok()
            {
                return Some(candidate);
            }
        }
        None
    }

    fn build_args(&self, text: &str) -> Vec<String> {
        let mut args = vec!["--stdout".to_string()];

        if let Some(voice) = &self.config.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }

        let rate = self.config.speech_rate.unwrap_or(180);
        args.push("-s".to_string());
        args.push(rate.to_string());

        let volume = self.config.volume.unwrap_or(0.8);
        let amplitude = ((volume * 200.0) as u32).min(200);
        args.push("-a".to_string());
        args.push(amplitude.to_string());

        args.push(text.to_string());
        args
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn is_available(&self) -> bool {
        Self::espeak_command().await.is_some()
    }

    async fn synthesize(&self, text: &str) -> TtsResult<SynthesizedClip> {
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty prompt text".into()));
        }

        let command = Self::espeak_command()
            .await
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not installed".into()))?;

        let synthesis_id = next_synthesis_id();
        let output = Command::new(command)
            .args(self.build_args(text))
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(target: "tts", "espeak failed [{}]: {}", synthesis_id, stderr);
            return Err(TtsError::SynthesisFailed(stderr.into_owned()));
        }

        debug!(
            target: "tts",
            "Synthesized prompt [{}]: {} bytes",
            synthesis_id,
            output.stdout.len()
        );
        Ok(SynthesizedClip {
            synthesis_id,
            data: output.stdout,
        })
    }
}
