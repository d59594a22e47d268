//! Remote HTTP transcription client.

use crate::{next_request_id, SttError, Transcriber, Transcript};
use async_trait::async_trait;
use intervox_media::AudioClip;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RemoteTranscriberConfig {
    /// Full endpoint URL of the transcription service.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for RemoteTranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8700/transcribe".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Uploads a recorded WAV clip and returns `{ "transcript": ... }`.
pub struct RemoteTranscriber {
    client: reqwest::Client,
    config: RemoteTranscriberConfig,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    transcript: String,
}

impl RemoteTranscriber {
    pub fn new(config: RemoteTranscriberConfig) -> Result<Self, SttError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteTranscriberConfig {
        &self.config
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, SttError> {
        let request_id = next_request_id();
        let wav = clip.to_wav_bytes()?;
        debug!(
            target: "stt",
            "Uploading clip [{}]: {} bytes, {} ms",
            request_id,
            wav.len(),
            clip.duration_ms()
        );

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("answer.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                target: "stt",
                "Transcription request [{}] failed: {} {}",
                request_id,
                status,
                message
            );
            return Err(SttError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| SttError::MalformedResponse(e.to_string()))?;
        debug!(
            target: "stt",
            "Transcription request [{}] completed ({} chars)",
            request_id,
            parsed.transcript.len()
        );
        Ok(Transcript {
            text: parsed.transcript,
        })
    }

    fn name(&self) -> &str {
        "remote-http"
    }
}
