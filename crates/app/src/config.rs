//! On-disk configuration, merged under the CLI flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds of think-time before capture (clamped to 3-10 by the
    /// controller).
    pub think_time_secs: u64,
    /// Start capture while the prompt is still playing.
    pub capture_during_playback: bool,
    /// Preferred input device name.
    pub device: Option<String>,
    /// Backend base URL.
    pub backend_url: String,
    /// Bearer token for the backend.
    pub api_key: Option<String>,
    /// Transcription service endpoint.
    pub transcriber_url: String,
    /// espeak voice identifier.
    pub voice: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            think_time_secs: 5,
            capture_during_playback: false,
            device: None,
            backend_url: "http://127.0.0.1:8700".to_string(),
            api_key: None,
            transcriber_url: "http://127.0.0.1:8700/transcribe".to_string(),
            voice: None,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/intervox.toml")).unwrap();
        assert_eq!(config.think_time_secs, 5);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intervox.toml");
        std::fs::write(&path, "think_time_secs = 8\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.think_time_secs, 8);
        assert!(!config.capture_during_playback);
    }
}
