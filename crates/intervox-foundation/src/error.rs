use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Media subsystem error: {0}")]
    Media(#[from] MediaError),

    #[error("Persisted state error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    /// Microphone access was refused. Recording is unreachable until a
    /// retried acquisition succeeds.
    #[error("Microphone permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Recorder is not capturing a segment")]
    NotRecording,

    #[error("Recorder is already capturing a segment")]
    AlreadyRecording,

    #[error("WAV encoding failed: {0}")]
    Encoding(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The on-disk document could not be parsed or carries an unsupported
    /// schema version. The store has been cleared; the flow must restart.
    #[error("Corrupt persisted state, store cleared: {0}")]
    Corrupt(String),

    #[error("Unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    /// Retry the failing operation a bounded number of times.
    Retry { max_attempts: u32, delay: Duration },
    /// Degrade to a named substitute (e.g. a locally computed report).
    Fallback { to: String },
    /// Surface the error and wait for an explicit user retry.
    Surface,
    /// Clear state and restart the flow from a known-good screen.
    Restart,
    Ignore,
    Fatal,
}

impl AppError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            // Permission problems are never retried automatically.
            AppError::Media(MediaError::PermissionDenied { .. }) => RecoveryStrategy::Surface,
            AppError::Media(MediaError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            AppError::Media(MediaError::DeviceNotFound { .. }) => RecoveryStrategy::Fallback {
                to: "default".into(),
            },
            AppError::Store(_) => RecoveryStrategy::Restart,
            AppError::BackendUnreachable(_) => RecoveryStrategy::Fallback {
                to: "local report".into(),
            },
            AppError::Transient(_) => RecoveryStrategy::Ignore,
            AppError::Fatal(_) | AppError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Surface,
        }
    }
}
