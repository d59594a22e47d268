//! Microphone acquisition and segment recording for Intervox.
//!
//! The capture stream is acquired once per session on a dedicated thread and
//! shared read-only through a broadcast channel. Consumers (the level meter,
//! the segment recorder) subscribe to frames; only the turn controller
//! starts and stops recorded segments.

pub mod capture;
pub mod clip;
pub mod device;
pub mod level;
pub mod recorder;

pub use capture::{AudioFrame, CaptureConfig, MicCapture};
pub use clip::AudioClip;
pub use device::DeviceManager;
pub use level::LevelMeter;
pub use recorder::{MicSegmentRecorder, MockRecorder, SegmentRecorder};
