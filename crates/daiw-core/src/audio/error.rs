//! Audio backend error types

use thiserror::Error;

/// Errors that can occur during device and stream operations
///
/// Every variant carries a message suitable for showing next to the control
/// that triggered it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The platform refused to open any device
    #[error("Failed to open audio device: {0}")]
    DeviceOpenFailure(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Requested sample rate, buffer size or device is not supported
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A format change was requested while no device is open
    #[error("No audio device is open")]
    NoDeviceOpen,

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
