//! Error types for the pulse core
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the pulse core and its collaborators.
///
/// None of these ever reach the host as a panic; the controller logs them
/// and degrades (see `PulseController`).
#[derive(Error, Debug)]
pub enum PulseError {
    /// Another consumer already holds the exclusive visualizer capture
    #[error("Visualizer lock unavailable: {0}")]
    LockUnavailable(String),

    /// The audio stream source refused the link request
    #[error("Stream link failed for session {session_id}: {reason}")]
    StreamLink { session_id: i32, reason: String },

    /// Stream processing error
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from turning PCM audio into visualizer byte windows
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("Window size mismatch: expected {expected} samples, got {actual}")]
    WindowSize { expected: usize, actual: usize },

    #[error("Capture size {0} must be a power of two >= 64")]
    CaptureSize(usize),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
