//! Error types for playback coordination

use thiserror::Error;

/// Playback errors
///
/// Only construction and configuration surface as `Err`. Everything that can
/// happen while playing (stale completions, bad indices, failed loads) is
/// absorbed by the coordinator and reported through events instead.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The platform audio session could not be established
    #[error("Audio session configuration failed: {0}")]
    Configuration(#[from] SessionError),

    /// Invalid coordinator configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Audio session errors reported by the platform
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SessionError(pub String);

/// Failure reported by an asset loader or player backend
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LoadFailure(pub String);

impl LoadFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
