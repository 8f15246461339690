//! Error types for the director pipeline.

use aedifex_models::ModelError;
use thiserror::Error;

/// Result type for director operations.
pub type DirectorResult<T> = Result<T, DirectorError>;

/// Errors raised while building the signal engine or configuring the director.
///
/// Runtime failures (no camera position, no future event group) are not
/// errors: they are retried by the director and never stop playback.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("Empty signal: {samples} samples at downsample rate {downsample_rate}")]
    EmptySignal {
        samples: usize,
        downsample_rate: usize,
    },

    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),

    #[error("Invalid downsample rate: must be at least 1")]
    InvalidDownsampleRate,

    #[error("Structure track '{0}' has no chunks")]
    EmptyStructureTrack(String),

    #[error("Invalid intensity {intensity} for {event_type} event on track {track_index} chunk {chunk_index}")]
    InvalidEventIntensity {
        event_type: String,
        track_index: usize,
        chunk_index: usize,
        intensity: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl DirectorError {
    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
