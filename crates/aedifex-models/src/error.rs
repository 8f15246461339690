//! Error types for authored timeline data.

use thiserror::Error;

/// Result type for model validation and parsing.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating authored data.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid chunk {chunk_index} on track '{track_id}': {message}")]
    InvalidChunk {
        track_id: String,
        chunk_index: usize,
        message: String,
    },

    #[error("Invalid emotion vector: {0}")]
    InvalidVector(String),

    #[error("Invalid spectrum: expected {expected} bins, got {actual}")]
    InvalidSpectrum { expected: usize, actual: usize },

    #[error("Invalid tempo: {0}")]
    InvalidTempo(String),

    #[error("More than one structure track: '{first}' and '{second}'")]
    DuplicateStructureTrack { first: String, second: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Create an invalid chunk error.
    pub fn invalid_chunk(
        track_id: impl Into<String>,
        chunk_index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidChunk {
            track_id: track_id.into(),
            chunk_index,
            message: message.into(),
        }
    }

    /// Create an invalid tempo error.
    pub fn invalid_tempo(message: impl Into<String>) -> Self {
        Self::InvalidTempo(message.into())
    }
}
