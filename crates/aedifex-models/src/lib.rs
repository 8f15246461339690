//! Shared data models for the Aedifex camera director.
//!
//! This crate provides Serde-serializable types for:
//! - Emotion vectors, mixtures and sampled spectra
//! - Authored tracks, chunks and the timeline container
//! - Emotion events extracted from the timeline

pub mod emotion;
pub mod error;
pub mod event;
pub mod spectrum;
pub mod track;

// Re-export common types
pub use emotion::{CoreEmotion, EmotionData, EmotionVector, EMOTION_SIGMA};
pub use error::{ModelError, ModelResult};
pub use event::{EmotionEvent, EmotionEventType};
pub use spectrum::{EmotionSpectrum, BIN_WIDTH, SPECTRUM_RESOLUTION};
pub use track::{
    DataContainer, IntensityCurve, ShapingCurve, StructureType, TrackCategory, TrackChunkData,
    TrackData,
};
