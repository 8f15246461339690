//! Emotion signal engine.
//!
//! Turns the authored timeline plus the audio length into a sampled emotion
//! signal, its smoothed variant, energies and the sorted event list.

mod engine;
pub mod events;
pub mod smoothing;

pub use engine::EmotionEngine;
pub use events::EventExtractor;
