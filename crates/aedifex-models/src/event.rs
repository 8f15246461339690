//! Discrete emotional events extracted from the timeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spectrum::EmotionSpectrum;

/// Kind of moment an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionEventType {
    /// A chunk begins.
    Start,
    /// A chunk ends.
    End,
    /// Peak of the structural track.
    LocalMaximum,
    /// Trough of the structural track.
    LocalMinimum,
    /// A flat structural section begins.
    Sustain,
}

impl EmotionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionEventType::Start => "start",
            EmotionEventType::End => "end",
            EmotionEventType::LocalMaximum => "local_maximum",
            EmotionEventType::LocalMinimum => "local_minimum",
            EmotionEventType::Sustain => "sustain",
        }
    }

    /// Extrema of the structural track.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EmotionEventType::LocalMaximum | EmotionEventType::LocalMinimum
        )
    }
}

impl fmt::Display for EmotionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scored, timestamped marker on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEvent {
    pub event_type: EmotionEventType,
    /// Normalized time in `[0, 1]`.
    pub timestamp: f64,
    pub intensity: f64,
    pub track_index: usize,
    pub chunk_index: usize,
    /// The chunk is separated from its neighbour by a long gap (or has none).
    pub chunk_delimits_segment: bool,
    /// Harmony number delta against the previous chunk on the same track.
    pub harmonic_difference: i32,
    /// Emotion carried by the chunk at the event instant.
    pub associated_emotion: EmotionSpectrum,
}

impl EmotionEvent {
    pub fn new(event_type: EmotionEventType, timestamp: f64, intensity: f64) -> Self {
        Self {
            event_type,
            timestamp,
            intensity,
            track_index: 0,
            chunk_index: 0,
            chunk_delimits_segment: false,
            harmonic_difference: 0,
            associated_emotion: EmotionSpectrum::zero(),
        }
    }

    /// Builder: set the source track and chunk.
    pub fn with_source(mut self, track_index: usize, chunk_index: usize) -> Self {
        self.track_index = track_index;
        self.chunk_index = chunk_index;
        self
    }

    /// Builder: mark as delimiting a segment.
    pub fn with_delimiter(mut self, delimits: bool) -> Self {
        self.chunk_delimits_segment = delimits;
        self
    }

    /// Builder: set the harmonic difference.
    pub fn with_harmonic_difference(mut self, difference: i32) -> Self {
        self.harmonic_difference = difference;
        self
    }

    /// Builder: attach the associated emotion.
    pub fn with_emotion(mut self, emotion: EmotionSpectrum) -> Self {
        self.associated_emotion = emotion;
        self
    }

    pub fn is_structural(&self) -> bool {
        self.event_type.is_structural()
    }
}

impl fmt::Display for EmotionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{:.4} (intensity {:.3}, track {}, chunk {})",
            self.event_type, self.timestamp, self.intensity, self.track_index, self.chunk_index
        )
    }
}
