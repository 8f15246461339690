//! Cut timing: how long a shot may last after its trigger event.

use aedifex_models::{CoreEmotion, EmotionEvent, EmotionEventType};
use rand::RngCore;

use crate::sampling::random_range;
use crate::signal::EmotionEngine;

/// Normalized window after the trigger in which the cut should land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutRange {
    pub min: f64,
    pub max: f64,
}

/// Authored `(min, max)` ranges in seconds, each drawn uniformly.
fn emotion_ranges(emotion: CoreEmotion) -> ((f64, f64), (f64, f64)) {
    match emotion {
        CoreEmotion::Joy => ((1.0, 2.0), (7.0, 8.0)),
        CoreEmotion::Trust => ((2.0, 5.0), (7.0, 10.0)),
        CoreEmotion::Fear => ((1.0, 2.0), (4.0, 6.0)),
        CoreEmotion::Surprise => ((0.25, 0.5), (1.0, 2.0)),
        CoreEmotion::Sadness => ((1.0, 1.5), (2.0, 4.0)),
        CoreEmotion::Disgust => ((1.0, 2.0), (3.0, 4.0)),
        CoreEmotion::Anger => ((0.1, 1.0), (1.0, 3.0)),
        CoreEmotion::Anticipation => ((0.2, 0.4), (1.0, 3.0)),
    }
}

/// Multiplier for the event type.
fn event_scale(event: &EmotionEvent) -> f64 {
    match event.event_type {
        // Longer when something shows up mid-segment.
        EmotionEventType::Start if !event.chunk_delimits_segment => 0.75,
        // Longer when something leaves for good.
        EmotionEventType::End if event.chunk_delimits_segment => 1.5,
        EmotionEventType::LocalMinimum => 2.0,
        _ => 1.0,
    }
}

/// Cut window for a shot starting on `event`.
///
/// # Arguments
/// * `event` - Trigger of the shot
/// * `engine` - Source of the emotion, structure and piece duration
/// * `rng` - Draws inside the authored ranges
///
/// # Returns
/// Ordered `(min, max)` offsets after the trigger, normalized by duration.
pub fn evaluate_cut_range(event: &EmotionEvent, engine: &EmotionEngine, rng: &mut dyn RngCore) -> CutRange {
    let emotion = engine.dominant_emotion(event.timestamp);
    let ((min_lo, min_hi), (max_lo, max_hi)) = emotion_ranges(emotion);
    let mut min = random_range(rng, min_lo, min_hi);
    let mut max = random_range(rng, max_lo, max_hi);

    let scale = event_scale(event);
    min *= scale;
    max *= scale;

    // Strong structure cuts faster.
    let structure = 1.0 - 0.5 * engine.structural_intensity(event.timestamp).clamp(0.0, 1.0);
    min *= structure;
    max *= structure;

    let min = min.max(0.01);
    let max = max.max(0.02);
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    let duration = engine.duration();
    CutRange {
        min: min / duration,
        max: max / duration,
    }
}

/// Weight of an event when picking where to cut.
pub fn event_priority(event: &EmotionEvent) -> f64 {
    let mut priority = event.intensity;
    if event.event_type.is_structural() {
        priority *= 2.0;
    }
    if event.event_type == EmotionEventType::Start {
        priority *= 1.25;
    }
    if event.chunk_delimits_segment {
        priority *= 1.75;
    }
    if event.harmonic_difference > 0 {
        priority *= 1.0 + 0.5 * event.harmonic_difference as f64;
    }
    priority
}
