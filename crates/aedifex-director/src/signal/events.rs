//! Event extraction from the authored timeline.
//!
//! Ordinary tracks produce a Start and an End event per chunk. The structure
//! track produces one shape event per chunk (Sustain, LocalMaximum or
//! LocalMinimum). Intensities are heuristics over chunk energy, neighbour gaps,
//! variation and harmony changes.

use aedifex_models::{
    DataContainer, EmotionEvent, EmotionEventType, IntensityCurve, TrackChunkData, TrackData,
};
use tracing::error;

use crate::config::SignalConfig;
use crate::error::{DirectorError, DirectorResult};

const EPSILON: f64 = 1e-6;

/// Extracts events from a preloaded container.
pub struct EventExtractor<'a> {
    config: &'a SignalConfig,
    /// One measure in normalized time.
    measure_normalized: f64,
}

impl<'a> EventExtractor<'a> {
    pub fn new(config: &'a SignalConfig, container: &DataContainer, duration: f64) -> Self {
        Self {
            config,
            measure_normalized: container.measure_duration() / duration,
        }
    }

    /// Extract every event, unsorted.
    ///
    /// # Errors
    /// `InvalidEventIntensity` if a heuristic produces a non-finite value.
    pub fn extract(&self, container: &DataContainer) -> DirectorResult<Vec<EmotionEvent>> {
        let mut events = Vec::new();

        for (track_index, track) in container.tracks.iter().enumerate() {
            let order = chunk_order(track);
            for (position, &chunk_index) in order.iter().enumerate() {
                let prev = position
                    .checked_sub(1)
                    .map(|p| &track.chunks[order[p]]);
                let next = order.get(position + 1).map(|&n| &track.chunks[n]);
                let chunk = &track.chunks[chunk_index];

                if track.is_structural() {
                    events.push(self.structural_event(chunk, prev, next, track_index, chunk_index));
                } else {
                    events.push(self.start_event(chunk, prev, track_index, chunk_index));
                    events.push(self.end_event(chunk, prev, next, track_index, chunk_index));
                }
            }
        }

        for event in &events {
            if !event.intensity.is_finite() {
                error!(
                    event = %event,
                    "Non-finite event intensity, timeline data is corrupted"
                );
                return Err(DirectorError::InvalidEventIntensity {
                    event_type: event.event_type.to_string(),
                    track_index: event.track_index,
                    chunk_index: event.chunk_index,
                    intensity: event.intensity,
                });
            }
        }

        Ok(events)
    }

    /// Gap between two normalized times, in measures, never negative.
    fn gap_measures(&self, from: f64, to: f64) -> f64 {
        ((to - from) / self.measure_normalized).max(0.0)
    }

    fn opens_segment(&self, chunk: &TrackChunkData, prev: Option<&TrackChunkData>) -> bool {
        match prev {
            Some(prev) => self.gap_measures(prev.end, chunk.start) > self.config.segment_gap_measures,
            None => true,
        }
    }

    fn closes_segment(&self, chunk: &TrackChunkData, next: Option<&TrackChunkData>) -> bool {
        match next {
            Some(next) => self.gap_measures(chunk.end, next.start) > self.config.segment_gap_measures,
            None => true,
        }
    }

    /// Intensity of a chunk's Start event.
    ///
    /// Factors apply in a fixed order: first chunk, then (with a predecessor)
    /// variation change, time gap with nostalgia, harmony change, and the
    /// value jump against the predecessor's end.
    pub fn start_intensity(&self, chunk: &TrackChunkData, prev: Option<&TrackChunkData>) -> f64 {
        let value = chunk.value_at(chunk.start);
        let mut intensity = value;

        let prev = match prev {
            Some(prev) => prev,
            None => return intensity * 2.0,
        };

        // 1. Variation flag flipped
        if prev.is_variation != chunk.is_variation {
            intensity *= 2.0;
        }

        // 2. Time proximity, with a bonus for long-awaited returns
        let gap = self.gap_measures(prev.end, chunk.start);
        let time_impact = 1.0 - (gap / self.config.time_falloff_measures).clamp(0.0, 1.0);
        intensity *= 1.0 + time_impact;
        if gap > self.config.nostalgia_gap_measures {
            intensity *= self.config.nostalgia_factor;
        }

        // 3. Harmony change, only meaningful when the chunks are close
        let harmonic_difference = chunk.harmony_sequence_number - prev.harmony_sequence_number;
        if time_impact >= self.config.harmonic_time_threshold {
            intensity *= self.config.harmonic_base.powi(harmonic_difference.abs());
        }

        // 4. Jump in value across the boundary
        let prev_value = prev.value_at(prev.end);
        let denominator = value.max(prev_value).max(EPSILON);
        intensity *= 1.0 + (value - prev_value).abs() / denominator;

        intensity
    }

    /// Intensity of a chunk's End event.
    pub fn end_intensity(&self, chunk: &TrackChunkData, next: Option<&TrackChunkData>) -> f64 {
        let value = chunk.value_at(chunk.end);
        if self.closes_segment(chunk, next) {
            value * 2.0
        } else {
            value
        }
    }

    fn start_event(
        &self,
        chunk: &TrackChunkData,
        prev: Option<&TrackChunkData>,
        track_index: usize,
        chunk_index: usize,
    ) -> EmotionEvent {
        EmotionEvent::new(
            EmotionEventType::Start,
            chunk.start,
            self.start_intensity(chunk, prev),
        )
        .with_source(track_index, chunk_index)
        .with_delimiter(self.opens_segment(chunk, prev))
        .with_harmonic_difference(harmonic_difference(chunk, prev))
        .with_emotion(chunk.evaluate(chunk.start))
    }

    fn end_event(
        &self,
        chunk: &TrackChunkData,
        prev: Option<&TrackChunkData>,
        next: Option<&TrackChunkData>,
        track_index: usize,
        chunk_index: usize,
    ) -> EmotionEvent {
        EmotionEvent::new(EmotionEventType::End, chunk.end, self.end_intensity(chunk, next))
            .with_source(track_index, chunk_index)
            .with_delimiter(self.closes_segment(chunk, next))
            .with_harmonic_difference(harmonic_difference(chunk, prev))
            .with_emotion(chunk.evaluate(chunk.end))
    }

    fn structural_event(
        &self,
        chunk: &TrackChunkData,
        prev: Option<&TrackChunkData>,
        next: Option<&TrackChunkData>,
        track_index: usize,
        chunk_index: usize,
    ) -> EmotionEvent {
        let (event_type, timestamp) = match chunk.intensity_curve {
            IntensityCurve::Invariant => (EmotionEventType::Sustain, chunk.start),
            IntensityCurve::LinearIncreasing => (EmotionEventType::LocalMaximum, chunk.end),
            IntensityCurve::LinearDecreasing => (EmotionEventType::LocalMinimum, chunk.end),
            IntensityCurve::SmoothSpike => (
                EmotionEventType::LocalMaximum,
                chunk.start + chunk.duration() * 0.5,
            ),
        };

        let delimits = match event_type {
            EmotionEventType::Sustain => self.opens_segment(chunk, prev),
            _ => self.closes_segment(chunk, next),
        };

        EmotionEvent::new(event_type, timestamp, chunk.value_at(peak_time(chunk)))
            .with_source(track_index, chunk_index)
            .with_delimiter(delimits)
            .with_harmonic_difference(harmonic_difference(chunk, prev))
            .with_emotion(chunk.evaluate(timestamp))
    }
}

/// Chunk indices ordered by start time (authored order breaks ties).
fn chunk_order(track: &TrackData) -> Vec<usize> {
    let mut order: Vec<usize> = (0..track.chunks.len()).collect();
    order.sort_by(|a, b| track.chunks[*a].start.total_cmp(&track.chunks[*b].start));
    order
}

fn harmonic_difference(chunk: &TrackChunkData, prev: Option<&TrackChunkData>) -> i32 {
    prev.map(|p| chunk.harmony_sequence_number - p.harmony_sequence_number)
        .unwrap_or(0)
}

/// Time at which the chunk's shaping curve peaks.
fn peak_time(chunk: &TrackChunkData) -> f64 {
    match chunk.intensity_curve {
        IntensityCurve::Invariant | IntensityCurve::LinearDecreasing => chunk.start,
        IntensityCurve::LinearIncreasing => chunk.end,
        IntensityCurve::SmoothSpike => chunk.start + chunk.duration() * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aedifex_models::{CoreEmotion, EmotionData, TrackCategory};

    // 120 bpm, 4/4: one measure is 2 s; over 100 s that is 0.02 normalized.
    const DURATION: f64 = 100.0;
    const MEASURE: f64 = 0.02;

    fn data() -> EmotionData {
        EmotionData::from_vectors(vec![CoreEmotion::Trust.vector()])
    }

    fn container(tracks: Vec<TrackData>) -> DataContainer {
        let mut container = DataContainer::new().with_tempo(120.0, 4);
        container.tracks = tracks;
        container.preload();
        container
    }

    fn chunk(start: f64, end: f64) -> TrackChunkData {
        let mut c = TrackChunkData::new(start, end, data(), IntensityCurve::Invariant);
        c.preload();
        c
    }

    #[test]
    fn test_first_chunk_doubles() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let first = chunk(0.1, 0.2);
        assert!((extractor.start_intensity(&first, None) - 2.0 * first.value_at(0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_adjacent_chunk_gets_full_time_impact() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let prev = chunk(0.1, 0.2);
        let next = chunk(0.2, 0.3);
        let v = next.value_at(0.2);
        // No gap: time impact 1, no harmony change, equal values.
        assert!((extractor.start_intensity(&next, Some(&prev)) - 2.0 * v).abs() < 1e-9);
    }

    #[test]
    fn test_factor_order_with_variation_and_harmony() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let prev = chunk(0.1, 0.2);
        // Half a measure gap: time impact 0.75.
        let mut next = chunk(0.2 + MEASURE * 0.5, 0.4)
            .with_variation(true)
            .with_harmony(2);
        next.preload();
        let v = next.value_at(next.start);
        let expected = v * 2.0 * 1.75 * 1.2f64.powi(2);
        assert!((extractor.start_intensity(&next, Some(&prev)) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_harmony_suppressed_by_large_gap() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let prev = chunk(0.1, 0.2);
        // 1.5 measures: time impact 0.25, below the 0.45 threshold.
        let mut next = chunk(0.2 + MEASURE * 1.5, 0.4).with_harmony(3);
        next.preload();
        let v = next.value_at(next.start);
        assert!((extractor.start_intensity(&next, Some(&prev)) - v * 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_nostalgia_bonus() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let prev = chunk(0.0, 0.1);
        let next = chunk(0.1 + MEASURE * 13.0, 0.5);
        let v = next.value_at(next.start);
        assert!((extractor.start_intensity(&next, Some(&prev)) - v * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_value_jump_factor() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let mut prev = TrackChunkData::new(0.1, 0.2, data(), IntensityCurve::LinearDecreasing);
        prev.preload();
        let next = chunk(0.2, 0.3);
        let v = next.value_at(0.2);
        // Previous ends at zero, so the jump factor is 2; time impact adds 2.
        assert!((extractor.start_intensity(&next, Some(&prev)) - v * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_doubles_on_segment_close() {
        let config = SignalConfig::default();
        let c = container(vec![]);
        let extractor = EventExtractor::new(&config, &c, DURATION);
        let a = chunk(0.0, 0.1);
        let close = chunk(0.1 + MEASURE, 0.3);
        let far = chunk(0.1 + MEASURE * 5.0, 0.3);
        let v = a.value_at(0.1);
        assert!((extractor.end_intensity(&a, Some(&close)) - v).abs() < 1e-9);
        assert!((extractor.end_intensity(&a, Some(&far)) - 2.0 * v).abs() < 1e-9);
        assert!((extractor.end_intensity(&a, None) - 2.0 * v).abs() < 1e-9);
    }

    #[test]
    fn test_structural_events() {
        let config = SignalConfig::default();
        let mut structure = TrackData::new("structure", TrackCategory::Structure);
        structure.chunks = vec![
            TrackChunkData::new(0.0, 0.25, data(), IntensityCurve::Invariant),
            TrackChunkData::new(0.25, 0.5, data(), IntensityCurve::LinearIncreasing),
            TrackChunkData::new(0.5, 0.75, data(), IntensityCurve::LinearDecreasing),
            TrackChunkData::new(0.75, 1.0, data(), IntensityCurve::SmoothSpike),
        ];
        let c = container(vec![structure]);
        let events = EventExtractor::new(&config, &c, DURATION).extract(&c).unwrap();

        let kinds: Vec<(EmotionEventType, f64)> =
            events.iter().map(|e| (e.event_type, e.timestamp)).collect();
        assert_eq!(
            kinds,
            vec![
                (EmotionEventType::Sustain, 0.0),
                (EmotionEventType::LocalMaximum, 0.5),
                (EmotionEventType::LocalMinimum, 0.75),
                (EmotionEventType::LocalMaximum, 0.875),
            ]
        );
        assert!(events.iter().all(|e| e.intensity > 0.0));
    }

    #[test]
    fn test_ordinary_track_emits_start_and_end() {
        let config = SignalConfig::default();
        let mut melody = TrackData::new("melody", TrackCategory::MainMelody);
        melody.chunks = vec![chunk(0.5, 0.6), chunk(0.1, 0.2)];
        let c = container(vec![melody]);
        let events = EventExtractor::new(&config, &c, DURATION).extract(&c).unwrap();
        assert_eq!(events.len(), 4);

        // Chunk 1 starts first, so it is the track's first chunk.
        let first_start = events
            .iter()
            .find(|e| e.event_type == EmotionEventType::Start && e.chunk_index == 1)
            .unwrap();
        assert!(first_start.chunk_delimits_segment);
        assert!((first_start.intensity - 2.0 * c.tracks[0].chunks[1].value_at(0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_intensity_is_an_error() {
        let config = SignalConfig::default();
        let mut melody = TrackData::new("melody", TrackCategory::MainMelody);
        let data = EmotionData::from_vectors(vec![CoreEmotion::Joy.vector()]).with_multiplier(f64::INFINITY);
        melody.chunks = vec![TrackChunkData::new(0.0, 0.5, data, IntensityCurve::Invariant)];
        let c = container(vec![melody]);
        let result = EventExtractor::new(&config, &c, DURATION).extract(&c);
        assert!(matches!(result, Err(DirectorError::InvalidEventIntensity { .. })));
    }
}
