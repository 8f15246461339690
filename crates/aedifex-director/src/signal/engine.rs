//! Precomputed emotion signal over the whole piece.

use std::collections::{BTreeMap, VecDeque};

use aedifex_models::{
    CoreEmotion, DataContainer, EmotionEvent, EmotionSpectrum, StructureType, TrackChunkData,
    TrackData,
};
use tracing::{debug, info, warn};

use super::events::EventExtractor;
use super::smoothing::{moving_average, smooth_spectra};
use crate::config::SignalConfig;
use crate::error::{DirectorError, DirectorResult};

/// Emotion signal engine.
///
/// Construction runs the full precompute pass; once built, the engine is
/// read-only and can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct EmotionEngine {
    container: DataContainer,
    config: SignalConfig,
    /// Piece length in seconds.
    duration: f64,
    track_lookup: BTreeMap<String, usize>,
    structural_track: Option<usize>,

    spectrum: Vec<EmotionSpectrum>,
    smooth_spectrum: Vec<EmotionSpectrum>,
    derivative: Vec<EmotionSpectrum>,
    energy: Vec<f64>,
    smooth_energy: Vec<f64>,
    min_energy: f64,
    max_energy: f64,

    events: Vec<EmotionEvent>,
}

impl EmotionEngine {
    /// Build the engine from an audio buffer.
    ///
    /// Only the buffer length matters: it sets the number of signal samples.
    pub fn new(
        container: DataContainer,
        audio: &[f32],
        duration: f64,
        config: SignalConfig,
    ) -> DirectorResult<Self> {
        Self::from_sample_count(container, audio.len(), duration, config)
    }

    /// Build the engine from a raw audio sample count.
    ///
    /// # Arguments
    /// * `container` - Authored timeline, validated here
    /// * `audio_samples` - Number of raw audio samples
    /// * `duration` - Piece length in seconds
    /// * `config` - Sampling and event heuristics
    ///
    /// # Errors
    /// Zero downsample rate, non-positive duration, an empty signal, an invalid
    /// container, a structure track without chunks or a non-finite event
    /// intensity.
    pub fn from_sample_count(
        mut container: DataContainer,
        audio_samples: usize,
        duration: f64,
        config: SignalConfig,
    ) -> DirectorResult<Self> {
        if config.downsample_rate == 0 {
            return Err(DirectorError::InvalidDownsampleRate);
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DirectorError::InvalidDuration(duration));
        }
        let sample_count = audio_samples / config.downsample_rate;
        if sample_count == 0 {
            return Err(DirectorError::EmptySignal {
                samples: audio_samples,
                downsample_rate: config.downsample_rate,
            });
        }
        container.validate()?;

        // 1. Preload shaping curves
        container.preload();

        // 2. Track lookup
        let track_lookup: BTreeMap<String, usize> = container
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let structural_track = match container.structural_track() {
            Some((index, track)) => {
                if track.chunks.is_empty() {
                    return Err(DirectorError::EmptyStructureTrack(track.id.clone()));
                }
                Some(index)
            }
            None => {
                warn!("No structure track, structural events and scaling are disabled");
                None
            }
        };

        // 3. Events
        let mut events = EventExtractor::new(&config, &container, duration).extract(&container)?;

        // 4. Spectrum signal and derivative
        let dt = 1.0 / sample_count as f64;
        let spectrum: Vec<EmotionSpectrum> = (0..sample_count)
            .map(|i| compute_spectrum(&container.tracks, i as f64 * dt))
            .collect();

        let mut derivative = Vec::with_capacity(sample_count);
        derivative.push(EmotionSpectrum::zero());
        for pair in spectrum.windows(2) {
            derivative.push(&(&pair[1] - &pair[0]) / dt);
        }

        // 5. Smoothed spectrum over a beat-based window
        let window_normalized = config.smoothing_beats * container.beat_duration() / duration;
        let window = ((window_normalized * sample_count as f64).round() as usize).max(1);
        let smooth_spectrum = smooth_spectra(&spectrum, window);

        // 6. Energies
        let energy: Vec<f64> = spectrum.iter().map(|s| s.total_energy()).collect();
        let smooth_energy = moving_average(&energy, window);

        // 7. Extremes
        let min_energy = energy.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_energy = energy.iter().cloned().fold(0.0, f64::max);

        // 8. Stable sort by timestamp
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        debug!(
            sample_count,
            smoothing_window = window,
            "Emotion signal sampled"
        );
        info!(
            tracks = container.tracks.len(),
            events = events.len(),
            sample_count,
            min_energy,
            max_energy,
            "Emotion engine precomputed"
        );

        Ok(Self {
            container,
            config,
            duration,
            track_lookup,
            structural_track,
            spectrum,
            smooth_spectrum,
            derivative,
            energy,
            smooth_energy,
            min_energy,
            max_energy,
            events,
        })
    }

    fn index_for(&self, t: f64) -> usize {
        let n = self.spectrum.len();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        ((t * n as f64).floor() as usize).min(n - 1)
    }

    /// Emotion at normalized time `t`.
    pub fn spectrum(&self, t: f64) -> &EmotionSpectrum {
        &self.spectrum[self.index_for(t)]
    }

    /// Beat-smoothed emotion at normalized time `t`.
    pub fn smooth_spectrum(&self, t: f64) -> &EmotionSpectrum {
        &self.smooth_spectrum[self.index_for(t)]
    }

    /// Rate of change of the emotion per unit normalized time.
    pub fn spectrum_derivative(&self, t: f64) -> &EmotionSpectrum {
        &self.derivative[self.index_for(t)]
    }

    pub fn energy(&self, t: f64) -> f64 {
        self.energy[self.index_for(t)]
    }

    pub fn smooth_energy(&self, t: f64) -> f64 {
        self.smooth_energy[self.index_for(t)]
    }

    /// Smooth energy relative to the loudest raw sample, in `[0, 1]` for
    /// ordinary material.
    pub fn normalized_smooth_energy(&self, t: f64) -> f64 {
        if self.max_energy <= 0.0 {
            return 0.0;
        }
        self.smooth_energy(t) / self.max_energy
    }

    pub fn min_energy(&self) -> f64 {
        self.min_energy
    }

    pub fn max_energy(&self) -> f64 {
        self.max_energy
    }

    /// Core emotion dominating the spectrum at `t`.
    pub fn dominant_emotion(&self, t: f64) -> CoreEmotion {
        self.spectrum(t).dominant_emotion()
    }

    /// Sorted events.
    pub fn events(&self) -> &[EmotionEvent] {
        &self.events
    }

    /// A fresh FIFO of the sorted events.
    pub fn events_as_queue(&self) -> VecDeque<EmotionEvent> {
        self.events.iter().cloned().collect()
    }

    /// Structural chunk active at `t`.
    pub fn current_structure_data(&self, t: f64) -> Option<&TrackChunkData> {
        let index = self.structural_track?;
        self.container.tracks[index].chunk_at(t).map(|(_, chunk)| chunk)
    }

    /// Direction of the structure track at `t`.
    pub fn current_structure(&self, t: f64) -> StructureType {
        self.current_structure_data(t)
            .map(|chunk| chunk.structure_at(t))
            .unwrap_or(StructureType::None)
    }

    /// Shaping curve value of the active structural chunk, 0 when none.
    pub fn structural_intensity(&self, t: f64) -> f64 {
        self.current_structure_data(t)
            .map(|chunk| chunk.intensity_at(t))
            .unwrap_or(0.0)
    }

    pub fn track_by_id(&self, id: &str) -> Option<&TrackData> {
        self.track_lookup.get(id).map(|&i| &self.container.tracks[i])
    }

    /// Emotion contributed by one track at `t`.
    pub fn track_spectrum(&self, id: &str, t: f64) -> Option<EmotionSpectrum> {
        let track = self.track_by_id(id)?;
        let mut result = EmotionSpectrum::zero();
        for chunk in track.chunks.iter().filter(|c| c.contains(t)) {
            result += &chunk.evaluate(t);
        }
        Some(result)
    }

    pub fn container(&self) -> &DataContainer {
        &self.container
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Piece length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn sample_count(&self) -> usize {
        self.spectrum.len()
    }

    /// One beat in seconds.
    pub fn beat_duration(&self) -> f64 {
        self.container.beat_duration()
    }

    pub fn beat_duration_normalized(&self) -> f64 {
        self.beat_duration() / self.duration
    }

    pub fn measure_duration_normalized(&self) -> f64 {
        self.container.measure_duration() / self.duration
    }
}

/// Sum of every chunk active at `t`.
fn compute_spectrum(tracks: &[TrackData], t: f64) -> EmotionSpectrum {
    let mut result = EmotionSpectrum::zero();
    for chunk in tracks.iter().flat_map(|track| track.chunks.iter()) {
        if chunk.contains(t) {
            result += &chunk.evaluate(t);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use aedifex_models::{EmotionData, IntensityCurve, TrackCategory};

    fn melody_container() -> DataContainer {
        let data = EmotionData::from_vectors(vec![CoreEmotion::Fear.vector()]);
        DataContainer::new().with_track(
            TrackData::new("melody", TrackCategory::MainMelody).with_chunk(TrackChunkData::new(
                0.0,
                0.5,
                data,
                IntensityCurve::LinearIncreasing,
            )),
        )
    }

    fn config() -> SignalConfig {
        SignalConfig::default().with_downsample_rate(10)
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            EmotionEngine::from_sample_count(melody_container(), 100, 10.0, SignalConfig::default().with_downsample_rate(0)),
            Err(DirectorError::InvalidDownsampleRate)
        ));
        assert!(matches!(
            EmotionEngine::from_sample_count(melody_container(), 100, 0.0, config()),
            Err(DirectorError::InvalidDuration(_))
        ));
        assert!(matches!(
            EmotionEngine::from_sample_count(melody_container(), 5, 10.0, config()),
            Err(DirectorError::EmptySignal { .. })
        ));
    }

    #[test]
    fn test_empty_structure_track_is_an_error() {
        let container = melody_container().with_track(TrackData::new("s", TrackCategory::Structure));
        assert!(matches!(
            EmotionEngine::from_sample_count(container, 1000, 10.0, config()),
            Err(DirectorError::EmptyStructureTrack(_))
        ));
    }

    #[test]
    fn test_missing_structure_track_is_not_fatal() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        assert_eq!(engine.current_structure(0.3), StructureType::None);
        assert_eq!(engine.structural_intensity(0.3), 0.0);
        assert!(engine.current_structure_data(0.3).is_none());
    }

    #[test]
    fn test_queries_clamp_time() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        assert_eq!(engine.sample_count(), 100);
        assert_eq!(engine.energy(-1.0), engine.energy(0.0));
        assert_eq!(engine.energy(2.0), engine.energy(0.999));
        assert_eq!(engine.energy(f64::NAN), engine.energy(0.0));
    }

    #[test]
    fn test_energy_follows_curve() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        assert!(engine.energy(0.4) > engine.energy(0.1));
        assert_eq!(engine.energy(0.8), 0.0);
        assert_eq!(engine.min_energy(), 0.0);
        assert!(engine.max_energy() >= engine.energy(0.45));
        assert!(engine.normalized_smooth_energy(0.45) <= 1.0);
    }

    #[test]
    fn test_derivative_zero_at_start() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        assert_eq!(engine.spectrum_derivative(0.0).total_energy(), 0.0);
        assert!(engine.spectrum_derivative(0.25).total_energy() > 0.0);
    }

    #[test]
    fn test_dominant_emotion_and_track_spectrum() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        assert_eq!(engine.dominant_emotion(0.4), CoreEmotion::Fear);
        assert_eq!(engine.dominant_emotion(0.9), CoreEmotion::Joy);
        let track = engine.track_spectrum("melody", 0.25).unwrap();
        assert!(track.total_energy() > 0.0);
        assert!(engine.track_spectrum("missing", 0.25).is_none());
    }

    #[test]
    fn test_events_sorted() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 10.0, config()).unwrap();
        let queue = engine.events_as_queue();
        assert_eq!(queue.len(), 2);
        assert!(queue
            .iter()
            .zip(queue.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp));
    }

    #[test]
    fn test_normalized_durations() {
        let engine = EmotionEngine::from_sample_count(melody_container(), 1000, 60.0, config()).unwrap();
        assert!((engine.beat_duration() - 0.6).abs() < 1e-12);
        assert!((engine.beat_duration_normalized() - 0.01).abs() < 1e-12);
        assert!((engine.measure_duration_normalized() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmotionEngine>();
    }
}
