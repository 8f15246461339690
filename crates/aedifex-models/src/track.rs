//! Authored timeline: tracks, chunks and the container that holds them.
//!
//! Time is normalized to `[0, 1]` over the whole piece. A chunk is a
//! time-bounded slice of a track with an emotion mixture and a shaping curve
//! that scales it over the chunk's lifetime.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionData;
use crate::error::{ModelError, ModelResult};
use crate::spectrum::EmotionSpectrum;

/// Authored shape of a chunk's intensity over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum IntensityCurve {
    #[default]
    Invariant,
    LinearIncreasing,
    LinearDecreasing,
    /// Rises to a peak at the midpoint, then falls.
    SmoothSpike,
}

impl IntensityCurve {
    /// Materialize the keyed curve for this shape.
    pub fn shaping(self) -> ShapingCurve {
        match self {
            IntensityCurve::Invariant => ShapingCurve::linear(vec![(0.0, 1.0), (1.0, 1.0)]),
            IntensityCurve::LinearIncreasing => ShapingCurve::linear(vec![(0.0, 0.0), (1.0, 1.0)]),
            IntensityCurve::LinearDecreasing => ShapingCurve::linear(vec![(0.0, 1.0), (1.0, 0.0)]),
            IntensityCurve::SmoothSpike => {
                ShapingCurve::smooth(vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)])
            }
        }
    }

    /// Structural reading of this curve at a chunk-local time.
    pub fn structure_at(self, local_time: f64) -> StructureType {
        match self {
            IntensityCurve::Invariant => StructureType::Sustain,
            IntensityCurve::LinearIncreasing => StructureType::Increasing,
            IntensityCurve::LinearDecreasing => StructureType::Decreasing,
            IntensityCurve::SmoothSpike => {
                if local_time < 0.5 {
                    StructureType::Increasing
                } else {
                    StructureType::Decreasing
                }
            }
        }
    }
}

/// Coarse direction of the structural track at a moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum StructureType {
    /// No structural track, or no structural chunk active.
    #[default]
    None,
    Sustain,
    Increasing,
    Decreasing,
}

/// Piecewise curve over `[0, 1]` defined by keys.
///
/// Segments interpolate linearly, or with a smoothstep ease when `smooth` is
/// set (flat tangents at every key).
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingCurve {
    keys: Vec<(f64, f64)>,
    smooth: bool,
}

impl ShapingCurve {
    pub fn linear(keys: Vec<(f64, f64)>) -> Self {
        Self {
            keys,
            smooth: false,
        }
    }

    pub fn smooth(keys: Vec<(f64, f64)>) -> Self {
        Self { keys, smooth: true }
    }

    /// Evaluate at `t`, clamped to the key range.
    pub fn evaluate(&self, t: f64) -> f64 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };

        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }

        for pair in self.keys.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t >= t0 && t <= t1 {
                let span = t1 - t0;
                let mut u = if span > 0.0 { (t - t0) / span } else { 1.0 };
                if self.smooth {
                    u = u * u * (3.0 - 2.0 * u);
                }
                return v0 + (v1 - v0) * u;
            }
        }

        last.1
    }
}

/// Cached per-chunk data built by [`TrackChunkData::preload`].
#[derive(Debug, Clone, PartialEq)]
struct PreloadedChunk {
    curve: ShapingCurve,
    spectrum: EmotionSpectrum,
}

/// A time-bounded slice of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackChunkData {
    /// Normalized start time.
    pub start: f64,
    /// Normalized end time, strictly greater than `start`.
    pub end: f64,
    #[serde(default)]
    pub start_data: EmotionData,
    #[serde(default)]
    pub intensity_curve: IntensityCurve,
    #[serde(default)]
    pub is_variation: bool,
    #[serde(default)]
    pub harmony_sequence_number: i32,

    #[serde(skip)]
    #[schemars(skip)]
    preloaded: Option<PreloadedChunk>,
}

impl TrackChunkData {
    pub fn new(start: f64, end: f64, start_data: EmotionData, intensity_curve: IntensityCurve) -> Self {
        Self {
            start,
            end,
            start_data,
            intensity_curve,
            is_variation: false,
            harmony_sequence_number: 0,
            preloaded: None,
        }
    }

    /// Builder: mark the chunk as a variation.
    pub fn with_variation(mut self, is_variation: bool) -> Self {
        self.is_variation = is_variation;
        self
    }

    /// Builder: set the harmony sequence number.
    pub fn with_harmony(mut self, harmony_sequence_number: i32) -> Self {
        self.harmony_sequence_number = harmony_sequence_number;
        self
    }

    /// Materialize the shaping curve and the base spectrum.
    ///
    /// Safe to call again after editing `start_data`; the cache is rebuilt.
    pub fn preload(&mut self) {
        self.preloaded = Some(PreloadedChunk {
            curve: self.intensity_curve.shaping(),
            spectrum: self.start_data.spectrum(false),
        });
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded.is_some()
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True if `t` lies in `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Map a global normalized time into `[0, 1]` chunk-local time.
    pub fn local_time(&self, t: f64) -> f64 {
        let span = self.duration();
        if span <= 0.0 {
            return 0.0;
        }
        ((t - self.start) / span).clamp(0.0, 1.0)
    }

    /// Shaping curve value at global time `t`.
    pub fn intensity_at(&self, t: f64) -> f64 {
        let local = self.local_time(t);
        match &self.preloaded {
            Some(cached) => cached.curve.evaluate(local),
            None => self.intensity_curve.shaping().evaluate(local),
        }
    }

    /// Base (unshaped) spectrum of the chunk.
    pub fn base_spectrum(&self) -> EmotionSpectrum {
        match &self.preloaded {
            Some(cached) => cached.spectrum.clone(),
            None => self.start_data.spectrum(false),
        }
    }

    /// Shaped spectrum contribution at global time `t`.
    pub fn evaluate(&self, t: f64) -> EmotionSpectrum {
        let factor = self.intensity_at(t);
        match &self.preloaded {
            Some(cached) => &cached.spectrum * factor,
            None => self.start_data.spectrum(false) * factor,
        }
    }

    /// Total energy of the shaped contribution at `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let base = match &self.preloaded {
            Some(cached) => cached.spectrum.total_energy(),
            None => self.start_data.spectrum(false).total_energy(),
        };
        base * self.intensity_at(t)
    }

    /// Structural reading of the chunk at global time `t`.
    pub fn structure_at(&self, t: f64) -> StructureType {
        self.intensity_curve.structure_at(self.local_time(t))
    }

    fn validate(&self, track_id: &str, index: usize) -> ModelResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ModelError::invalid_chunk(track_id, index, "bounds must be finite"));
        }
        if self.start < 0.0 || self.end > 1.0 {
            return Err(ModelError::invalid_chunk(
                track_id,
                index,
                format!("bounds [{}, {}] outside [0, 1]", self.start, self.end),
            ));
        }
        if self.start >= self.end {
            return Err(ModelError::invalid_chunk(
                track_id,
                index,
                format!("start {} is not before end {}", self.start, self.end),
            ));
        }
        if !self.start_data.intensity_multiplier.is_finite() {
            return Err(ModelError::invalid_chunk(
                track_id,
                index,
                "intensity multiplier must be finite",
            ));
        }
        for vector in &self.start_data.vectors {
            if !vector.angle.is_finite() {
                return Err(ModelError::InvalidVector(format!(
                    "non-finite angle on track '{}' chunk {}",
                    track_id, index
                )));
            }
            if !vector.intensity.is_finite() || vector.intensity < 0.0 {
                return Err(ModelError::InvalidVector(format!(
                    "intensity {} on track '{}' chunk {} must be finite and non-negative",
                    vector.intensity, track_id, index
                )));
            }
        }
        Ok(())
    }
}

/// Role of a track in the arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum TrackCategory {
    MainMelody,
    Rythm,
    Support,
    #[default]
    Misc,
    /// Drives rising/falling/sustain sections. At most one per container.
    Structure,
}

/// An ordered list of chunks with a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackData {
    pub id: String,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub category: TrackCategory,
    #[serde(default)]
    pub chunks: Vec<TrackChunkData>,
}

impl TrackData {
    pub fn new(id: impl Into<String>, category: TrackCategory) -> Self {
        let id = id.into();
        Self {
            track_name: id.clone(),
            id,
            category,
            chunks: Vec::new(),
        }
    }

    /// Builder: append a chunk.
    pub fn with_chunk(mut self, chunk: TrackChunkData) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn is_structural(&self) -> bool {
        self.category == TrackCategory::Structure
    }

    /// First chunk whose bounds contain `t`.
    pub fn chunk_at(&self, t: f64) -> Option<(usize, &TrackChunkData)> {
        self.chunks.iter().enumerate().find(|(_, c)| c.contains(t))
    }

    pub fn preload(&mut self) {
        for chunk in &mut self.chunks {
            chunk.preload();
        }
    }
}

fn default_beats_per_minute() -> f64 {
    100.0
}

fn default_beats_per_measure() -> u32 {
    4
}

/// The authored piece: every track plus tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataContainer {
    #[serde(default)]
    pub tracks: Vec<TrackData>,
    #[serde(default = "default_beats_per_minute")]
    pub beats_per_minute: f64,
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u32,
}

impl Default for DataContainer {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            beats_per_minute: default_beats_per_minute(),
            beats_per_measure: default_beats_per_measure(),
        }
    }
}

impl DataContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the tempo.
    pub fn with_tempo(mut self, beats_per_minute: f64, beats_per_measure: u32) -> Self {
        self.beats_per_minute = beats_per_minute;
        self.beats_per_measure = beats_per_measure;
        self
    }

    /// Builder: append a track.
    pub fn with_track(mut self, track: TrackData) -> Self {
        self.tracks.push(track);
        self
    }

    /// Parse and validate a container from JSON.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let container: DataContainer = serde_json::from_str(json)?;
        container.validate()?;
        Ok(container)
    }

    pub fn to_json_pretty(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON schema of the container format.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DataContainer)
    }

    /// Check tempo, chunk bounds, vector intensities and the structure track.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.beats_per_minute.is_finite() || self.beats_per_minute <= 0.0 {
            return Err(ModelError::invalid_tempo(format!(
                "beatsPerMinute must be positive, got {}",
                self.beats_per_minute
            )));
        }
        if self.beats_per_measure == 0 {
            return Err(ModelError::invalid_tempo("beatsPerMeasure must be positive"));
        }

        let mut structure: Option<&str> = None;
        for track in &self.tracks {
            if track.is_structural() {
                if let Some(first) = structure {
                    return Err(ModelError::DuplicateStructureTrack {
                        first: first.to_string(),
                        second: track.id.clone(),
                    });
                }
                structure = Some(&track.id);
            }

            for (index, chunk) in track.chunks.iter().enumerate() {
                chunk.validate(&track.id, index)?;
            }
        }

        Ok(())
    }

    /// Preload every chunk of every track.
    pub fn preload(&mut self) {
        for track in &mut self.tracks {
            track.preload();
        }
    }

    /// Length of one beat in seconds.
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.beats_per_minute
    }

    /// Length of one measure in seconds.
    pub fn measure_duration(&self) -> f64 {
        self.beat_duration() * self.beats_per_measure as f64
    }

    /// Index and data of the structure track, if any.
    pub fn structural_track(&self) -> Option<(usize, &TrackData)> {
        self.tracks.iter().enumerate().find(|(_, t)| t.is_structural())
    }

    pub fn track_by_id(&self, id: &str) -> Option<&TrackData> {
        self.tracks.iter().find(|t| t.id == id)
    }
}
