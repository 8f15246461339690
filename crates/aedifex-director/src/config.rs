//! Configuration for the director pipeline.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{DirectorError, DirectorResult};

/// Emotion signal engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Audio samples folded into one spectrum sample.
    pub downsample_rate: usize,

    /// Width of the smoothing window, in beats.
    pub smoothing_beats: f64,

    // ============================================
    // Event heuristics (all gaps in measures)
    // ============================================
    /// Gap after which a chunk is considered to open or close a segment.
    pub segment_gap_measures: f64,

    /// Gap over which the time-proximity bonus falls to zero.
    pub time_falloff_measures: f64,

    /// Gap after which a returning chunk gets the nostalgia bonus.
    pub nostalgia_gap_measures: f64,

    /// Multiplier applied by the nostalgia bonus.
    pub nostalgia_factor: f64,

    /// Base of the harmonic factor (`base^|Δharmony|`).
    pub harmonic_base: f64,

    /// Time impact below which the harmonic factor is suppressed.
    pub harmonic_time_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            downsample_rate: 1024,
            smoothing_beats: 4.0,
            segment_gap_measures: 4.0,
            time_falloff_measures: 2.0,
            nostalgia_gap_measures: 12.0,
            nostalgia_factor: 1.5,
            harmonic_base: 1.2,
            harmonic_time_threshold: 0.45,
        }
    }
}

impl SignalConfig {
    /// Coarser sampling for quick previews.
    pub fn fast() -> Self {
        Self {
            downsample_rate: 4096,
            ..Default::default()
        }
    }

    /// Finer sampling for final runs.
    pub fn quality() -> Self {
        Self {
            downsample_rate: 256,
            ..Default::default()
        }
    }

    /// Builder: set the downsample rate.
    pub fn with_downsample_rate(mut self, rate: usize) -> Self {
        self.downsample_rate = rate;
        self
    }

    /// Builder: set the smoothing window in beats.
    pub fn with_smoothing_beats(mut self, beats: f64) -> Self {
        self.smoothing_beats = beats;
        self
    }
}

/// Event scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Buckets per beat.
    pub resolution_per_beat: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resolution_per_beat: 8,
        }
    }
}

impl SchedulerConfig {
    /// Builder: set buckets per beat.
    pub fn with_resolution_per_beat(mut self, resolution: u32) -> Self {
        self.resolution_per_beat = resolution;
        self
    }
}

/// Interest point grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cells per axis.
    pub resolution: usize,
    pub bounds_min: Point3<f64>,
    pub bounds_max: Point3<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            bounds_min: Point3::new(-512.0, -512.0, -512.0),
            bounds_max: Point3::new(512.0, 512.0, 512.0),
        }
    }
}

impl GridConfig {
    /// Builder: set the grid resolution.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Builder: set the covered volume.
    pub fn with_bounds(mut self, min: Point3<f64>, max: Point3<f64>) -> Self {
        self.bounds_min = min;
        self.bounds_max = max;
        self
    }
}

/// Shot strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    // ============================================
    // Position search
    // ============================================
    /// Closest camera distance from the subject.
    pub min_distance: f64,

    /// Farthest camera distance from the subject.
    pub max_distance: f64,

    /// Rays cast before giving up on a proposal.
    pub position_attempts: usize,

    /// Overview distance band before the energy multiplier.
    pub overview_min_distance: f64,
    pub overview_max_distance: f64,

    // ============================================
    // Projection
    // ============================================
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
    pub aspect_ratio: f64,
    pub near_clip: f64,
    pub far_clip: f64,

    // ============================================
    // Scoring
    // ============================================
    /// Maximum number of framed points counted by the score.
    pub frustum_count_cap: usize,

    /// Score weight when the subject is primary.
    pub primary_weight: f64,

    /// Score weight when the subject is secondary. Higher than primary so that
    /// lesser subjects win by framing more of the scene.
    pub secondary_weight: f64,

    // ============================================
    // Strategy selection
    // ============================================
    pub dolly_weight: f64,
    pub orbit_weight: f64,
    pub overview_weight: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_distance: 10.0,
            max_distance: 100.0,
            position_attempts: 50,
            overview_min_distance: 95.0,
            overview_max_distance: 140.0,
            field_of_view: 60.0,
            aspect_ratio: 16.0 / 9.0,
            near_clip: 0.01,
            far_clip: 500.0,
            frustum_count_cap: 8,
            primary_weight: 0.25,
            secondary_weight: 0.75,
            dolly_weight: 1.0,
            orbit_weight: 1.0,
            overview_weight: 0.5,
        }
    }
}

impl StrategyConfig {
    /// Builder: set the camera distance band.
    pub fn with_distance_band(mut self, min: f64, max: f64) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    /// Builder: set strategy selection weights.
    pub fn with_weights(mut self, dolly: f64, orbit: f64, overview: f64) -> Self {
        self.dolly_weight = dolly;
        self.orbit_weight = orbit;
        self.overview_weight = overview;
        self
    }

    /// Builder: set the field of view in degrees.
    pub fn with_field_of_view(mut self, degrees: f64) -> Self {
        self.field_of_view = degrees;
        self
    }
}

/// Shot director settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorConfig {
    /// Seed of the director's random stream.
    pub seed: u64,

    /// Strategy samples per proposal.
    pub max_strategy_samples: usize,

    /// Subject draws before a proposal gives up.
    pub subject_attempts: usize,

    /// Growth of the cut search window per failed attempt.
    pub retry_bias_step: f64,

    /// Upper bound on the retry bias.
    pub max_retry_bias: f64,

    /// Top fraction of ranked interest points treated as primary subjects.
    pub primary_subject_fraction: f64,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_strategy_samples: 8,
            subject_attempts: 16,
            retry_bias_step: 0.5,
            max_retry_bias: 8.0,
            primary_subject_fraction: 0.25,
        }
    }
}

impl DirectorConfig {
    /// Builder: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder: set the number of strategy samples per proposal.
    pub fn with_strategy_samples(mut self, samples: usize) -> Self {
        self.max_strategy_samples = samples;
        self
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AedifexConfig {
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub director: DirectorConfig,
}

impl AedifexConfig {
    /// Preview preset: coarse signal sampling and fewer strategy samples.
    pub fn fast() -> Self {
        Self {
            signal: SignalConfig::fast(),
            director: DirectorConfig::default().with_strategy_samples(4),
            ..Default::default()
        }
    }

    /// Final-run preset: fine signal sampling and more strategy samples.
    pub fn quality() -> Self {
        Self {
            signal: SignalConfig::quality(),
            director: DirectorConfig::default().with_strategy_samples(12),
            ..Default::default()
        }
    }

    /// Builder: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.director.seed = seed;
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> DirectorResult<()> {
        if self.signal.downsample_rate == 0 {
            return Err(DirectorError::InvalidDownsampleRate);
        }
        if self.signal.smoothing_beats < 0.0 {
            return Err(DirectorError::invalid_config("smoothing_beats must not be negative"));
        }
        if self.scheduler.resolution_per_beat == 0 {
            return Err(DirectorError::invalid_config("resolution_per_beat must be positive"));
        }
        if self.grid.resolution == 0 {
            return Err(DirectorError::invalid_config("grid resolution must be positive"));
        }
        let extent = self.grid.bounds_max - self.grid.bounds_min;
        if extent.iter().any(|e| *e <= 0.0) {
            return Err(DirectorError::invalid_config("grid bounds must have positive extent"));
        }
        let s = &self.strategy;
        if s.min_distance < 0.0 || s.max_distance <= s.min_distance {
            return Err(DirectorError::invalid_config(format!(
                "distance band [{}, {}] is empty",
                s.min_distance, s.max_distance
            )));
        }
        if s.field_of_view <= 0.0 || s.field_of_view >= 180.0 {
            return Err(DirectorError::invalid_config("field_of_view must be in (0, 180)"));
        }
        if s.near_clip <= 0.0 || s.far_clip <= s.near_clip {
            return Err(DirectorError::invalid_config("clip planes must satisfy 0 < near < far"));
        }
        if [s.dolly_weight, s.orbit_weight, s.overview_weight]
            .iter()
            .all(|w| *w <= 0.0)
        {
            return Err(DirectorError::invalid_config("at least one strategy weight must be positive"));
        }
        let d = &self.director;
        if d.max_strategy_samples == 0 || d.subject_attempts == 0 {
            return Err(DirectorError::invalid_config("sample and attempt counts must be positive"));
        }
        if !(0.0..=1.0).contains(&d.primary_subject_fraction) {
            return Err(DirectorError::invalid_config("primary_subject_fraction must be in [0, 1]"));
        }
        Ok(())
    }
}
