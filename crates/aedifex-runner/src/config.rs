//! Runner configuration.

use std::path::PathBuf;

use aedifex_director::AedifexConfig;

use crate::error::{RunnerError, RunnerResult};

/// Named director preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    Fast,
    #[default]
    Balanced,
    Quality,
}

impl Preset {
    /// Parse a preset name; unknown names map to `Balanced`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "fast" => Self::Fast,
            "quality" => Self::Quality,
            _ => Self::Balanced,
        }
    }

    pub fn config(self) -> AedifexConfig {
        match self {
            Self::Fast => AedifexConfig::fast(),
            Self::Balanced => AedifexConfig::default(),
            Self::Quality => AedifexConfig::quality(),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path of the track container JSON
    pub container_path: PathBuf,
    /// Optional scene JSON with interest points and blockers
    pub scene_path: Option<PathBuf>,
    /// Audio duration in seconds
    pub duration_secs: f64,
    /// Audio sample rate, used to derive the sample count
    pub sample_rate: usize,
    /// Simulation ticks per second
    pub tick_hz: f64,
    /// Director seed
    pub seed: u64,
    pub preset: Preset,
}

impl RunnerConfig {
    /// Create a config for a container with default playback settings.
    pub fn new(container_path: impl Into<PathBuf>) -> Self {
        Self {
            container_path: container_path.into(),
            scene_path: None,
            duration_secs: 180.0,
            sample_rate: 44_100,
            tick_hz: 30.0,
            seed: 0,
            preset: Preset::default(),
        }
    }

    pub fn with_scene(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene_path = Some(path.into());
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_tick_hz(mut self, tick_hz: f64) -> Self {
        self.tick_hz = tick_hz;
        self
    }

    /// Create config from environment variables.
    ///
    /// # Errors
    /// `ConfigError` when `AEDIFEX_CONTAINER` is unset or a value is out of range.
    pub fn from_env() -> RunnerResult<Self> {
        let container_path = std::env::var("AEDIFEX_CONTAINER")
            .map_err(|_| RunnerError::config_error("AEDIFEX_CONTAINER must be set"))?;

        let config = Self {
            container_path: PathBuf::from(container_path),
            scene_path: std::env::var("AEDIFEX_SCENE").ok().map(PathBuf::from),
            duration_secs: std::env::var("AEDIFEX_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(180.0),
            sample_rate: std::env::var("AEDIFEX_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(44_100),
            tick_hz: std::env::var("AEDIFEX_TICK_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30.0),
            seed: std::env::var("AEDIFEX_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            preset: std::env::var("AEDIFEX_PRESET")
                .map(|s| Preset::parse(&s))
                .unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check playback settings.
    pub fn validate(&self) -> RunnerResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(RunnerError::config_error("duration must be positive"));
        }
        if self.sample_rate == 0 {
            return Err(RunnerError::config_error("sample rate must be positive"));
        }
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 {
            return Err(RunnerError::config_error("tick rate must be positive"));
        }
        Ok(())
    }

    /// Audio samples covered by the piece.
    pub fn sample_count(&self) -> usize {
        (self.duration_secs * self.sample_rate as f64).round() as usize
    }

    /// Director configuration: preset plus seed.
    pub fn director_config(&self) -> AedifexConfig {
        self.preset.config().with_seed(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parse() {
        assert_eq!(Preset::parse("FAST"), Preset::Fast);
        assert_eq!(Preset::parse(" quality "), Preset::Quality);
        assert_eq!(Preset::parse("whatever"), Preset::Balanced);
    }

    #[test]
    fn test_sample_count() {
        let config = RunnerConfig::new("c.json").with_duration(2.5);
        assert_eq!(config.sample_count(), 110_250);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunnerConfig::new("c.json").validate().is_ok());
        assert!(RunnerConfig::new("c.json").with_duration(0.0).validate().is_err());
        assert!(RunnerConfig::new("c.json").with_tick_hz(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_director_config_carries_seed() {
        let config = RunnerConfig::new("c.json").with_seed(77);
        assert_eq!(config.director_config().director.seed, 77);
    }
}
