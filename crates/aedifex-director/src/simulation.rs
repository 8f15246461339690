//! Headless playback driver: ties engine, scheduler, director and scene.

use std::sync::Arc;

use tracing::info;

use crate::camera::CameraPose;
use crate::config::AedifexConfig;
use crate::director::{DirectorContext, ShotDirector, ShotRecord};
use crate::error::{DirectorError, DirectorResult};
use crate::geometry::SceneGeometry;
use crate::interest::InterestPoint;
use crate::scheduler::{EventListener, EventScheduler};
use crate::signal::EmotionEngine;

/// Camera sample produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Playback time in seconds.
    pub time_secs: f64,
    pub pose: Option<CameraPose>,
}

/// Frame-driven playback of a whole piece.
pub struct Simulation {
    engine: Arc<EmotionEngine>,
    scheduler: EventScheduler,
    director: ShotDirector,
    scene: Box<dyn SceneGeometry>,
    /// Playback time in seconds.
    time_secs: f64,
}

impl Simulation {
    /// Wire a simulation around a built engine.
    ///
    /// # Errors
    /// Invalid scheduler or director configuration.
    pub fn new(
        engine: Arc<EmotionEngine>,
        scene: Box<dyn SceneGeometry>,
        config: &AedifexConfig,
    ) -> DirectorResult<Self> {
        let scheduler = EventScheduler::new(&engine, &config.scheduler)?;
        let director = ShotDirector::new(config)?;
        Ok(Self {
            engine,
            scheduler,
            director,
            scene,
            time_secs: 0.0,
        })
    }

    /// Register interest points. Returns how many landed inside the grid.
    pub fn add_interest_points(&mut self, points: impl IntoIterator<Item = InterestPoint>) -> usize {
        points
            .into_iter()
            .map(|p| self.director.register_interest_point(p))
            .filter(|added| *added)
            .count()
    }

    pub fn engine(&self) -> &Arc<EmotionEngine> {
        &self.engine
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn director(&self) -> &ShotDirector {
        &self.director
    }

    pub fn time_secs(&self) -> f64 {
        self.time_secs
    }

    /// Normalized playback time.
    pub fn time_normalized(&self) -> f64 {
        (self.time_secs / self.engine.duration()).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.time_secs >= self.engine.duration()
    }

    /// Advance playback by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> CameraFrame {
        self.time_secs += dt.max(0.0);
        let time = self.time_normalized();

        let batch = self.scheduler.update(time);
        batch.deliver(&mut self.director as &mut dyn EventListener);

        let ctx = DirectorContext {
            engine: &self.engine,
            scheduler: &self.scheduler,
            scene: self.scene.as_ref(),
            time,
        };
        let pose = self.director.update(&ctx, dt);

        CameraFrame {
            time_secs: self.time_secs,
            pose,
        }
    }

    /// Play the whole piece at `tick_hz` ticks per second.
    ///
    /// # Errors
    /// `InvalidConfig` for a non-positive tick rate.
    pub fn run(&mut self, tick_hz: f64) -> DirectorResult<&[ShotRecord]> {
        if !tick_hz.is_finite() || tick_hz <= 0.0 {
            return Err(DirectorError::invalid_config("tick rate must be positive"));
        }
        let dt = 1.0 / tick_hz;
        let mut ticks = 0usize;
        while !self.is_finished() {
            self.tick(dt);
            ticks += 1;
        }

        info!(
            ticks,
            shots = self.director.history().len(),
            repeated = self.director.history().iter().filter(|r| r.repeated).count(),
            duration_secs = self.engine.duration(),
            "Playback finished"
        );
        Ok(self.director.history())
    }
}
