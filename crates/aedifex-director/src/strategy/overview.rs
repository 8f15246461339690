//! Overview: wide shot from high above, panning across the screen plane.

use std::f64::consts::PI;

use aedifex_models::EmotionEvent;
use nalgebra::Vector3;
use rand::RngCore;

use super::dolly::DollyStrategy;
use super::{CameraStrategy, Framing, StrategyContext, StrategyKind, Subject};
use crate::camera::HandheldNoise;
use crate::config::StrategyConfig;
use crate::grid::FrustumQuery;
use crate::sampling::{on_unit_sphere, random_range};

const PAN_SPEED_MIN: f64 = 10.0;
const PAN_SPEED_MAX: f64 = 20.0;

/// Rays aim steeply upward.
fn sky_bias(rng: &mut dyn RngCore) -> Vector3<f64> {
    let mut r = on_unit_sphere(rng);
    r.y = 7.0;
    r * 1.5
}

/// Wide dolly that only pans.
#[derive(Debug, Clone)]
pub struct OverviewStrategy {
    dolly: DollyStrategy,
}

impl OverviewStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            dolly: DollyStrategy::new(config),
        }
    }

    pub fn speed(&self) -> f64 {
        self.dolly.speed()
    }

    pub fn movement_direction(&self) -> Vector3<f64> {
        self.dolly.movement_direction()
    }

    /// Distance band widened by the current energy.
    pub fn distance_band(ctx: &StrategyContext<'_>) -> (f64, f64) {
        let multiplier = 1.0 + ctx.engine.normalized_smooth_energy(ctx.time);
        (
            ctx.config.overview_min_distance * multiplier,
            ctx.config.overview_max_distance * multiplier,
        )
    }
}

impl CameraStrategy for OverviewStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Overview
    }

    fn propose(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        event: &EmotionEvent,
        subject: &Subject,
        duration: f64,
    ) -> bool {
        if duration <= 0.0 {
            return false;
        }
        self.dolly.speed = ctx.engine.smooth_energy(event.timestamp) * 4.0 / duration;
        let (min, max) = Self::distance_band(ctx);
        self.dolly.framing.propose(ctx, subject, duration, min, max, sky_bias)
    }

    fn evaluate(&mut self, ctx: &StrategyContext<'_>, event: &EmotionEvent, framed: &FrustumQuery) -> f64 {
        self.dolly.evaluate(ctx, event, framed)
    }

    fn start(&mut self, ctx: &mut StrategyContext<'_>) {
        self.dolly.start(ctx);
        self.dolly.damping = (0.4, 0.4);
        self.dolly.keep_attention = false;

        let angle = random_range(ctx.rng, 0.0, 2.0 * PI);
        let pose = &self.dolly.framing.pose;
        self.dolly.movement_direction = (pose.right() * angle.cos() + pose.up() * angle.sin())
            .try_normalize(1e-12)
            .unwrap_or_else(|| pose.right());

        let energy = ctx.engine.normalized_smooth_energy(ctx.time).clamp(0.0, 1.0);
        self.dolly.speed = PAN_SPEED_MIN + (PAN_SPEED_MAX - PAN_SPEED_MIN) * energy;

        let amplitude = random_range(ctx.rng, 0.3, 0.6);
        let frequency = random_range(ctx.rng, 0.5, 1.0);
        self.dolly.framing.noise = HandheldNoise::new(amplitude, frequency);
    }

    fn update(&mut self, _ctx: &StrategyContext<'_>, camera_time: f64) {
        self.dolly.advance(camera_time);
    }

    fn stop(&mut self) {
        self.dolly.stop();
    }

    fn framing(&self) -> &Framing {
        self.dolly.framing()
    }

    fn damping(&self) -> (f64, f64) {
        self.dolly.damping()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::GridConfig;
    use crate::geometry::OpenScene;
    use crate::grid::InterestPointGrid;
    use crate::interest::InterestPoint;
    use crate::strategy::test_support;

    #[test]
    fn test_overview_pans_high_and_wide() {
        let engine = test_support::engine();
        let grid = InterestPointGrid::new(&GridConfig::default().with_resolution(4)).unwrap();
        let points = BTreeMap::new();
        let config = StrategyConfig::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut ctx = StrategyContext {
            engine: &engine,
            grid: &grid,
            points: &points,
            scene: &OpenScene,
            rng: &mut rng,
            config: &config,
            time: 0.25,
        };

        let subject = Subject::new(InterestPoint::new(1, Point3::origin()), false);
        let mut overview = OverviewStrategy::new(&config);
        assert!(overview.propose(&mut ctx, &test_support::event(), &subject, 0.1));

        let (min, max) = OverviewStrategy::distance_band(&ctx);
        assert!(min >= 95.0 && max <= 280.0);
        let position = overview.pose().position;
        let distance = (position - subject.point.position).norm();
        assert!(distance >= min - 1.0 && distance <= max + 1.0);
        assert!(position.y > 0.0);

        overview.start(&mut ctx);
        assert!((PAN_SPEED_MIN..=PAN_SPEED_MAX).contains(&overview.speed()));
        // Pans in the screen plane.
        assert!(overview.movement_direction().dot(&overview.pose().forward()).abs() < 1e-9);

        let noise = overview.noise();
        assert!((0.3..0.6).contains(&noise.amplitude));
        assert!((0.5..1.0).contains(&noise.frequency));

        let orientation = overview.pose().orientation;
        overview.update(&ctx, 0.5);
        assert_eq!(overview.pose().orientation, orientation);
        assert_eq!(overview.damping(), (0.4, 0.4));
        // Panning does not pick up the dolly's anticipation shake.
        assert_eq!(overview.noise(), noise);
    }
}
