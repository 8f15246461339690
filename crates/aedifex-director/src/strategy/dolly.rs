//! Dolly: straight-line camera travel.

use aedifex_models::{CoreEmotion, EmotionEvent, EmotionSpectrum, StructureType};
use nalgebra::Vector3;
use rand::{Rng, RngCore};

use super::{CameraStrategy, Framing, StrategyContext, StrategyKind, Subject};
use crate::camera::HandheldNoise;
use crate::config::StrategyConfig;
use crate::grid::FrustumQuery;
use crate::sampling::{on_unit_sphere, select_weighted_index};

const POSITION_DAMPING: f64 = 0.05;
const ROTATION_DAMPING: f64 = 0.1;
const NOISE_FREQUENCY: f64 = 0.7;
const MAX_NOISE: f64 = 0.2;

pub(super) fn sphere_bias(rng: &mut dyn RngCore) -> Vector3<f64> {
    on_unit_sphere(rng)
}

/// Camera travelling along one direction at an energy-driven speed.
#[derive(Debug, Clone)]
pub struct DollyStrategy {
    pub(super) framing: Framing,
    pub(super) movement_direction: Vector3<f64>,
    /// World axis toward the importance-weighted centroid of framed points.
    pub(super) main_interest_axis: Vector3<f64>,
    pub(super) speed: f64,
    /// Re-aim at the subject every frame.
    pub(super) keep_attention: bool,
    pub(super) damping: (f64, f64),
}

impl DollyStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            framing: Framing::new(config),
            movement_direction: Vector3::zeros(),
            main_interest_axis: Vector3::zeros(),
            speed: 0.0,
            keep_attention: false,
            damping: (POSITION_DAMPING, ROTATION_DAMPING),
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn movement_direction(&self) -> Vector3<f64> {
        self.movement_direction
    }

    pub fn keeps_attention(&self) -> bool {
        self.keep_attention
    }

    /// Move along the travel line to normalized shot time `camera_time`.
    pub(super) fn advance(&mut self, camera_time: f64) {
        let position = self.framing.initial_position + self.movement_direction * self.speed * camera_time;
        self.framing.pose.position = position;
        if self.keep_attention {
            self.framing.pose.orientation = self.framing.aim(&position);
        }
    }

    /// Shake grows with anticipation in the music.
    fn anticipation_noise(ctx: &StrategyContext<'_>) -> HandheldNoise {
        let expectation = ctx
            .engine
            .spectrum(ctx.time)
            .dot(EmotionSpectrum::core(CoreEmotion::Anticipation));
        HandheldNoise::new((expectation * 0.5).clamp(0.0, MAX_NOISE), NOISE_FREQUENCY)
    }

    /// Direction toward the importance-weighted average of framed points,
    /// flattened onto the view plane.
    fn interest_axis(&self, ctx: &StrategyContext<'_>, framed: &FrustumQuery) -> Vector3<f64> {
        let pose = &self.framing.pose;
        let mut average = Vector3::zeros();
        for id in &framed.ids {
            if let Some(point) = ctx.points.get(id) {
                average += pose.to_camera_space(&point.position).coords * point.importance as f64;
            }
        }
        average.z = 0.0;
        match average.try_normalize(1e-12) {
            Some(local) => pose.orientation * local,
            None => Vector3::zeros(),
        }
    }

    /// Weighted candidate directions drawn from at start.
    fn candidate_directions(&self, structure: StructureType) -> Vec<(Vector3<f64>, f64)> {
        let mut candidates = vec![(self.main_interest_axis, 0.5)];

        if let Some(subject) = &self.framing.subject {
            let point = &subject.point;
            let extents = point.item_bounds().size();
            let axis = extents.try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
            candidates.push((point.right() * axis.x, axis.x));
            candidates.push((point.up() * axis.y, axis.y));
            candidates.push((point.forward() * axis.z, axis.z));
        }

        let in_out = if structure == StructureType::Decreasing { -1.0 } else { 1.0 };
        candidates.push((self.framing.pose.forward() * in_out, 0.5));

        // A zero axis has nowhere to go.
        candidates.retain(|(direction, _)| direction.norm_squared() > 1e-18);
        candidates
    }
}

impl CameraStrategy for DollyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dolly
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
        self.speed = ctx.engine.smooth_energy(event.timestamp) * 4.0 / duration;
        let (min, max) = (ctx.config.min_distance, ctx.config.max_distance);
        self.framing.propose(ctx, subject, duration, min, max, sphere_bias)
    }

    fn evaluate(&mut self, ctx: &StrategyContext<'_>, _event: &EmotionEvent, framed: &FrustumQuery) -> f64 {
        self.main_interest_axis = self.interest_axis(ctx, framed);
        self.framing.score(ctx.config, framed)
    }

    fn start(&mut self, ctx: &mut StrategyContext<'_>) {
        self.damping = (POSITION_DAMPING, ROTATION_DAMPING);

        let candidates = self.candidate_directions(ctx.engine.current_structure(ctx.time));
        let weights: Vec<f64> = candidates.iter().map(|(_, w)| *w).collect();
        self.movement_direction = select_weighted_index(&weights, ctx.rng)
            .and_then(|i| candidates[i].0.try_normalize(1e-12))
            .unwrap_or_else(|| self.framing.pose.forward());

        self.keep_attention = ctx.rng.random::<f64>() > 0.5;
    }

    fn update(&mut self, ctx: &StrategyContext<'_>, camera_time: f64) {
        self.advance(camera_time);
        self.framing.noise = Self::anticipation_noise(ctx);
    }

    fn framing(&self) -> &Framing {
        &self.framing
    }

    fn damping(&self) -> (f64, f64) {
        self.damping
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use aedifex_models::EmotionEventType;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::GridConfig;
    use crate::geometry::OpenScene;
    use crate::grid::InterestPointGrid;
    use crate::interest::{InterestPoint, InterestPointId};
    use crate::strategy::test_support;

    struct Fixture {
        engine: crate::signal::EmotionEngine,
        grid: InterestPointGrid,
        points: BTreeMap<InterestPointId, InterestPoint>,
        config: StrategyConfig,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            let mut grid = InterestPointGrid::new(&GridConfig::default().with_resolution(8)).unwrap();
            let mut points = BTreeMap::new();
            for (id, x) in [(1, 0.0), (2, 4.0)] {
                let point = InterestPoint::new(id, Point3::new(x, 0.0, 0.0)).with_importance(2);
                grid.add(&point);
                points.insert(id, point);
            }
            Self {
                engine: test_support::engine(),
                grid,
                points,
                config: StrategyConfig::default(),
                rng: StdRng::seed_from_u64(21),
            }
        }

        fn ctx(&mut self) -> StrategyContext<'_> {
            StrategyContext {
                engine: &self.engine,
                grid: &self.grid,
                points: &self.points,
                scene: &OpenScene,
                rng: &mut self.rng,
                config: &self.config,
                time: 0.25,
            }
        }
    }

    #[test]
    fn test_speed_follows_energy_and_duration() {
        let mut fixture = Fixture::new();
        let subject = Subject::new(fixture.points[&1].clone(), true);
        let event = test_support::event();
        let mut dolly = DollyStrategy::new(&fixture.config);
        assert!(dolly.propose(&mut fixture.ctx(), &event, &subject, 0.1));
        let expected = fixture.engine.smooth_energy(event.timestamp) * 4.0 / 0.1;
        assert!((dolly.speed() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_empty_duration() {
        let mut fixture = Fixture::new();
        let subject = Subject::new(fixture.points[&1].clone(), true);
        let mut dolly = DollyStrategy::new(&fixture.config);
        assert!(!dolly.propose(&mut fixture.ctx(), &test_support::event(), &subject, 0.0));
    }

    #[test]
    fn test_moves_along_direction() {
        let mut fixture = Fixture::new();
        let subject = Subject::new(fixture.points[&1].clone(), true);
        let event = EmotionEvent::new(EmotionEventType::LocalMaximum, 0.5, 1.0);
        let mut dolly = DollyStrategy::new(&fixture.config);
        assert!(dolly.propose(&mut fixture.ctx(), &event, &subject, 0.2));
        dolly.start(&mut fixture.ctx());

        let direction = dolly.movement_direction();
        assert!((direction.norm() - 1.0).abs() < 1e-9);

        let ctx = fixture.ctx();
        dolly.update(&ctx, 0.0);
        let start = dolly.pose().position;
        dolly.update(&ctx, 0.5);
        let travelled = dolly.pose().position - start;
        assert!((travelled - direction * dolly.speed() * 0.5).norm() < 1e-9);
    }

    #[test]
    fn test_shake_follows_anticipation() {
        let mut fixture = Fixture::new();
        let subject = Subject::new(fixture.points[&1].clone(), true);
        let mut dolly = DollyStrategy::new(&fixture.config);
        assert!(dolly.propose(&mut fixture.ctx(), &test_support::event(), &subject, 0.2));
        dolly.start(&mut fixture.ctx());

        let ctx = fixture.ctx();
        dolly.update(&ctx, 0.5);
        let expectation = ctx
            .engine
            .spectrum(ctx.time)
            .dot(EmotionSpectrum::core(CoreEmotion::Anticipation));
        let noise = dolly.noise();
        assert_eq!(noise.frequency, NOISE_FREQUENCY);
        assert!((noise.amplitude - (expectation * 0.5).clamp(0.0, MAX_NOISE)).abs() < 1e-12);
        assert!((0.0..=MAX_NOISE).contains(&noise.amplitude));
    }

    #[test]
    fn test_interest_axis_points_at_framed_points() {
        let mut fixture = Fixture::new();
        let subject = Subject::new(fixture.points[&1].clone(), true);
        let mut dolly = DollyStrategy::new(&fixture.config);
        assert!(dolly.propose(&mut fixture.ctx(), &test_support::event(), &subject, 0.1));

        let ctx = fixture.ctx();
        let frustum = dolly.framing.projection.frustum(&dolly.pose());
        let framed = ctx.grid.frustum_query(&frustum);
        let score = dolly.evaluate(&ctx, &test_support::event(), &framed);
        assert!(score >= 1.0);
        if !framed.is_empty() {
            // Lies on the view plane.
            assert!(dolly.main_interest_axis.dot(&dolly.pose().forward()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decreasing_structure_reverses_in_out() {
        let config = StrategyConfig::default();
        let mut dolly = DollyStrategy::new(&config);
        dolly.framing.pose = crate::camera::CameraPose::looking_at(Point3::new(0.0, 0.0, 10.0), &Point3::origin());

        let rising = dolly.candidate_directions(StructureType::Increasing);
        let falling = dolly.candidate_directions(StructureType::Decreasing);
        let forward = dolly.framing.pose.forward();
        assert!((rising.last().unwrap().0 - forward).norm() < 1e-12);
        assert!((falling.last().unwrap().0 + forward).norm() < 1e-12);
    }
}
