//! Orbit: arc around the subject with a slight zoom.

use std::f64::consts::PI;

use aedifex_models::EmotionEvent;
use nalgebra::{Point3, Vector3};
use rand::RngCore;

use super::{CameraStrategy, Framing, StrategyContext, StrategyKind, Subject};
use crate::camera::HandheldNoise;
use crate::config::StrategyConfig;
use crate::sampling::{on_unit_sphere, random_range, random_sign};

const ORBIT_AMPLITUDE: f64 = PI / 8.0;

/// Orbits sit a bit higher than the subject.
fn raised_bias(rng: &mut dyn RngCore) -> Vector3<f64> {
    let mut r = on_unit_sphere(rng);
    r.y = (r.y + 0.5) * 2.0;
    r
}

#[derive(Debug, Clone)]
pub struct OrbitStrategy {
    framing: Framing,
    initial_angle: f64,
    /// Horizontal distance to the subject at the start of the shot.
    initial_radius: f64,
    /// Height above the subject, kept through the orbit.
    height: f64,
    end_radius_ratio: f64,
    direction: f64,
}

impl OrbitStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            framing: Framing::new(config),
            initial_angle: 0.0,
            initial_radius: 0.0,
            height: 0.0,
            end_radius_ratio: 1.0,
            direction: 1.0,
        }
    }

    fn center(&self) -> Point3<f64> {
        self.framing
            .subject
            .as_ref()
            .map(|s| s.point.position)
            .unwrap_or(self.framing.initial_position)
    }

    /// Position on the arc at normalized shot time `t`.
    pub fn position_at(&self, t: f64) -> Point3<f64> {
        let angle = self.initial_angle + ORBIT_AMPLITUDE * t * self.direction;
        let radius = self.initial_radius + (self.initial_radius * self.end_radius_ratio - self.initial_radius) * t;
        self.center() + Vector3::new(angle.cos() * radius, self.height, angle.sin() * radius)
    }
}

impl CameraStrategy for OrbitStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Orbit
    }

    fn propose(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        _event: &EmotionEvent,
        subject: &Subject,
        duration: f64,
    ) -> bool {
        let (min, max) = (ctx.config.min_distance, ctx.config.max_distance);
        if !self.framing.propose(ctx, subject, duration, min, max, raised_bias) {
            return false;
        }

        let offset = self.framing.initial_position - subject.point.position;
        self.initial_radius = offset.x.hypot(offset.z);
        self.height = offset.y;
        self.initial_angle = offset.z.atan2(offset.x);
        true
    }

    fn start(&mut self, ctx: &mut StrategyContext<'_>) {
        self.end_radius_ratio = random_range(ctx.rng, 0.8, 1.2);
        self.direction = random_sign(ctx.rng);
        self.framing.noise = HandheldNoise::new(random_range(ctx.rng, 0.0, 0.2), 0.75);
        self.update(ctx, 0.0);
    }

    fn update(&mut self, _ctx: &StrategyContext<'_>, camera_time: f64) {
        let position = self.position_at(camera_time);
        self.framing.pose.position = position;
        self.framing.pose.orientation = self.framing.aim(&position);
    }

    fn framing(&self) -> &Framing {
        &self.framing
    }

    fn damping(&self) -> (f64, f64) {
        (0.4, 0.5)
    }
}
