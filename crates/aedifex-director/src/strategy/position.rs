//! Camera position search and composition shared by the strategies.

use nalgebra::{Point3, Vector2, Vector3};
use rand::RngCore;
use tracing::debug;

use super::StrategyContext;
use crate::camera::Composition;
use crate::config::StrategyConfig;
use crate::geometry::Ray;
use crate::interest::InterestPoint;
use crate::sampling::{on_unit_sphere, random_range};

const THIRDS: [f64; 3] = [1.0 / 3.0, 0.5, 2.0 / 3.0];

/// Accepted camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point3<f64>,
    /// Point on the subject the search ray left from.
    pub origin: Point3<f64>,
}

/// Blend the strategy bias with the subject's facing.
fn ray_direction(bias: Vector3<f64>, subject: &InterestPoint) -> Vector3<f64> {
    let bias = bias.try_normalize(1e-12).unwrap_or_else(Vector3::y);
    let d = subject.directionality.clamp(0.0, 1.0);
    let blended = bias * (1.0 - d) + subject.forward() * d;
    blended.try_normalize(1e-12).unwrap_or(bias)
}

/// Cast rays away from the subject until one lands a visible position.
///
/// Each attempt starts on the subject's scaled sphere, shoots along the
/// biased direction and keeps a random distance inside the band, short of any
/// hit. A reciprocal ray from the candidate back toward the subject must not
/// be blocked before it reaches the start point.
///
/// # Returns
/// `None` after `position_attempts` failed rays.
pub fn find_camera_position(
    ctx: &mut StrategyContext<'_>,
    subject: &InterestPoint,
    min_distance: f64,
    max_distance: f64,
    bias: fn(&mut dyn RngCore) -> Vector3<f64>,
) -> Option<Placement> {
    let extents = subject.half_extents();

    for _ in 0..ctx.config.position_attempts {
        let offset = on_unit_sphere(ctx.rng).component_mul(&extents);
        let origin = subject.position + offset;
        let direction = ray_direction(bias(ctx.rng), subject);
        let ray = Ray::new(origin, direction);

        let distance = match ctx.scene.raycast(&ray, max_distance) {
            Some(hit) if hit.distance > min_distance && hit.distance < max_distance => {
                random_range(ctx.rng, min_distance, hit.distance)
            }
            Some(_) => continue,
            None => random_range(ctx.rng, min_distance, max_distance),
        };
        let position = ray.at(distance);

        // Non-convex geometry can hide the subject from the far side.
        let back = Ray::new(position, -ray.direction);
        let visible = match ctx.scene.raycast(&back, max_distance) {
            Some(hit) => hit.distance >= distance - 1e-6,
            None => true,
        };
        if visible {
            return Some(Placement { position, origin });
        }
    }

    debug!(
        subject = subject.id,
        attempts = ctx.config.position_attempts,
        "No camera position found"
    );
    None
}

/// Rule-of-thirds composition with a random column and dead zone.
pub fn propose_composition(rng: &mut dyn RngCore, config: &StrategyConfig) -> Composition {
    let column = THIRDS[(random_range(rng, 0.0, THIRDS.len() as f64) as usize).min(THIRDS.len() - 1)];
    Composition {
        screen_target: Vector2::new(column, 0.5),
        dead_zone_size: random_range(rng, 0.02, 0.1),
        field_of_view: config.field_of_view,
    }
}
