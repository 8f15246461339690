//! Random draws shared by the scheduler consumers, strategies and director.
//!
//! Every draw takes the caller's generator explicitly so a seeded run is
//! reproducible end to end.

use std::f64::consts::PI;

use nalgebra::Vector3;
use rand::{Rng, RngCore};

/// Uniform value in `[min, max)`. Returns `min` for an empty range.
pub fn random_range(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    min + (max - min) * rng.random::<f64>()
}

/// `1.0` or `-1.0` with equal probability.
pub fn random_sign(rng: &mut dyn RngCore) -> f64 {
    if rng.random_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

/// Uniformly distributed unit vector.
pub fn on_unit_sphere(rng: &mut dyn RngCore) -> Vector3<f64> {
    let z = random_range(rng, -1.0, 1.0);
    let phi = random_range(rng, 0.0, 2.0 * PI);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Index drawn with probability proportional to its weight.
///
/// Non-positive and non-finite weights never win. Returns `None` when no
/// weight is positive.
pub fn select_weighted_index(weights: &[f64], rng: &mut dyn RngCore) -> Option<usize> {
    let usable = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|w| usable(*w)).sum();
    if total <= 0.0 {
        return None;
    }

    let mut value = rng.random::<f64>() * total;
    let mut last_positive = None;
    for (index, weight) in weights.iter().enumerate() {
        let w = usable(*weight);
        if w <= 0.0 {
            continue;
        }
        last_positive = Some(index);
        value -= w;
        if value <= 0.0 {
            return Some(index);
        }
    }

    // Rounding can leave a sliver of value at the end.
    last_positive
}

/// Item drawn with probability proportional to `weight(item)`.
pub fn select_weighted<'a, T>(
    items: &'a [T],
    weight: impl Fn(&T) -> f64,
    rng: &mut dyn RngCore,
) -> Option<&'a T> {
    let weights: Vec<f64> = items.iter().map(weight).collect();
    select_weighted_index(&weights, rng).map(|i| &items[i])
}
