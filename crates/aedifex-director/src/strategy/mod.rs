//! Shot strategies.
//!
//! A strategy proposes a camera placement for a subject, scores it against
//! the interest points it frames and then animates the camera for the length
//! of the shot. Strategies are created through a [`StrategyFactory`] so the
//! director never names a concrete type.

mod dolly;
mod orbit;
mod overview;
mod position;

use std::collections::BTreeMap;
use std::fmt;

use aedifex_models::EmotionEvent;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::camera::{look_at_composed, CameraPose, Composition, HandheldNoise, Projection};
use crate::config::StrategyConfig;
use crate::geometry::SceneGeometry;
use crate::grid::{FrustumQuery, InterestPointGrid};
use crate::interest::{InterestPoint, InterestPointId};
use crate::sampling::select_weighted_index;
use crate::signal::EmotionEngine;

pub use dolly::DollyStrategy;
pub use orbit::OrbitStrategy;
pub use overview::OverviewStrategy;
pub use position::{find_camera_position, propose_composition, Placement};

/// Tag of a concrete strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Dolly,
    Orbit,
    Overview,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::Dolly, StrategyKind::Orbit, StrategyKind::Overview];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Dolly => "dolly",
            StrategyKind::Orbit => "orbit",
            StrategyKind::Overview => "overview",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chosen subject of a shot.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub point: InterestPoint,
    /// Ranked in the top fraction of interest points.
    pub primary: bool,
}

impl Subject {
    pub fn new(point: InterestPoint, primary: bool) -> Self {
        Self { point, primary }
    }

    pub fn id(&self) -> InterestPointId {
        self.point.id
    }
}

/// Everything a strategy may read or draw from.
pub struct StrategyContext<'a> {
    pub engine: &'a EmotionEngine,
    pub grid: &'a InterestPointGrid,
    pub points: &'a BTreeMap<InterestPointId, InterestPoint>,
    pub scene: &'a dyn SceneGeometry,
    pub rng: &'a mut dyn RngCore,
    pub config: &'a StrategyConfig,
    /// Normalized playback time.
    pub time: f64,
}

/// Placement and framing shared by every strategy.
#[derive(Debug, Clone)]
pub struct Framing {
    pub subject: Option<Subject>,
    /// Normalized shot duration.
    pub duration: f64,
    /// Placement found by the proposal.
    pub initial_position: Point3<f64>,
    pub pose: CameraPose,
    pub composition: Composition,
    pub projection: Projection,
    pub noise: HandheldNoise,
}

impl Framing {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            subject: None,
            duration: 0.0,
            initial_position: Point3::origin(),
            pose: CameraPose::default(),
            composition: Composition::default(),
            projection: Projection::from_config(config),
            noise: HandheldNoise::default(),
        }
    }

    /// Search a camera position in `[min_distance, max_distance]` and frame
    /// the subject from it.
    ///
    /// # Arguments
    /// * `bias` - Draws the strategy's preferred ray direction
    ///
    /// # Returns
    /// `false` when no visible position was found.
    pub fn propose(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        subject: &Subject,
        duration: f64,
        min_distance: f64,
        max_distance: f64,
        bias: fn(&mut dyn RngCore) -> Vector3<f64>,
    ) -> bool {
        self.subject = Some(subject.clone());
        self.duration = duration;
        self.projection = Projection::from_config(ctx.config);

        let placement = match find_camera_position(ctx, &subject.point, min_distance, max_distance, bias) {
            Some(placement) => placement,
            None => return false,
        };

        self.initial_position = placement.position;
        self.composition = propose_composition(ctx.rng, ctx.config);
        self.pose = CameraPose::new(placement.position, self.aim(&placement.position));
        true
    }

    /// Orientation at `position` that puts the subject on the composed target.
    pub fn aim(&self, position: &Point3<f64>) -> UnitQuaternion<f64> {
        match &self.subject {
            Some(subject) => {
                look_at_composed(position, &subject.point.position, &self.composition, &self.projection)
            }
            None => self.pose.orientation,
        }
    }

    /// `1 + avg_importance * min(count, cap) * weight`, weight chosen by the
    /// subject's role.
    pub fn score(&self, config: &StrategyConfig, framed: &FrustumQuery) -> f64 {
        let primary = self.subject.as_ref().map(|s| s.primary).unwrap_or(false);
        let weight = if primary {
            config.primary_weight
        } else {
            config.secondary_weight
        };
        let count = framed.len().min(config.frustum_count_cap) as f64;
        1.0 + framed.average_importance() * count * weight
    }
}

/// Pluggable pose proposal and per-frame animation.
pub trait CameraStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// Try to place the camera for `subject`. Failure is not fatal; the
    /// director drops the sample.
    fn propose(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        event: &EmotionEvent,
        subject: &Subject,
        duration: f64,
    ) -> bool;

    /// Score a successful proposal from the points its frustum contains.
    fn evaluate(&mut self, ctx: &StrategyContext<'_>, _event: &EmotionEvent, framed: &FrustumQuery) -> f64 {
        self.framing().score(ctx.config, framed)
    }

    /// Called once when the shot is committed.
    fn start(&mut self, ctx: &mut StrategyContext<'_>);

    /// Advance the camera. `camera_time` is elapsed shot time over duration.
    fn update(&mut self, ctx: &StrategyContext<'_>, camera_time: f64);

    /// Called when the shot is replaced.
    fn stop(&mut self) {}

    fn framing(&self) -> &Framing;

    /// Target pose for the shot camera.
    fn pose(&self) -> CameraPose {
        self.framing().pose
    }

    fn composition(&self) -> &Composition {
        &self.framing().composition
    }

    /// Handheld shake for the shot camera. Read every frame.
    fn noise(&self) -> HandheldNoise {
        self.framing().noise
    }

    /// Position and rotation damping times in seconds.
    fn damping(&self) -> (f64, f64);
}

/// Creates strategies by kind.
pub trait StrategyFactory: Send + Sync {
    fn create(&self, kind: StrategyKind, config: &StrategyConfig) -> Box<dyn CameraStrategy>;

    /// Draw a kind and create it.
    fn sample(&self, rng: &mut dyn RngCore, config: &StrategyConfig) -> Box<dyn CameraStrategy>;
}

/// Default factory: draws a kind from the configured weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedStrategyFactory;

impl WeightedStrategyFactory {
    pub fn new() -> Self {
        Self
    }

    fn weights(config: &StrategyConfig) -> [f64; 3] {
        [config.dolly_weight, config.orbit_weight, config.overview_weight]
    }
}

impl StrategyFactory for WeightedStrategyFactory {
    fn create(&self, kind: StrategyKind, config: &StrategyConfig) -> Box<dyn CameraStrategy> {
        match kind {
            StrategyKind::Dolly => Box::new(DollyStrategy::new(config)),
            StrategyKind::Orbit => Box::new(OrbitStrategy::new(config)),
            StrategyKind::Overview => Box::new(OverviewStrategy::new(config)),
        }
    }

    fn sample(&self, rng: &mut dyn RngCore, config: &StrategyConfig) -> Box<dyn CameraStrategy> {
        let kind = select_weighted_index(&Self::weights(config), rng)
            .map(|i| StrategyKind::ALL[i])
            .unwrap_or(StrategyKind::Dolly);
        self.create(kind, config)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use aedifex_models::{
        CoreEmotion, DataContainer, EmotionData, EmotionEvent, EmotionEventType, IntensityCurve,
        TrackCategory, TrackChunkData, TrackData,
    };

    use crate::config::SignalConfig;
    use crate::signal::EmotionEngine;

    /// Joyful piece with a rising structure track.
    pub fn engine() -> EmotionEngine {
        let joy = EmotionData::from_vectors(vec![CoreEmotion::Joy.vector()]);
        let container = DataContainer::new()
            .with_track(
                TrackData::new("structure", TrackCategory::Structure).with_chunk(TrackChunkData::new(
                    0.0,
                    1.0,
                    joy.clone(),
                    IntensityCurve::LinearIncreasing,
                )),
            )
            .with_track(
                TrackData::new("melody", TrackCategory::MainMelody).with_chunk(TrackChunkData::new(
                    0.0,
                    1.0,
                    joy,
                    IntensityCurve::Invariant,
                )),
            );
        EmotionEngine::from_sample_count(
            container,
            10_000,
            30.0,
            SignalConfig::default().with_downsample_rate(100),
        )
        .unwrap()
    }

    pub fn event() -> EmotionEvent {
        EmotionEvent::new(EmotionEventType::Start, 0.25, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_factory_creates_requested_kind() {
        let factory = WeightedStrategyFactory::new();
        let config = StrategyConfig::default();
        for kind in StrategyKind::ALL {
            assert_eq!(factory.create(kind, &config).kind(), kind);
        }
    }

    #[test]
    fn test_factory_respects_weights() {
        let factory = WeightedStrategyFactory::new();
        let config = StrategyConfig::default().with_weights(0.0, 1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(factory.sample(&mut rng, &config).kind(), StrategyKind::Orbit);
        }
    }

    #[test]
    fn test_factory_defaults_to_dolly_without_weights() {
        let factory = WeightedStrategyFactory::new();
        let config = StrategyConfig::default().with_weights(0.0, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(factory.sample(&mut rng, &config).kind(), StrategyKind::Dolly);
    }

    #[test]
    fn test_score_weights_by_role() {
        let config = StrategyConfig::default();
        let mut framing = Framing::new(&config);
        let framed = FrustumQuery {
            ids: (0..10).collect(),
            importance_sum: 20.0,
        };

        framing.subject = Some(Subject::new(InterestPoint::new(1, Point3::origin()), true));
        // avg 2, count capped at 8
        assert!((framing.score(&config, &framed) - (1.0 + 2.0 * 8.0 * 0.25)).abs() < 1e-12);

        framing.subject = Some(Subject::new(InterestPoint::new(1, Point3::origin()), false));
        assert!((framing.score(&config, &framed) - (1.0 + 2.0 * 8.0 * 0.75)).abs() < 1e-12);

        assert_eq!(framing.score(&config, &FrustumQuery::default()), 1.0);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StrategyKind::Overview).unwrap(), "\"overview\"");
        assert_eq!(StrategyKind::Dolly.to_string(), "dolly");
    }
}
