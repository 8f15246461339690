//! Interest points: weighted candidate subjects for shots.

use aedifex_models::{CoreEmotion, EmotionSpectrum};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::CameraPose;
use crate::geometry::Aabb;
use crate::grid::InterestPointGrid;
use crate::signal::EmotionEngine;

pub type InterestPointId = u32;

/// Weight of the neighbourhood importance in the primary heuristic.
const GRID_IMPORTANCE_WEIGHT: f64 = 0.35;

/// Lifecycle of the emotion state machine an interest point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StateMachineStatus {
    #[default]
    Disabled,
    Intro,
    Enabled,
    Outro,
}

impl StateMachineStatus {
    /// Intro and Enabled states draw extra attention.
    pub fn is_showing(&self) -> bool {
        matches!(self, StateMachineStatus::Intro | StateMachineStatus::Enabled)
    }
}

/// Link from an interest point to an emotion state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateMachineLink {
    /// Emotion the state machine responds to on the whole mix.
    #[serde(default)]
    pub global_affinity: Option<CoreEmotion>,
    /// Track the state machine listens to.
    #[serde(default)]
    pub track_id: Option<String>,
    /// Emotion the state machine responds to on its track.
    #[serde(default)]
    pub track_affinity: Option<CoreEmotion>,
    #[serde(default)]
    pub status: StateMachineStatus,
}

impl StateMachineLink {
    /// Affinity response at the context's time, doubled while showing.
    pub fn response(&self, ctx: &HeuristicContext<'_>) -> f64 {
        let global = self
            .global_affinity
            .map(|e| ctx.spectrum.dot(EmotionSpectrum::core(e)))
            .unwrap_or(0.0);

        let track = match (&self.track_id, self.track_affinity) {
            (Some(id), Some(affinity)) => ctx
                .engine
                .track_spectrum(id, ctx.time)
                .map(|s| s.dot(EmotionSpectrum::core(affinity)))
                .unwrap_or(0.0),
            _ => 0.0,
        };

        let response = global + track;
        if self.status.is_showing() {
            response * 2.0
        } else {
            response
        }
    }
}

/// Camera observing the scene while points are ranked.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub pose: CameraPose,
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
}

/// Everything the heuristic reads.
pub struct HeuristicContext<'a> {
    pub engine: &'a EmotionEngine,
    pub grid: &'a InterestPointGrid,
    /// Normalized playback time.
    pub time: f64,
    /// Emotion at `time`.
    pub spectrum: &'a EmotionSpectrum,
    pub viewer: Option<Viewer>,
}

impl<'a> HeuristicContext<'a> {
    pub fn new(engine: &'a EmotionEngine, grid: &'a InterestPointGrid, time: f64) -> Self {
        Self {
            engine,
            grid,
            time,
            spectrum: engine.spectrum(time),
            viewer: None,
        }
    }

    /// Builder: rank from the point of view of a camera.
    pub fn with_viewer(mut self, viewer: Option<Viewer>) -> Self {
        self.viewer = viewer;
        self
    }
}

fn identity_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::identity()
}

fn unit_scale() -> Vector3<f64> {
    Vector3::new(1.0, 1.0, 1.0)
}

fn default_importance() -> i32 {
    1
}

fn default_size() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

/// A weighted candidate subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub id: InterestPointId,
    #[serde(default)]
    pub name: String,
    pub position: Point3<f64>,
    #[serde(default = "identity_rotation")]
    pub rotation: UnitQuaternion<f64>,
    /// Larger is more interesting.
    #[serde(default = "default_importance")]
    pub importance: i32,
    /// Radius before scaling.
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default = "unit_scale")]
    pub scale: Vector3<f64>,
    /// How strongly the point faces along its forward axis, in `[0, 1]`.
    #[serde(default)]
    pub directionality: f64,
    /// How much the emotional affinity sways interest, in `[0, 1]`.
    #[serde(default)]
    pub emotional_impact: f64,
    #[serde(default)]
    pub affinity: Option<CoreEmotion>,
    #[serde(default)]
    pub state_machine: Option<StateMachineLink>,
    /// Bounds of the scene item this point marks.
    #[serde(default)]
    pub bounds: Option<Aabb>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl InterestPoint {
    pub fn new(id: InterestPointId, position: Point3<f64>) -> Self {
        Self {
            id,
            name: String::new(),
            position,
            rotation: identity_rotation(),
            importance: default_importance(),
            size: default_size(),
            scale: unit_scale(),
            directionality: 0.0,
            emotional_impact: 0.0,
            affinity: None,
            state_machine: None,
            bounds: None,
            active: true,
        }
    }

    /// Builder: set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set the importance.
    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    /// Builder: set the unscaled radius.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Builder: set the per-axis scale.
    pub fn with_scale(mut self, scale: Vector3<f64>) -> Self {
        self.scale = scale;
        self
    }

    /// Builder: set the orientation.
    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set the directionality, clamped to `[0, 1]`.
    pub fn with_directionality(mut self, directionality: f64) -> Self {
        self.directionality = directionality.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the emotional affinity and its impact.
    pub fn with_affinity(mut self, affinity: CoreEmotion, impact: f64) -> Self {
        self.affinity = Some(affinity);
        self.emotional_impact = impact.clamp(0.0, 1.0);
        self
    }

    /// Builder: link to a state machine.
    pub fn with_state_machine(mut self, link: StateMachineLink) -> Self {
        self.state_machine = Some(link);
        self
    }

    /// Builder: set the associated item bounds.
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Builder: set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.rotation * Vector3::x()
    }

    /// Per-axis radius after scaling.
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.scale * self.size).abs()
    }

    /// Largest scaled radius.
    pub fn radius(&self) -> f64 {
        self.half_extents().max()
    }

    /// Size-scaled box used for grid insertion.
    pub fn grid_bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.half_extents())
    }

    /// Item bounds, or the grid box when none were authored.
    pub fn item_bounds(&self) -> Aabb {
        self.bounds.unwrap_or_else(|| self.grid_bounds())
    }

    /// Lowest point of the scaled sphere along world up.
    pub fn lowest_point(&self) -> Point3<f64> {
        self.position - Vector3::y() * self.size * self.scale.y.abs()
    }

    /// Angular size seen from `viewer`, relative to its field of view.
    pub fn apparent_size(&self, viewer: &Viewer) -> f64 {
        let distance = (self.position - viewer.pose.position).norm();
        let fov = viewer.field_of_view.to_radians();
        if fov <= 0.0 {
            return 0.0;
        }
        let angular = if distance <= self.radius() {
            std::f64::consts::PI
        } else {
            2.0 * (self.radius() / distance).asin()
        };
        angular / fov
    }

    /// Interest score at the context's time.
    ///
    /// # Arguments
    /// * `ctx` - Engine, grid, time, current emotion and optional viewer
    /// * `is_primary` - Primary ranking adds neighbourhood, state machine and
    ///   apparent-size terms
    ///
    /// # Returns
    /// 0 for inactive points, otherwise the weighted score.
    pub fn evaluate_heuristic(&self, ctx: &HeuristicContext<'_>, is_primary: bool) -> f64 {
        if !self.active {
            return 0.0;
        }

        let affinity = self
            .affinity
            .map(|e| ctx.spectrum.dot(EmotionSpectrum::core(e)))
            .unwrap_or(0.0);
        let mut score = self.importance as f64 + self.emotional_impact * affinity;

        if !is_primary {
            return score;
        }

        score += GRID_IMPORTANCE_WEIGHT * ctx.grid.average_importance(&self.position);

        if let Some(link) = &self.state_machine {
            score += link.response(ctx) * self.emotional_impact;
        }

        if let Some(viewer) = &ctx.viewer {
            let favored = ctx.engine.normalized_smooth_energy(ctx.time);
            let difference = (self.apparent_size(viewer) - favored).abs().min(1.0);
            score *= 1.0 - 0.5 * difference;
        }

        score
    }
}
