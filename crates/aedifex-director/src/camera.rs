//! Camera pose, composition and the per-shot smoothed camera.

use nalgebra::{Perspective3, Point3, UnitQuaternion, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::geometry::Frustum;
use crate::sampling::on_unit_sphere;

/// World-space camera transform. The camera looks down its local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl CameraPose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `position` looking straight at `target`.
    pub fn looking_at(position: Point3<f64>, target: &Point3<f64>) -> Self {
        Self::new(position, look_rotation(&(target - position)))
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * -Vector3::z()
    }

    pub fn up(&self) -> Vector3<f64> {
        self.orientation * Vector3::y()
    }

    pub fn right(&self) -> Vector3<f64> {
        self.orientation * Vector3::x()
    }

    /// Point expressed in camera space.
    pub fn to_camera_space(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.orientation.inverse() * (p - self.position))
    }
}

/// Rotation whose -Z axis points along `direction`.
pub fn look_rotation(direction: &Vector3<f64>) -> UnitQuaternion<f64> {
    if direction.norm_squared() < 1e-18 {
        return UnitQuaternion::identity();
    }
    let dir = direction.normalize();
    let up = if dir.dot(&Vector3::y()).abs() > 0.999 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    UnitQuaternion::face_towards(&-dir, &up)
}

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Projection {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            field_of_view: config.field_of_view,
            aspect: config.aspect_ratio,
            near: config.near_clip,
            far: config.far_clip,
        }
    }

    /// Builder: override the field of view.
    pub fn with_field_of_view(mut self, degrees: f64) -> Self {
        self.field_of_view = degrees;
        self
    }

    pub fn fov_radians(&self) -> f64 {
        self.field_of_view.to_radians()
    }

    pub fn perspective(&self) -> Perspective3<f64> {
        Perspective3::new(self.aspect, self.fov_radians(), self.near, self.far)
    }

    pub fn frustum(&self, pose: &CameraPose) -> Frustum {
        Frustum::new(
            pose.position,
            pose.orientation,
            self.fov_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    /// Screen position in `[0, 1]²` of a world point, `None` when behind the camera.
    pub fn screen_position(&self, pose: &CameraPose, p: &Point3<f64>) -> Option<Vector2<f64>> {
        let local = pose.to_camera_space(p);
        if local.z >= 0.0 {
            return None;
        }
        let ndc = self.perspective().project_point(&local);
        Some(Vector2::new(ndc.x * 0.5 + 0.5, ndc.y * 0.5 + 0.5))
    }

    /// Camera-space unit direction through a screen position.
    pub fn screen_direction(&self, screen: &Vector2<f64>) -> Vector3<f64> {
        let ndc = screen * 2.0 - Vector2::new(1.0, 1.0);
        let near = self.perspective().unproject_point(&Point3::new(ndc.x, ndc.y, -1.0));
        near.coords.normalize()
    }
}

/// Where the subject should sit on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Target screen position in `[0, 1]²`.
    pub screen_target: Vector2<f64>,
    /// Screen-space tolerance before the camera re-aims.
    pub dead_zone_size: f64,
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            screen_target: Vector2::new(0.5, 0.5),
            dead_zone_size: 0.0,
            field_of_view: 60.0,
        }
    }
}

/// Orientation at `position` that puts `target` on the composed screen position.
///
/// The plain look-at rotation is corrected by the rotation that carries the
/// unprojected screen direction onto the view axis.
pub fn look_at_composed(
    position: &Point3<f64>,
    target: &Point3<f64>,
    composition: &Composition,
    projection: &Projection,
) -> UnitQuaternion<f64> {
    let look = look_rotation(&(target - position));
    let projection = projection.with_field_of_view(composition.field_of_view);
    let screen_dir = projection.screen_direction(&composition.screen_target);
    let correction = UnitQuaternion::rotation_between(&screen_dir, &-Vector3::z())
        .unwrap_or_else(UnitQuaternion::identity);
    look * correction
}

/// Handheld shake applied on top of the smoothed camera position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandheldNoise {
    /// World-space radius of the shake. Zero disables it.
    pub amplitude: f64,
    /// Key changes per second.
    pub frequency: f64,
}

impl Default for HandheldNoise {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            frequency: 1.0,
        }
    }
}

impl HandheldNoise {
    pub fn new(amplitude: f64, frequency: f64) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    pub fn is_still(&self) -> bool {
        self.amplitude <= 0.0
    }
}

/// Seeded smooth random walk inside the unit ball.
///
/// Random keys are drawn at the caller's frequency and eased between with a
/// smoothstep, so the output never jumps.
#[derive(Debug, Clone)]
pub struct LowFrequencyNoise {
    rng: StdRng,
    from: Vector3<f64>,
    to: Vector3<f64>,
    phase: f64,
}

impl LowFrequencyNoise {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let from = in_unit_ball(&mut rng);
        let to = in_unit_ball(&mut rng);
        Self {
            rng,
            from,
            to,
            phase: 0.0,
        }
    }

    /// Advance by `dt` seconds at `frequency` keys per second.
    pub fn advance(&mut self, dt: f64, frequency: f64) {
        if dt <= 0.0 || frequency <= 0.0 {
            return;
        }
        self.phase += dt * frequency;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            self.from = self.to;
            self.to = in_unit_ball(&mut self.rng);
        }
    }

    pub fn value(&self) -> Vector3<f64> {
        let t = self.phase * self.phase * (3.0 - 2.0 * self.phase);
        self.from + (self.to - self.from) * t
    }
}

/// Virtual camera instantiated for one shot.
///
/// The strategy writes target poses; the camera eases toward them with
/// separate position and rotation damping times. Rotation holds while the
/// subject stays inside the composition's dead zone.
#[derive(Debug, Clone)]
pub struct ShotCamera {
    pub id: usize,
    pub composition: Composition,
    /// Seconds to close most of the gap to the target position. Zero snaps.
    pub position_damping: f64,
    /// Seconds to close most of the gap to the target rotation. Zero snaps.
    pub rotation_damping: f64,
    projection: Projection,
    subject: Option<Point3<f64>>,
    handheld: HandheldNoise,
    noise: LowFrequencyNoise,
    target: CameraPose,
    smoothed: CameraPose,
    pose: CameraPose,
}

impl ShotCamera {
    pub fn new(id: usize, pose: CameraPose, composition: Composition) -> Self {
        Self {
            id,
            composition,
            position_damping: 0.0,
            rotation_damping: 0.0,
            projection: Projection::from_config(&StrategyConfig::default()),
            subject: None,
            handheld: HandheldNoise::default(),
            noise: LowFrequencyNoise::new(id as u64),
            target: pose,
            smoothed: pose,
            pose,
        }
    }

    /// Builder: set damping times in seconds.
    pub fn with_damping(mut self, position: f64, rotation: f64) -> Self {
        self.position_damping = position;
        self.rotation_damping = rotation;
        self
    }

    /// Builder: projection used for the dead-zone test. The composition keeps
    /// its own field of view.
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Builder: track `subject` against the dead zone.
    pub fn with_subject(mut self, subject: Point3<f64>) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Builder: handheld shake drawn from a generator seeded with `seed`.
    pub fn with_noise(mut self, handheld: HandheldNoise, seed: u64) -> Self {
        self.handheld = handheld;
        self.noise = LowFrequencyNoise::new(seed);
        self.pose = self.displayed();
        self
    }

    pub fn set_target(&mut self, target: CameraPose) {
        self.target = target;
    }

    pub fn set_subject(&mut self, subject: Point3<f64>) {
        self.subject = Some(subject);
    }

    /// Change the shake strength without reseeding it.
    pub fn set_noise(&mut self, handheld: HandheldNoise) {
        self.handheld = handheld;
    }

    pub fn noise(&self) -> HandheldNoise {
        self.handheld
    }

    pub fn target(&self) -> &CameraPose {
        &self.target
    }

    /// Displayed pose: smoothed, plus shake.
    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// Jump straight to the target.
    pub fn snap(&mut self) {
        self.smoothed = self.target;
        self.pose = self.displayed();
    }

    /// True while the subject sits within `dead_zone_size` of the screen target.
    pub fn subject_in_dead_zone(&self) -> bool {
        let subject = match &self.subject {
            Some(subject) => subject,
            None => return false,
        };
        if self.composition.dead_zone_size <= 0.0 {
            return false;
        }
        let projection = self.projection.with_field_of_view(self.composition.field_of_view);
        match projection.screen_position(&self.smoothed, subject) {
            Some(screen) => (self.composition.screen_target - screen).norm() <= self.composition.dead_zone_size,
            None => false,
        }
    }

    /// Ease the smoothed pose toward the target over `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let position_t = damping_factor(self.position_damping, dt);
        self.smoothed.position =
            self.smoothed.position + (self.target.position - self.smoothed.position) * position_t;

        if !self.subject_in_dead_zone() {
            let rotation_t = damping_factor(self.rotation_damping, dt);
            self.smoothed.orientation = self
                .smoothed
                .orientation
                .try_slerp(&self.target.orientation, rotation_t, 1e-9)
                .unwrap_or(self.target.orientation);
        }

        self.noise.advance(dt, self.handheld.frequency);
        self.pose = self.displayed();
    }

    fn displayed(&self) -> CameraPose {
        if self.handheld.is_still() {
            return self.smoothed;
        }
        let offset = self.noise.value() * self.handheld.amplitude;
        CameraPose::new(self.smoothed.position + offset, self.smoothed.orientation)
    }
}

/// Fraction of the remaining gap covered in `dt` for a damping time.
fn damping_factor(damping: f64, dt: f64) -> f64 {
    if damping <= 0.0 || dt <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt / damping).exp()
}

fn in_unit_ball(rng: &mut StdRng) -> Vector3<f64> {
    on_unit_sphere(rng) * rng.random::<f64>().cbrt()
}
