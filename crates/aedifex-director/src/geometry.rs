//! Scene geometry seam: boxes, rays and view frusta.
//!
//! The director never owns scene meshes. It reaches the scene through
//! [`SceneGeometry`], which only answers ray queries.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two corners in any order.
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    pub fn from_center_half_extents(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Slab test. Returns the entry distance along the ray (0 when the origin
    /// is inside).
    pub fn intersect_ray(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        let mut t_min = 0.0f64;
        let mut t_max = max_distance;

        for i in 0..3 {
            let origin = ray.origin[i];
            let direction = ray.direction[i];
            if direction.abs() < 1e-12 {
                if origin < self.min[i] || origin > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (self.min[i] - origin) * inv;
            let mut t1 = (self.max[i] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f64,
    pub point: Point3<f64>,
}

/// Ray queries against the scene.
pub trait SceneGeometry: Send + Sync {
    /// Closest hit against any geometry, floor included.
    fn raycast(&self, ray: &Ray, max_distance: f64) -> Option<RayHit>;

    /// Closest hit against the floor only.
    fn raycast_floor(&self, ray: &Ray, max_distance: f64) -> Option<RayHit>;
}

/// Empty scene: rays never hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenScene;

impl SceneGeometry for OpenScene {
    fn raycast(&self, _ray: &Ray, _max_distance: f64) -> Option<RayHit> {
        None
    }

    fn raycast_floor(&self, _ray: &Ray, _max_distance: f64) -> Option<RayHit> {
        None
    }
}

/// Scene made of solid boxes plus an optional horizontal floor plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxScene {
    #[serde(default)]
    pub boxes: Vec<Aabb>,
    /// Height of the floor plane (`y = floor_height`), if any.
    #[serde(default)]
    pub floor_height: Option<f64>,
}

impl BoxScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a solid box.
    pub fn with_box(mut self, aabb: Aabb) -> Self {
        self.boxes.push(aabb);
        self
    }

    /// Builder: set the floor height.
    pub fn with_floor(mut self, height: f64) -> Self {
        self.floor_height = Some(height);
        self
    }

    fn floor_hit(&self, ray: &Ray, max_distance: f64) -> Option<RayHit> {
        let height = self.floor_height?;
        let dy = ray.direction.y;
        if dy.abs() < 1e-12 {
            return None;
        }
        let distance = (height - ray.origin.y) / dy;
        if distance < 0.0 || distance > max_distance {
            return None;
        }
        Some(RayHit {
            distance,
            point: ray.at(distance),
        })
    }
}

impl SceneGeometry for BoxScene {
    fn raycast(&self, ray: &Ray, max_distance: f64) -> Option<RayHit> {
        let box_hit = self
            .boxes
            .iter()
            .filter_map(|b| b.intersect_ray(ray, max_distance))
            .min_by(|a, b| a.total_cmp(b))
            .map(|distance| RayHit {
                distance,
                point: ray.at(distance),
            });

        match (box_hit, self.floor_hit(ray, max_distance)) {
            (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    fn raycast_floor(&self, ray: &Ray, max_distance: f64) -> Option<RayHit> {
        self.floor_hit(ray, max_distance)
    }
}

/// Plane `normal · p + d >= 0` on the inside.
#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3<f64>,
    d: f64,
}

impl Plane {
    fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }
}

/// View frustum of a camera looking down its local -Z axis.
#[derive(Debug, Clone)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// # Arguments
    /// * `position`, `orientation` - Camera pose
    /// * `fov_y` - Vertical field of view in radians
    /// * `aspect` - Width over height
    /// * `near`, `far` - Clip distances
    pub fn new(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let ty = (fov_y * 0.5).tan();
        let tx = ty * aspect;

        // Camera-space planes; depth is -z.
        let local = [
            (Vector3::new(0.0, 0.0, -1.0), -near),
            (Vector3::new(0.0, 0.0, 1.0), far),
            (Vector3::new(1.0, 0.0, -tx), 0.0),
            (Vector3::new(-1.0, 0.0, -tx), 0.0),
            (Vector3::new(0.0, 1.0, -ty), 0.0),
            (Vector3::new(0.0, -1.0, -ty), 0.0),
        ];

        let planes = local.map(|(n, d)| {
            let length = n.norm();
            let normal = orientation * (n / length);
            Plane {
                normal,
                d: d / length - normal.dot(&position.coords),
            }
        });

        Self { planes }
    }

    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        self.planes.iter().all(|plane| plane.distance(p) >= 0.0)
    }

    /// Conservative box test: false only when the box is fully outside one plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Point3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance(&positive) >= 0.0
        })
    }
}
