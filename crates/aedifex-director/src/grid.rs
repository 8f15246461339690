//! Uniform spatial grid of interest points.
//!
//! Each point is inserted into every cell its size-scaled box overlaps, and
//! each cell keeps a running importance sum. Cell lookups floor the position
//! into the grid and clamp at the borders.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{Point3, Vector3};

use crate::config::GridConfig;
use crate::error::{DirectorError, DirectorResult};
use crate::geometry::{Aabb, Frustum};
use crate::interest::{InterestPoint, InterestPointId};

#[derive(Debug, Clone, Default)]
struct Cell {
    points: Vec<InterestPointId>,
    importance_sum: f64,
}

/// Bookkeeping for one registered point.
#[derive(Debug, Clone)]
struct GridEntry {
    cells: Vec<usize>,
    importance: f64,
    position: Point3<f64>,
}

/// Points found inside a view frustum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrustumQuery {
    /// Ids in ascending order.
    pub ids: Vec<InterestPointId>,
    pub importance_sum: f64,
}

impl FrustumQuery {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn average_importance(&self) -> f64 {
        if self.ids.is_empty() {
            0.0
        } else {
            self.importance_sum / self.ids.len() as f64
        }
    }
}

/// Uniform 3-D grid with per-cell importance sums.
#[derive(Debug, Clone)]
pub struct InterestPointGrid {
    resolution: usize,
    bounds: Aabb,
    cell_size: Vector3<f64>,
    cells: Vec<Cell>,
    entries: BTreeMap<InterestPointId, GridEntry>,
    occupied: BTreeSet<usize>,
    total_importance: f64,
}

impl InterestPointGrid {
    /// Build an empty grid.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero resolution or a degenerate volume.
    pub fn new(config: &GridConfig) -> DirectorResult<Self> {
        if config.resolution == 0 {
            return Err(DirectorError::invalid_config("grid resolution must be positive"));
        }
        let bounds = Aabb::new(config.bounds_min, config.bounds_max);
        let size = bounds.size();
        if size.iter().any(|s| *s <= 0.0) {
            return Err(DirectorError::invalid_config("grid bounds must have positive extent"));
        }

        let r = config.resolution;
        Ok(Self {
            resolution: r,
            bounds,
            cell_size: size / r as f64,
            cells: vec![Cell::default(); r * r * r],
            entries: BTreeMap::new(),
            occupied: BTreeSet::new(),
            total_importance: 0.0,
        })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Unclamped floored cell coordinates.
    fn raw_indices(&self, p: &Point3<f64>) -> [i64; 3] {
        let local = p - self.bounds.min;
        [
            (local.x / self.cell_size.x).floor() as i64,
            (local.y / self.cell_size.y).floor() as i64,
            (local.z / self.cell_size.z).floor() as i64,
        ]
    }

    fn clamped_indices(&self, p: &Point3<f64>) -> [usize; 3] {
        let max = self.resolution as i64 - 1;
        self.raw_indices(p).map(|i| i.clamp(0, max) as usize)
    }

    fn flat_index(&self, [x, y, z]: [usize; 3]) -> usize {
        x + y * self.resolution + z * self.resolution * self.resolution
    }

    fn cell_bounds(&self, flat: usize) -> Aabb {
        let r = self.resolution;
        let (x, y, z) = (flat % r, (flat / r) % r, flat / (r * r));
        let min = self.bounds.min
            + Vector3::new(
                x as f64 * self.cell_size.x,
                y as f64 * self.cell_size.y,
                z as f64 * self.cell_size.z,
            );
        Aabb::new(min, min + self.cell_size)
    }

    /// True if `p` falls inside the gridded volume.
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        let r = self.resolution as i64;
        self.raw_indices(p).iter().all(|i| (0..r).contains(i))
    }

    /// Register a point, replacing any earlier registration with the same id.
    pub fn add(&mut self, point: &InterestPoint) {
        self.remove(point.id);

        let bounds = point.grid_bounds();
        let lo = self.clamped_indices(&bounds.min);
        let hi = self.clamped_indices(&bounds.max);
        let importance = point.importance as f64;

        let mut touched = Vec::new();
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let index = self.flat_index([x, y, z]);
                    let cell = &mut self.cells[index];
                    cell.points.push(point.id);
                    cell.importance_sum += importance;
                    self.occupied.insert(index);
                    touched.push(index);
                }
            }
        }

        self.total_importance += importance;
        self.entries.insert(
            point.id,
            GridEntry {
                cells: touched,
                importance,
                position: point.position,
            },
        );
    }

    /// Unregister a point. Returns whether it was registered.
    pub fn remove(&mut self, id: InterestPointId) -> bool {
        let entry = match self.entries.remove(&id) {
            Some(entry) => entry,
            None => return false,
        };

        for index in entry.cells {
            let cell = &mut self.cells[index];
            if let Some(position) = cell.points.iter().position(|p| *p == id) {
                cell.points.swap_remove(position);
                cell.importance_sum -= entry.importance;
            }
            if cell.points.is_empty() {
                cell.importance_sum = 0.0;
                self.occupied.remove(&index);
            }
        }

        self.total_importance -= entry.importance;
        true
    }

    pub fn contains(&self, id: InterestPointId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Importance accumulated in the cell containing `p`.
    pub fn importance_sum(&self, p: &Point3<f64>) -> f64 {
        self.cells[self.flat_index(self.clamped_indices(p))].importance_sum
    }

    /// Mean importance of the points in the cell containing `p`, 0 when empty.
    pub fn average_importance(&self, p: &Point3<f64>) -> f64 {
        let cell = &self.cells[self.flat_index(self.clamped_indices(p))];
        if cell.points.is_empty() {
            0.0
        } else {
            cell.importance_sum / cell.points.len() as f64
        }
    }

    /// Registered points whose position lies inside `frustum`.
    pub fn frustum_query(&self, frustum: &Frustum) -> FrustumQuery {
        let mut candidates = BTreeSet::new();
        for &index in &self.occupied {
            if frustum.intersects_aabb(&self.cell_bounds(index)) {
                candidates.extend(self.cells[index].points.iter().copied());
            }
        }

        let mut query = FrustumQuery::default();
        for id in candidates {
            if let Some(entry) = self.entries.get(&id) {
                if frustum.contains_point(&entry.position) {
                    query.ids.push(id);
                    query.importance_sum += entry.importance;
                }
            }
        }
        query
    }

    /// Sum of the importance of every registered point.
    pub fn total_importance(&self) -> f64 {
        self.total_importance
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    fn small_grid(resolution: usize) -> InterestPointGrid {
        InterestPointGrid::new(&GridConfig::default().with_resolution(resolution).with_bounds(
            Point3::new(-10.0, -10.0, -10.0),
            Point3::new(10.0, 10.0, 10.0),
        ))
        .unwrap()
    }

    #[test]
    fn test_single_cell_sum_and_average() {
        let mut grid = small_grid(1);
        let origin = Point3::origin();
        grid.add(&InterestPoint::new(1, origin).with_importance(1));
        grid.add(&InterestPoint::new(2, origin).with_importance(3));
        assert_eq!(grid.importance_sum(&origin), 4.0);
        assert_eq!(grid.average_importance(&origin), 2.0);
        assert_eq!(grid.total_importance(), 4.0);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut grid = small_grid(8);
        let point = InterestPoint::new(7, Point3::new(1.0, 2.0, 3.0)).with_importance(5);
        grid.add(&point);
        let once = grid.importance_sum(&point.position);
        grid.add(&point);
        assert_eq!(grid.importance_sum(&point.position), once);
        assert_eq!(grid.total_importance(), 5.0);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_moving_a_point_updates_cells() {
        let mut grid = small_grid(8);
        let mut point = InterestPoint::new(1, Point3::new(-8.0, -8.0, -8.0)).with_size(0.1);
        grid.add(&point);
        point.position = Point3::new(8.0, 8.0, 8.0);
        grid.add(&point);
        assert_eq!(grid.importance_sum(&Point3::new(-8.0, -8.0, -8.0)), 0.0);
        assert_eq!(grid.importance_sum(&Point3::new(8.0, 8.0, 8.0)), 1.0);
    }

    #[test]
    fn test_remove() {
        let mut grid = small_grid(4);
        let point = InterestPoint::new(3, Point3::origin()).with_importance(2);
        grid.add(&point);
        assert!(grid.remove(3));
        assert!(!grid.remove(3));
        assert_eq!(grid.importance_sum(&Point3::origin()), 0.0);
        assert_eq!(grid.average_importance(&Point3::origin()), 0.0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_large_point_spans_cells() {
        let mut grid = small_grid(4);
        // Cells are 5 units wide; a half extent of 6 crosses neighbours.
        grid.add(&InterestPoint::new(1, Point3::new(2.5, 2.5, 2.5)).with_size(6.0));
        assert_eq!(grid.importance_sum(&Point3::new(-2.5, -2.5, -2.5)), 1.0);
        assert_eq!(grid.importance_sum(&Point3::new(7.5, 7.5, 7.5)), 1.0);
        assert_eq!(grid.importance_sum(&Point3::new(-7.5, -7.5, -7.5)), 0.0);
    }

    #[test]
    fn test_contains_point() {
        let grid = small_grid(4);
        assert!(grid.contains_point(&Point3::origin()));
        assert!(grid.contains_point(&Point3::new(-10.0, -10.0, -10.0)));
        assert!(!grid.contains_point(&Point3::new(10.5, 0.0, 0.0)));
        assert!(!grid.contains_point(&Point3::new(0.0, -11.0, 0.0)));
    }

    #[test]
    fn test_frustum_query() {
        let mut grid = small_grid(4);
        grid.add(&InterestPoint::new(1, Point3::new(0.0, 0.0, -5.0)).with_importance(2));
        grid.add(&InterestPoint::new(2, Point3::new(0.0, 0.0, 5.0)).with_importance(4));
        grid.add(&InterestPoint::new(3, Point3::new(1.0, 0.0, -8.0)).with_importance(1));

        let frustum = Frustum::new(
            Point3::origin(),
            UnitQuaternion::identity(),
            std::f64::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        );
        let query = grid.frustum_query(&frustum);
        assert_eq!(query.ids, vec![1, 3]);
        assert_eq!(query.importance_sum, 3.0);
        assert_eq!(query.average_importance(), 1.5);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(InterestPointGrid::new(&GridConfig::default().with_resolution(0)).is_err());
        let flat = GridConfig::default().with_bounds(Point3::origin(), Point3::new(1.0, 0.0, 1.0));
        assert!(InterestPointGrid::new(&flat).is_err());
    }
}
