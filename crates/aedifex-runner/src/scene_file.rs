//! Scene description loaded from disk.

use std::collections::BTreeSet;
use std::path::Path;

use aedifex_director::{Aabb, BoxScene, InterestPoint};
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Interest points and blockers for one run.
///
/// ```json
/// {
///   "floor_height": 0.0,
///   "boxes": [{ "min": [-5, 0, -5], "max": [5, 3, 5] }],
///   "interest_points": [{ "id": 1, "position": [0, 1, 0], "importance": 3 }]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub floor_height: Option<f64>,
    #[serde(default)]
    pub boxes: Vec<Aabb>,
    #[serde(default)]
    pub interest_points: Vec<InterestPoint>,
}

impl SceneFile {
    /// Parse and validate a scene.
    pub fn from_json(json: &str) -> RunnerResult<Self> {
        let scene: SceneFile = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Read a scene from disk.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| RunnerError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject duplicate ids and non-finite geometry.
    pub fn validate(&self) -> RunnerResult<()> {
        let mut seen = BTreeSet::new();
        for point in &self.interest_points {
            if !seen.insert(point.id) {
                return Err(RunnerError::invalid_scene(format!(
                    "duplicate interest point id {}",
                    point.id
                )));
            }
            if point.position.iter().any(|c| !c.is_finite()) {
                return Err(RunnerError::invalid_scene(format!(
                    "interest point {} has a non-finite position",
                    point.id
                )));
            }
        }
        if self.floor_height.is_some_and(|h| !h.is_finite()) {
            return Err(RunnerError::invalid_scene("floor height must be finite"));
        }
        Ok(())
    }

    /// Split into collision geometry and the points to register.
    pub fn into_parts(self) -> (BoxScene, Vec<InterestPoint>) {
        let scene = BoxScene {
            boxes: self.boxes,
            floor_height: self.floor_height,
        };
        (scene, self.interest_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scene() {
        let scene = SceneFile::from_json(
            r#"{ "interest_points": [{ "id": 7, "position": [1.0, 2.0, 3.0] }] }"#,
        )
        .unwrap();
        assert_eq!(scene.interest_points.len(), 1);
        assert_eq!(scene.interest_points[0].importance, 1);
        assert!(scene.interest_points[0].active);
        assert!(scene.floor_height.is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{ "interest_points": [
            { "id": 1, "position": [0.0, 0.0, 0.0] },
            { "id": 1, "position": [1.0, 0.0, 0.0] }
        ] }"#;
        assert!(matches!(SceneFile::from_json(json), Err(RunnerError::InvalidScene(_))));
    }

    #[test]
    fn test_into_parts() {
        let json = r#"{
            "floor_height": -1.0,
            "boxes": [{ "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0] }],
            "interest_points": [{ "id": 2, "position": [0.0, 3.0, 0.0], "importance": 4 }]
        }"#;
        let (scene, points) = SceneFile::from_json(json).unwrap().into_parts();
        assert_eq!(scene.floor_height, Some(-1.0));
        assert_eq!(scene.boxes.len(), 1);
        assert_eq!(points[0].importance, 4);
    }
}
