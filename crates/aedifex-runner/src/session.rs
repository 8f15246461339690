//! One headless playback run.

use std::sync::Arc;

use aedifex_director::{BoxScene, EmotionEngine, InterestPoint, ShotRecord, Simulation, StrategyKind};
use aedifex_models::DataContainer;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::scene_file::SceneFile;

/// Output of a run, printed as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub seed: u64,
    pub duration_secs: f64,
    pub interest_points: usize,
    pub events: usize,
    pub shots: Vec<ShotRecord>,
}

impl RunReport {
    /// Number of shots using `kind`.
    pub fn count_kind(&self, kind: StrategyKind) -> usize {
        self.shots.iter().filter(|s| s.kind == kind).count()
    }
}

/// Read the container, build the pipeline and play the piece.
///
/// # Errors
/// Unreadable or invalid input files, and engine construction failures.
pub fn run(config: &RunnerConfig) -> RunnerResult<RunReport> {
    config.validate()?;

    let json = std::fs::read_to_string(&config.container_path).map_err(|source| RunnerError::Read {
        path: config.container_path.display().to_string(),
        source,
    })?;
    let container = DataContainer::from_json(&json)?;

    let (scene, points) = match &config.scene_path {
        Some(path) => SceneFile::load(path)?.into_parts(),
        None => {
            warn!("No scene file given, using an open scene with a single subject");
            (BoxScene::new(), vec![InterestPoint::new(0, nalgebra::Point3::origin())])
        }
    };

    play(container, scene, points, config)
}

/// Play a loaded container against a scene.
pub fn play(
    container: DataContainer,
    scene: BoxScene,
    points: Vec<InterestPoint>,
    config: &RunnerConfig,
) -> RunnerResult<RunReport> {
    let director_config = config.director_config();
    let engine = EmotionEngine::from_sample_count(
        container,
        config.sample_count(),
        config.duration_secs,
        director_config.signal.clone(),
    )?;
    let events = engine.events().len();

    let mut simulation = Simulation::new(Arc::new(engine), Box::new(scene), &director_config)?;
    let total = points.len();
    let registered = simulation.add_interest_points(points);
    if registered < total {
        warn!(registered, total, "Some interest points lie outside the grid");
    }

    let shots = simulation.run(config.tick_hz)?.to_vec();
    let report = RunReport {
        seed: config.seed,
        duration_secs: config.duration_secs,
        interest_points: registered,
        events,
        shots,
    };
    info!(
        seed = report.seed,
        shots = report.shots.len(),
        dolly = report.count_kind(StrategyKind::Dolly),
        orbit = report.count_kind(StrategyKind::Orbit),
        overview = report.count_kind(StrategyKind::Overview),
        events,
        "Run complete"
    );

    Ok(report)
}
