//! Music-synchronized autonomous camera director.
//!
//! The pipeline runs in dependency order:
//!
//! - [`signal`]: authored tracks and the audio length become a sampled emotion
//!   signal, an energy curve and a sorted event list.
//! - [`scheduler`]: events are bucketed in beat-sized windows for live dispatch
//!   and look-ahead.
//! - [`grid`] and [`interest`]: weighted points of interest, spatially indexed.
//! - [`strategy`]: camera placement, scoring and motion for one shot.
//! - [`director`]: chooses when to cut, what to frame and how.
//!
//! [`simulation::Simulation`] wires everything for headless playback.

pub mod camera;
pub mod config;
pub mod director;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod interest;
pub mod sampling;
pub mod scheduler;
pub mod signal;
pub mod simulation;
pub mod strategy;

// Re-export common types
pub use camera::{CameraPose, Composition, HandheldNoise, LowFrequencyNoise, Projection, ShotCamera};
pub use config::{
    AedifexConfig, DirectorConfig, GridConfig, SchedulerConfig, SignalConfig, StrategyConfig,
};
pub use director::{DirectorContext, ProposalState, ShotDirector, ShotRecord, TransitionType};
pub use error::{DirectorError, DirectorResult};
pub use geometry::{Aabb, BoxScene, Frustum, OpenScene, Ray, RayHit, SceneGeometry};
pub use grid::{FrustumQuery, InterestPointGrid};
pub use interest::{InterestPoint, InterestPointId, StateMachineLink, StateMachineStatus};
pub use scheduler::{DispatchBatch, EmotionEventGroup, EventListener, EventScheduler};
pub use signal::EmotionEngine;
pub use simulation::{CameraFrame, Simulation};
pub use strategy::{
    CameraStrategy, StrategyContext, StrategyFactory, StrategyKind, WeightedStrategyFactory,
};
