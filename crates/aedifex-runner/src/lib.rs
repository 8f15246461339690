//! Headless runner for the Aedifex camera director.
//!
//! Loads a track container and an optional scene from disk, plays the piece
//! at a fixed tick rate and reports the committed shots.

pub mod config;
pub mod error;
pub mod scene_file;
pub mod session;

pub use config::{Preset, RunnerConfig};
pub use error::{RunnerError, RunnerResult};
pub use scene_file::SceneFile;
pub use session::{play, run, RunReport};
