//! Shot director.
//!
//! Chains shots on musical events. While a shot plays, the director assembles
//! the next one a step per tick:
//!
//! 1. Pick the cut: a future event group inside the emotion-driven window.
//! 2. Pick a subject: importance-weighted draw over the interest points.
//! 3. Sample strategies and score the ones that placed a camera.
//!
//! When the shot runs out the ready proposal is committed. If none is ready
//! the current shot is committed again so playback never stalls.

mod cut;
mod shot;

use std::collections::BTreeMap;

use aedifex_models::EmotionEvent;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::camera::{CameraPose, Projection, ShotCamera};
use crate::config::{AedifexConfig, DirectorConfig, StrategyConfig};
use crate::error::DirectorResult;
use crate::geometry::{Ray, SceneGeometry};
use crate::grid::InterestPointGrid;
use crate::interest::{HeuristicContext, InterestPoint, InterestPointId, Viewer};
use crate::sampling::{select_weighted, select_weighted_index};
use crate::scheduler::{EmotionEventGroup, EventListener, EventScheduler};
use crate::signal::EmotionEngine;
use crate::strategy::{StrategyContext, StrategyFactory, Subject, WeightedStrategyFactory};

pub use cut::{evaluate_cut_range, event_priority, CutRange};
pub use shot::{
    ActiveShot, CutSelection, ProposalState, ScoredStrategy, ShotInformation, ShotRecord,
    TransitionType,
};

/// Shared state the director reads each tick.
pub struct DirectorContext<'a> {
    pub engine: &'a EmotionEngine,
    pub scheduler: &'a EventScheduler,
    pub scene: &'a dyn SceneGeometry,
    /// Normalized playback time.
    pub time: f64,
}

/// Propose-evaluate-commit camera director.
pub struct ShotDirector {
    config: DirectorConfig,
    strategy_config: StrategyConfig,
    projection: Projection,
    grid: InterestPointGrid,
    points: BTreeMap<InterestPointId, InterestPoint>,
    /// Ids by descending primary heuristic.
    ranking: Vec<InterestPointId>,
    rng: StdRng,
    factory: Box<dyn StrategyFactory>,

    current: Option<ActiveShot>,
    next: ShotInformation,
    /// First event seen before any shot exists.
    pending_trigger: Option<EmotionEvent>,
    /// Normalized time elapsed in the current shot.
    current_cut_time: f64,
    retry_bias: f64,
    camera: Option<ShotCamera>,
    history: Vec<ShotRecord>,
}

impl ShotDirector {
    /// Create a director with the default strategy factory.
    ///
    /// # Errors
    /// `InvalidConfig` when the configuration fails validation.
    pub fn new(config: &AedifexConfig) -> DirectorResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.director.clone(),
            strategy_config: config.strategy.clone(),
            projection: Projection::from_config(&config.strategy),
            grid: InterestPointGrid::new(&config.grid)?,
            points: BTreeMap::new(),
            ranking: Vec::new(),
            rng: StdRng::seed_from_u64(config.director.seed),
            factory: Box::new(WeightedStrategyFactory::new()),
            current: None,
            next: ShotInformation::default(),
            pending_trigger: None,
            current_cut_time: 0.0,
            retry_bias: 0.0,
            camera: None,
            history: Vec::new(),
        })
    }

    /// Builder: replace the strategy factory.
    pub fn with_factory(mut self, factory: Box<dyn StrategyFactory>) -> Self {
        self.factory = factory;
        self
    }

    // ========================================================================
    // Interest points
    // ========================================================================

    /// Register or move an interest point.
    ///
    /// # Returns
    /// `false` when the point lies outside the grid volume and was ignored.
    pub fn register_interest_point(&mut self, point: InterestPoint) -> bool {
        if !self.grid.contains_point(&point.position) {
            warn!(id = point.id, position = ?point.position, "Interest point outside grid bounds, ignored");
            return false;
        }
        self.grid.add(&point);
        if !self.ranking.contains(&point.id) {
            self.ranking.push(point.id);
        }
        self.points.insert(point.id, point);
        true
    }

    pub fn deregister_interest_point(&mut self, id: InterestPointId) -> Option<InterestPoint> {
        self.grid.remove(id);
        self.ranking.retain(|r| *r != id);
        self.points.remove(&id)
    }

    pub fn interest_point(&self, id: InterestPointId) -> Option<&InterestPoint> {
        self.points.get(&id)
    }

    pub fn interest_points(&self) -> impl Iterator<Item = &InterestPoint> {
        self.points.values()
    }

    pub fn grid(&self) -> &InterestPointGrid {
        &self.grid
    }

    /// Ids ordered by the last ranking pass.
    pub fn ranking(&self) -> &[InterestPointId] {
        &self.ranking
    }

    /// Number of ranked points treated as primary.
    pub fn primary_count(&self) -> usize {
        if self.ranking.is_empty() {
            return 0;
        }
        let count = (self.ranking.len() as f64 * self.config.primary_subject_fraction).ceil() as usize;
        count.clamp(1, self.ranking.len())
    }

    fn viewer(&self) -> Option<Viewer> {
        self.camera.as_ref().map(|camera| Viewer {
            pose: *camera.pose(),
            field_of_view: camera.composition.field_of_view,
        })
    }

    /// Sort interest points by descending primary heuristic, ties by id.
    pub fn rank_interest_points(&mut self, engine: &EmotionEngine, time: f64) {
        let ctx = HeuristicContext::new(engine, &self.grid, time).with_viewer(self.viewer());
        let mut scored: Vec<(InterestPointId, f64)> = self
            .points
            .values()
            .map(|p| (p.id, p.evaluate_heuristic(&ctx, true)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        self.ranking = scored.into_iter().map(|(id, _)| id).collect();
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Displayed camera pose, `None` before the first commit.
    pub fn camera_pose(&self) -> Option<CameraPose> {
        self.camera.as_ref().map(|c| *c.pose())
    }

    pub fn camera(&self) -> Option<&ShotCamera> {
        self.camera.as_ref()
    }

    pub fn current_shot(&self) -> Option<&ActiveShot> {
        self.current.as_ref()
    }

    pub fn proposal_state(&self) -> ProposalState {
        self.next.state
    }

    pub fn retry_bias(&self) -> f64 {
        self.retry_bias
    }

    /// Normalized time spent in the current shot.
    pub fn current_cut_time(&self) -> f64 {
        self.current_cut_time
    }

    pub fn history(&self) -> &[ShotRecord] {
        &self.history
    }

    // ========================================================================
    // Per-tick update
    // ========================================================================

    /// Advance the director by `dt` seconds.
    ///
    /// # Returns
    /// The displayed camera pose once a shot exists.
    pub fn update(&mut self, ctx: &DirectorContext<'_>, dt: f64) -> Option<CameraPose> {
        if self.current.is_none() {
            if self.next.trigger.is_none() {
                if let Some(trigger) = self.pending_trigger.take() {
                    self.next = ShotInformation::with_trigger(trigger);
                }
            }
            self.advance_proposal(ctx);
            if self.next.state.is_ready() {
                self.commit_next(ctx);
            }
            return self.camera_pose();
        }

        self.rank_interest_points(ctx.engine, ctx.time);
        self.update_camera(ctx, dt);

        let duration = self.current.as_ref().map(|s| s.duration()).unwrap_or(0.0);
        if self.current_cut_time < duration {
            self.current_cut_time += dt / ctx.engine.duration();
            if !self.next.state.is_ready() {
                self.advance_proposal(ctx);
            }
        } else {
            if !self.next.state.is_ready() {
                self.advance_proposal(ctx);
            }
            if self.next.state.is_ready() {
                self.commit_next(ctx);
            } else {
                self.recommit_current(ctx);
            }
        }

        self.camera_pose()
    }

    /// Let the strategy move its target and ease the camera toward it.
    fn update_camera(&mut self, ctx: &DirectorContext<'_>, dt: f64) {
        let current = match self.current.as_mut() {
            Some(current) => current,
            None => return,
        };
        let duration = current.duration();
        let camera_time = if duration > 0.0 {
            (self.current_cut_time / duration).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let strategy_ctx = StrategyContext {
            engine: ctx.engine,
            grid: &self.grid,
            points: &self.points,
            scene: ctx.scene,
            rng: &mut self.rng,
            config: &self.strategy_config,
            time: ctx.time,
        };
        current.strategy.update(&strategy_ctx, camera_time);

        if let Some(camera) = self.camera.as_mut() {
            camera.set_target(current.strategy.pose());
            camera.set_noise(current.strategy.noise());
            camera.update(dt);
        }
    }

    // ========================================================================
    // Proposal pipeline
    // ========================================================================

    /// Run one step of the next-shot proposal.
    fn advance_proposal(&mut self, ctx: &DirectorContext<'_>) {
        if self.next.trigger.is_none() {
            return;
        }

        let state = self.next.state;
        let succeeded = match state {
            ProposalState::Empty => match self.try_find_cut(ctx) {
                Some(cut) => {
                    self.next.cut = Some(cut);
                    true
                }
                None => false,
            },
            ProposalState::SubjectPending => match self.select_subject(ctx) {
                Some(subject) => {
                    self.next.subject = Some(subject);
                    true
                }
                None => false,
            },
            ProposalState::StrategiesPending => self.sample_strategies(ctx) > 0,
            ProposalState::Ready => true,
        };

        self.next.state = state.step(succeeded);
        if !succeeded {
            self.next.discard();
            self.retry_bias = (self.retry_bias + self.config.retry_bias_step).min(self.config.max_retry_bias);
            debug!(
                step = ?state,
                retry_bias = self.retry_bias,
                "Shot proposal discarded"
            );
        }
    }

    /// Choose the event the next shot cuts on.
    fn try_find_cut(&mut self, ctx: &DirectorContext<'_>) -> Option<CutSelection> {
        let trigger = self.next.trigger.clone()?;
        let range = evaluate_cut_range(&trigger, ctx.engine, &mut self.rng);
        let min_t = trigger.timestamp + range.min;
        let max_t = trigger.timestamp + range.max * (1.0 + self.retry_bias);

        let groups: Vec<&EmotionEventGroup> = ctx.scheduler.future_groups(min_t, max_t);
        if groups.is_empty() {
            debug!(min_t, max_t, "No future event group in cut window");
            return None;
        }

        let event = match groups.iter().find_map(|g| g.structural_event()) {
            Some(structural) => structural.clone(),
            None => {
                let group = select_weighted(&groups, |g| g.priority(), &mut self.rng)?;
                select_weighted(&group.events, event_priority, &mut self.rng)?.clone()
            }
        };

        let duration = event.timestamp - trigger.timestamp;
        if duration <= 0.0 {
            return None;
        }

        debug!(
            trigger = %trigger,
            cut = %event,
            duration,
            "Cut selected"
        );
        Some(CutSelection { event, duration })
    }

    /// Importance-weighted subject draw, skipping points buried in the floor.
    fn select_subject(&mut self, ctx: &DirectorContext<'_>) -> Option<Subject> {
        if self.points.is_empty() {
            return None;
        }
        if self.ranking.len() != self.points.len() {
            self.rank_interest_points(ctx.engine, ctx.time);
        }

        let primary_count = self.primary_count();
        let sky = self.grid.bounds().max.y;
        let heuristic = HeuristicContext::new(ctx.engine, &self.grid, ctx.time).with_viewer(self.viewer());
        let weights: Vec<f64> = self
            .ranking
            .iter()
            .map(|id| {
                self.points
                    .get(id)
                    .map(|p| p.evaluate_heuristic(&heuristic, true))
                    .unwrap_or(0.0)
            })
            .collect();

        for _ in 0..self.config.subject_attempts {
            let rank = select_weighted_index(&weights, &mut self.rng)?;
            let point = match self.points.get(&self.ranking[rank]) {
                Some(point) => point,
                None => continue,
            };
            if is_buried(point, ctx.scene, sky) {
                debug!(subject = point.id, "Subject below the floor, redrawing");
                continue;
            }
            return Some(Subject::new(point.clone(), rank < primary_count));
        }

        None
    }

    /// Sample strategies for the chosen subject and keep those that placed a
    /// camera. Returns how many were kept.
    fn sample_strategies(&mut self, ctx: &DirectorContext<'_>) -> usize {
        let (trigger, subject) = match (&self.next.trigger, &self.next.subject) {
            (Some(trigger), Some(subject)) => (trigger.clone(), subject.clone()),
            _ => return 0,
        };
        let duration = self.next.duration();

        let mut strategy_ctx = StrategyContext {
            engine: ctx.engine,
            grid: &self.grid,
            points: &self.points,
            scene: ctx.scene,
            rng: &mut self.rng,
            config: &self.strategy_config,
            time: ctx.time,
        };

        for sample in 0..self.config.max_strategy_samples {
            let mut strategy = self.factory.sample(strategy_ctx.rng, &self.strategy_config);
            if !strategy.propose(&mut strategy_ctx, &trigger, &subject, duration) {
                debug!(sample, kind = %strategy.kind(), subject = subject.id(), "Strategy proposal failed");
                continue;
            }

            let frustum = self
                .projection
                .with_field_of_view(strategy.composition().field_of_view)
                .frustum(&strategy.pose());
            let framed = self.grid.frustum_query(&frustum);
            let score = strategy.evaluate(&strategy_ctx, &trigger, &framed);
            debug!(
                sample,
                kind = %strategy.kind(),
                subject = subject.id(),
                framed = framed.len(),
                score,
                "Strategy proposal scored"
            );
            self.next.candidates.push(ScoredStrategy { strategy, score });
        }

        self.next.candidates.len()
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Replace the current shot with the ready proposal.
    fn commit_next(&mut self, ctx: &DirectorContext<'_>) -> bool {
        let proposal = std::mem::take(&mut self.next);
        let (trigger, cut, subject) = match (proposal.trigger, proposal.cut, proposal.subject) {
            (Some(trigger), Some(cut), Some(subject)) => (trigger, cut, subject),
            _ => return false,
        };

        let mut candidates = proposal.candidates;
        if candidates.is_empty() {
            return false;
        }
        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let winner = select_weighted_index(&scores, &mut self.rng).unwrap_or(0);
        let ScoredStrategy { mut strategy, score } = candidates.swap_remove(winner);

        if let Some(previous) = self.current.as_mut() {
            previous.strategy.stop();
        }

        let mut strategy_ctx = StrategyContext {
            engine: ctx.engine,
            grid: &self.grid,
            points: &self.points,
            scene: ctx.scene,
            rng: &mut self.rng,
            config: &self.strategy_config,
            time: ctx.time,
        };
        strategy.start(&mut strategy_ctx);

        let index = self.history.len();
        let (position_damping, rotation_damping) = strategy.damping();
        let noise_seed = self.rng.next_u64();
        self.camera = Some(
            ShotCamera::new(index, strategy.pose(), *strategy.composition())
                .with_damping(position_damping, rotation_damping)
                .with_projection(self.projection)
                .with_subject(subject.point.position)
                .with_noise(strategy.noise(), noise_seed),
        );

        let record = ShotRecord {
            index,
            subject_id: subject.id(),
            kind: strategy.kind(),
            duration: cut.duration,
            start_time: ctx.time,
            transition: proposal.transition,
            repeated: false,
        };
        info!(
            shot = index,
            subject = record.subject_id,
            kind = %record.kind,
            primary = subject.primary,
            duration = cut.duration,
            score,
            time = ctx.time,
            "Shot committed"
        );
        self.history.push(record);

        self.current_cut_time = (ctx.time - trigger.timestamp).max(0.0);
        self.next = ShotInformation::with_trigger(cut.event.clone());
        self.current = Some(ActiveShot {
            index,
            trigger,
            cut,
            subject,
            strategy,
            transition: proposal.transition,
        });
        self.retry_bias = 0.0;
        true
    }

    /// Play the current shot again when no proposal is ready in time.
    fn recommit_current(&mut self, ctx: &DirectorContext<'_>) {
        let current = match self.current.as_mut() {
            Some(current) => current,
            None => return,
        };

        current.strategy.stop();
        let mut strategy_ctx = StrategyContext {
            engine: ctx.engine,
            grid: &self.grid,
            points: &self.points,
            scene: ctx.scene,
            rng: &mut self.rng,
            config: &self.strategy_config,
            time: ctx.time,
        };
        current.strategy.start(&mut strategy_ctx);

        // The repeat runs a full duration from now, cutting on a stand-in
        // event at its new end.
        let duration = current.duration();
        let mut trigger = current.cut.event.clone();
        trigger.timestamp = ctx.time;
        let mut end = current.cut.event.clone();
        end.timestamp = ctx.time + duration;
        current.trigger = trigger;
        current.cut.event = end;
        self.current_cut_time = 0.0;

        // Only called with no ready proposal; restart it from the new end.
        self.next = ShotInformation::with_trigger(current.cut.event.clone());

        let index = self.history.len();
        let (position_damping, rotation_damping) = current.strategy.damping();
        let noise_seed = self.rng.next_u64();
        self.camera = Some(
            ShotCamera::new(index, current.strategy.pose(), *current.strategy.composition())
                .with_damping(position_damping, rotation_damping)
                .with_projection(self.projection)
                .with_subject(current.subject.point.position)
                .with_noise(current.strategy.noise(), noise_seed),
        );

        warn!(
            shot = index,
            subject = current.subject.id(),
            kind = %current.kind(),
            state = ?self.next.state,
            "No shot ready at cut time, repeating current shot"
        );
        self.history.push(ShotRecord {
            index,
            subject_id: current.subject.id(),
            kind: current.kind(),
            duration,
            start_time: ctx.time,
            transition: current.transition,
            repeated: true,
        });
    }
}

impl EventListener for ShotDirector {
    fn on_event_dispatch(&mut self, event: &EmotionEvent) {
        if self.current.is_some() {
            return;
        }
        // A trigger whose window kept failing gives way to a fresher event.
        let exhausted = self.next.state == ProposalState::Empty && self.retry_bias >= self.config.max_retry_bias;
        if self.next.trigger.is_none() && self.pending_trigger.is_none() {
            debug!(event = %event, "First trigger received");
            self.pending_trigger = Some(event.clone());
        } else if exhausted {
            debug!(event = %event, "Replacing exhausted trigger");
            self.next = ShotInformation::with_trigger(event.clone());
            self.retry_bias = 0.0;
        }
    }

    fn on_event_group_dispatch(&mut self, group: &EmotionEventGroup) {
        debug!(group = group.index, events = group.events.len(), "Event group dispatched");
    }
}

/// True when the floor covers the point's lowest extent.
fn is_buried(point: &InterestPoint, scene: &dyn SceneGeometry, sky: f64) -> bool {
    let lowest = point.lowest_point();
    let sky = sky.max(lowest.y + 1.0);
    let drop = sky - lowest.y;
    let ray = Ray::new(Point3::new(lowest.x, sky, lowest.z), -Vector3::y());
    match scene.raycast_floor(&ray, drop) {
        Some(hit) => hit.distance < drop - 1e-9,
        None => false,
    }
}
