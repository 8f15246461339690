//! End-to-end tests of the signal, scheduling and directing pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aedifex_director::strategy::Framing;
use aedifex_director::{
    AedifexConfig, BoxScene, CameraStrategy, DirectorContext, EmotionEngine, EventListener,
    EventScheduler, GridConfig, InterestPoint, InterestPointGrid, OpenScene, ShotDirector,
    SignalConfig, Simulation, StrategyConfig, StrategyContext, StrategyFactory, StrategyKind,
    WeightedStrategyFactory,
};
use aedifex_models::{
    CoreEmotion, DataContainer, EmotionData, EmotionEvent, EmotionEventType, IntensityCurve,
    TrackCategory, TrackChunkData, TrackData,
};
use nalgebra::Point3;
use rand::RngCore;

const DURATION_SECS: f64 = 30.0;

fn data(emotion: CoreEmotion) -> EmotionData {
    EmotionData::from_vectors(vec![emotion.vector()])
}

/// Arrangement with a four-part structure, a melody and a busy rhythm track.
fn arrangement() -> DataContainer {
    let structure = TrackData::new("structure", TrackCategory::Structure)
        .with_chunk(TrackChunkData::new(0.0, 0.25, data(CoreEmotion::Joy), IntensityCurve::Invariant))
        .with_chunk(TrackChunkData::new(
            0.25,
            0.5,
            data(CoreEmotion::Anticipation),
            IntensityCurve::LinearIncreasing,
        ))
        .with_chunk(TrackChunkData::new(0.5, 0.75, data(CoreEmotion::Anger), IntensityCurve::SmoothSpike))
        .with_chunk(TrackChunkData::new(
            0.75,
            1.0,
            data(CoreEmotion::Sadness),
            IntensityCurve::LinearDecreasing,
        ));

    let mut melody = TrackData::new("melody", TrackCategory::MainMelody);
    for i in 0..10 {
        let start = i as f64 * 0.1;
        let emotion = if i % 2 == 0 { CoreEmotion::Joy } else { CoreEmotion::Trust };
        melody = melody.with_chunk(
            TrackChunkData::new(start, start + 0.08, data(emotion), IntensityCurve::Invariant)
                .with_variation(i % 3 == 0)
                .with_harmony(i % 4),
        );
    }

    let mut drums = TrackData::new("drums", TrackCategory::Rythm);
    for i in 0..20 {
        let start = i as f64 * 0.05;
        drums = drums.with_chunk(TrackChunkData::new(
            start,
            start + 0.03,
            data(CoreEmotion::Anger),
            IntensityCurve::LinearDecreasing,
        ));
    }

    DataContainer::new()
        .with_tempo(120.0, 4)
        .with_track(structure)
        .with_track(melody)
        .with_track(drums)
}

fn config(seed: u64) -> AedifexConfig {
    let mut config = AedifexConfig::default().with_seed(seed);
    config.signal = SignalConfig::default().with_downsample_rate(64);
    config.grid = GridConfig::default().with_resolution(16);
    config
}

fn engine(config: &AedifexConfig) -> Arc<EmotionEngine> {
    Arc::new(
        EmotionEngine::from_sample_count(arrangement(), 48_000, DURATION_SECS, config.signal.clone())
            .unwrap(),
    )
}

fn interest_points() -> Vec<InterestPoint> {
    vec![
        InterestPoint::new(1, Point3::new(0.0, 2.0, 0.0))
            .with_importance(5)
            .with_affinity(CoreEmotion::Joy, 0.5),
        InterestPoint::new(2, Point3::new(30.0, 4.0, -20.0)).with_importance(3),
        InterestPoint::new(3, Point3::new(-25.0, 1.5, 15.0))
            .with_importance(2)
            .with_affinity(CoreEmotion::Anger, 1.0),
        InterestPoint::new(4, Point3::new(10.0, 8.0, 40.0)).with_importance(1),
        // Under the floor: never a subject.
        InterestPoint::new(5, Point3::new(0.0, -20.0, 0.0)).with_importance(4),
    ]
}

fn scene() -> BoxScene {
    BoxScene::new()
        .with_floor(0.0)
        .with_box(aedifex_director::Aabb::new(
            Point3::new(-60.0, 0.0, 30.0),
            Point3::new(-40.0, 20.0, 50.0),
        ))
}

fn simulate(seed: u64) -> Vec<aedifex_director::ShotRecord> {
    let config = config(seed);
    let mut simulation = Simulation::new(engine(&config), Box::new(scene()), &config).unwrap();
    assert_eq!(simulation.add_interest_points(interest_points()), 5);
    simulation.run(30.0).unwrap().to_vec()
}

#[test]
fn test_structure_and_melody_events() {
    let structure = TrackData::new("structure", TrackCategory::Structure).with_chunk(TrackChunkData::new(
        0.0,
        1.0,
        data(CoreEmotion::Joy),
        IntensityCurve::LinearIncreasing,
    ));
    let melody = TrackData::new("melody", TrackCategory::MainMelody).with_chunk(TrackChunkData::new(
        0.0,
        0.5,
        data(CoreEmotion::Trust),
        IntensityCurve::Invariant,
    ));
    let container = DataContainer::new().with_track(structure).with_track(melody);
    let value = container.tracks[1].chunks[0].value_at(0.0);
    let peak = container.tracks[0].chunks[0].value_at(1.0);

    let engine = EmotionEngine::from_sample_count(
        container,
        10_000,
        DURATION_SECS,
        SignalConfig::default().with_downsample_rate(100),
    )
    .unwrap();
    let events = engine.events();
    assert_eq!(events.len(), 3);

    let start = events.iter().find(|e| e.event_type == EmotionEventType::Start).unwrap();
    assert_eq!(start.timestamp, 0.0);
    assert!((start.intensity - value * 2.0).abs() < 1e-9);
    assert!(start.chunk_delimits_segment);

    let end = events.iter().find(|e| e.event_type == EmotionEventType::End).unwrap();
    assert_eq!(end.timestamp, 0.5);

    let maximum = events
        .iter()
        .find(|e| e.event_type == EmotionEventType::LocalMaximum)
        .unwrap();
    assert_eq!(maximum.timestamp, 1.0);
    assert!((maximum.intensity - peak).abs() < 1e-9);
}

#[test]
fn test_event_queue_is_sorted() {
    let config = config(0);
    let engine = engine(&config);
    let queue = engine.events_as_queue();
    assert!(!queue.is_empty());
    assert!(queue
        .iter()
        .zip(queue.iter().skip(1))
        .all(|(a, b)| a.timestamp <= b.timestamp));
}

#[test]
fn test_future_groups_stay_inside_window() {
    let config = config(0);
    let engine = engine(&config);
    let scheduler = EventScheduler::new(&engine, &config.scheduler).unwrap();
    let width = scheduler.bucket_width();

    for (from, span) in [(0.0, 0.05), (0.1, 0.2), (0.42, 0.01), (0.9, 0.5)] {
        for group in scheduler.future_groups(from, from + span) {
            for event in &group.events {
                assert!(event.timestamp > from - width);
                assert!(event.timestamp <= from + span + width);
            }
        }
    }
}

#[test]
fn test_grid_single_cell_scenario() {
    let grid_config = GridConfig::default()
        .with_resolution(1)
        .with_bounds(Point3::new(-10.0, -10.0, -10.0), Point3::new(10.0, 10.0, 10.0));
    let mut grid = InterestPointGrid::new(&grid_config).unwrap();
    let spot = Point3::new(1.0, 1.0, 1.0);
    grid.add(&InterestPoint::new(1, spot).with_importance(1));
    grid.add(&InterestPoint::new(2, spot).with_importance(3));
    assert_eq!(grid.importance_sum(&spot), 4.0);
    assert_eq!(grid.average_importance(&spot), 2.0);
}

#[test]
fn test_playback_is_deterministic() {
    let first = simulate(42);
    let second = simulate(42);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_playback_history_is_coherent() {
    let history = simulate(3);
    assert!(!history.is_empty());
    assert!(history.iter().all(|r| r.subject_id != 5));
    assert!(history.iter().all(|r| r.duration > 0.0));
    assert!(history
        .iter()
        .zip(history.iter().skip(1))
        .all(|(a, b)| a.start_time <= b.start_time && a.index + 1 == b.index));
    assert!(!history[0].repeated);
}

/// Strategy that never finds a camera position.
struct FailingStrategy {
    framing: Framing,
}

impl CameraStrategy for FailingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dolly
    }

    fn propose(
        &mut self,
        _ctx: &mut StrategyContext<'_>,
        _event: &EmotionEvent,
        _subject: &aedifex_director::strategy::Subject,
        _duration: f64,
    ) -> bool {
        false
    }

    fn start(&mut self, _ctx: &mut StrategyContext<'_>) {}

    fn update(&mut self, _ctx: &StrategyContext<'_>, _camera_time: f64) {}

    fn framing(&self) -> &Framing {
        &self.framing
    }

    fn damping(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

/// Hands out failing strategies for the first `failures` samples.
struct FlakyFactory {
    failures: usize,
    sampled: AtomicUsize,
    inner: WeightedStrategyFactory,
}

impl StrategyFactory for FlakyFactory {
    fn create(&self, kind: StrategyKind, config: &StrategyConfig) -> Box<dyn CameraStrategy> {
        self.inner.create(kind, config)
    }

    fn sample(&self, rng: &mut dyn RngCore, config: &StrategyConfig) -> Box<dyn CameraStrategy> {
        if self.sampled.fetch_add(1, Ordering::SeqCst) < self.failures {
            Box::new(FailingStrategy {
                framing: Framing::new(config),
            })
        } else {
            self.inner.sample(rng, config)
        }
    }
}

#[test]
fn test_forced_strategy_failure_still_commits() {
    let config = config(9);
    let engine = engine(&config);
    let scheduler = EventScheduler::new(&engine, &config.scheduler).unwrap();
    let scene = OpenScene;
    let mut director = ShotDirector::new(&config).unwrap().with_factory(Box::new(FlakyFactory {
        failures: 20,
        sampled: AtomicUsize::new(0),
        inner: WeightedStrategyFactory::new(),
    }));
    for point in interest_points() {
        director.register_interest_point(point);
    }

    director.on_event_dispatch(&engine.events()[0]);
    let ctx = DirectorContext {
        engine: &engine,
        scheduler: &scheduler,
        scene: &scene,
        time: 0.0,
    };

    let mut ticks = 0;
    while director.current_shot().is_none() && ticks < 60 {
        director.update(&ctx, 1.0 / 30.0);
        ticks += 1;
    }

    assert!(director.current_shot().is_some(), "no shot after {} ticks", ticks);
    assert_eq!(director.history().len(), 1);
    assert_eq!(director.retry_bias(), 0.0);
}

#[test]
fn test_simulation_rejects_bad_tick_rate() {
    let config = config(0);
    let mut simulation = Simulation::new(engine(&config), Box::new(OpenScene), &config).unwrap();
    assert!(simulation.run(0.0).is_err());
}

/// Melody that falls silent after the first 40% of the piece.
fn front_loaded() -> DataContainer {
    let mut melody = TrackData::new("melody", TrackCategory::MainMelody);
    for i in 0..8 {
        let start = i as f64 * 0.05;
        let emotion = if i % 2 == 0 { CoreEmotion::Joy } else { CoreEmotion::Trust };
        melody = melody.with_chunk(TrackChunkData::new(
            start,
            start + 0.03,
            data(emotion),
            IntensityCurve::Invariant,
        ));
    }
    DataContainer::new().with_tempo(120.0, 4).with_track(melody)
}

#[test]
fn test_silent_tail_repeats_shots_at_full_length() {
    const TICK_HZ: f64 = 30.0;
    const LENGTH_SECS: f64 = 60.0;
    let tick = 1.0 / TICK_HZ / LENGTH_SECS;

    let config = config(42);
    let engine = Arc::new(
        EmotionEngine::from_sample_count(front_loaded(), 96_000, LENGTH_SECS, config.signal.clone()).unwrap(),
    );
    let last_event = engine.events().last().unwrap().timestamp;
    assert!(last_event <= 0.4);

    let mut simulation = Simulation::new(engine, Box::new(scene()), &config).unwrap();
    simulation.add_interest_points(interest_points());
    let history = simulation.run(TICK_HZ).unwrap().to_vec();

    let repeats: Vec<_> = history.iter().filter(|r| r.repeated).collect();
    assert!(repeats.len() >= 2, "expected a run of repeats, got {}", repeats.len());

    for (a, b) in history.iter().zip(history.iter().skip(1)) {
        let gap = b.start_time - a.start_time;
        assert!(gap > 2.0 * tick, "shots {} and {} are {} apart", a.index, b.index, gap);
        if a.repeated {
            assert!(
                (gap - a.duration).abs() <= 3.0 * tick,
                "repeat {} lasted {} instead of {}",
                a.index,
                gap,
                a.duration
            );
        }
    }
}
