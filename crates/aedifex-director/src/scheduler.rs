//! Event scheduler.
//!
//! Subdivides the piece into fixed-width buckets and groups events per bucket.
//! Groups are pushed when playback enters their bucket; single events are
//! pushed once playback passes their timestamp. Future buckets can be queried
//! ahead of time to plan cuts.

use std::collections::VecDeque;

use aedifex_models::{EmotionEvent, EmotionEventType};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::{DirectorError, DirectorResult};
use crate::signal::EmotionEngine;

/// All events sharing one time bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionEventGroup {
    /// Bucket index.
    pub index: usize,
    pub events: Vec<EmotionEvent>,
}

impl EmotionEventGroup {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_intensity(&self) -> f64 {
        self.events.iter().map(|e| e.intensity).sum()
    }

    /// Starts that open a new segment.
    pub fn introduced_elements(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == EmotionEventType::Start && e.chunk_delimits_segment)
            .count()
    }

    /// Starts minus ends: positive when elements appear, negative when they leave.
    pub fn elements_changed(&self) -> i64 {
        self.events
            .iter()
            .map(|e| match e.event_type {
                EmotionEventType::Start => 1,
                EmotionEventType::End => -1,
                _ => 0,
            })
            .sum()
    }

    /// How strongly this group deserves a cut.
    pub fn priority(&self) -> f64 {
        let introduced = 1.0 + self.introduced_elements() as f64 * 4.0;
        let changed = 1.0 + self.elements_changed().unsigned_abs() as f64 * 2.0;
        self.total_intensity() * introduced * changed
    }

    /// First structural extremum in the group.
    pub fn structural_event(&self) -> Option<&EmotionEvent> {
        self.events.iter().find(|e| e.is_structural())
    }

    pub fn contains_structural_event(&self) -> bool {
        self.structural_event().is_some()
    }
}

/// Receiver of scheduled events.
pub trait EventListener {
    fn on_event_dispatch(&mut self, event: &EmotionEvent);
    fn on_event_group_dispatch(&mut self, group: &EmotionEventGroup);
}

/// Everything one scheduler tick dispatched, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct DispatchBatch {
    pub groups: Vec<EmotionEventGroup>,
    pub events: Vec<EmotionEvent>,
}

impl DispatchBatch {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.events.is_empty()
    }

    /// Replay the batch into a listener: groups first, then events.
    pub fn deliver(&self, listener: &mut dyn EventListener) {
        for group in &self.groups {
            listener.on_event_group_dispatch(group);
        }
        for event in &self.events {
            listener.on_event_dispatch(event);
        }
    }
}

/// Bucketed live and look-ahead access to the event stream.
pub struct EventScheduler {
    groups: Vec<EmotionEventGroup>,
    /// Bucket width in normalized time.
    bucket_width: f64,
    queue: VecDeque<EmotionEvent>,
    /// First bucket not yet dispatched.
    next_bucket: usize,
    listeners: Vec<Box<dyn EventListener + Send>>,
}

impl EventScheduler {
    /// Bucket the engine's events.
    ///
    /// # Errors
    /// `InvalidConfig` if `resolution_per_beat` is zero.
    pub fn new(engine: &EmotionEngine, config: &SchedulerConfig) -> DirectorResult<Self> {
        if config.resolution_per_beat == 0 {
            return Err(DirectorError::invalid_config("resolution_per_beat must be positive"));
        }

        let width_secs = engine.beat_duration() / config.resolution_per_beat as f64;
        let bucket_count = ((engine.duration() / width_secs).ceil() as usize).max(1);
        let bucket_width = width_secs / engine.duration();

        let mut groups: Vec<EmotionEventGroup> = (0..bucket_count)
            .map(|index| EmotionEventGroup {
                index,
                events: Vec::new(),
            })
            .collect();

        let mut scheduler = Self {
            groups: Vec::new(),
            bucket_width,
            queue: VecDeque::new(),
            next_bucket: 0,
            listeners: Vec::new(),
        };

        for event in engine.events() {
            let index = scheduler.index_for(event.timestamp, bucket_count);
            groups[index].events.push(event.clone());
        }
        scheduler.groups = groups;

        debug!(
            bucket_count,
            bucket_width,
            non_empty = scheduler.groups.iter().filter(|g| !g.is_empty()).count(),
            "Event scheduler bucketed events"
        );

        Ok(scheduler)
    }

    fn index_for(&self, t: f64, bucket_count: usize) -> usize {
        let raw = (t / self.bucket_width).floor();
        if raw.is_nan() || raw < 0.0 {
            return 0;
        }
        (raw as usize).min(bucket_count - 1)
    }

    /// Bucket containing normalized time `t`.
    pub fn group_index_for_time(&self, t: f64) -> usize {
        self.index_for(t, self.groups.len())
    }

    pub fn bucket_count(&self) -> usize {
        self.groups.len()
    }

    /// Bucket width in normalized time.
    pub fn bucket_width(&self) -> f64 {
        self.bucket_width
    }

    pub fn group(&self, index: usize) -> Option<&EmotionEventGroup> {
        self.groups.get(index)
    }

    /// Register a listener; it receives every later dispatch.
    pub fn add_listener(&mut self, listener: Box<dyn EventListener + Send>) {
        self.listeners.push(listener);
    }

    /// Events waiting for playback to pass their timestamp.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Rewind playback to the beginning.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.next_bucket = 0;
    }

    /// Advance playback to `current_time` and dispatch.
    ///
    /// Every bucket entered since the last call is dispatched in order, so a
    /// long tick never skips a group. Queued events strictly before
    /// `current_time` follow.
    pub fn update(&mut self, current_time: f64) -> DispatchBatch {
        let mut batch = DispatchBatch::default();
        let current = self.group_index_for_time(current_time);

        while self.next_bucket <= current {
            let group = &self.groups[self.next_bucket];
            if !group.is_empty() {
                self.queue.extend(group.events.iter().cloned());
                batch.groups.push(group.clone());
            }
            self.next_bucket += 1;
        }

        while self
            .queue
            .front()
            .is_some_and(|e| e.timestamp < current_time)
        {
            if let Some(event) = self.queue.pop_front() {
                batch.events.push(event);
            }
        }

        for listener in &mut self.listeners {
            batch.deliver(listener.as_mut());
        }

        batch
    }

    /// Non-empty groups with bucket index in `(index(min_t), index(max_t)]`.
    pub fn future_groups(&self, min_t: f64, max_t: f64) -> Vec<&EmotionEventGroup> {
        let start = self.group_index_for_time(min_t) + 1;
        let end = self.group_index_for_time(max_t);
        if start > end {
            return Vec::new();
        }
        self.groups[start..=end]
            .iter()
            .filter(|g| !g.is_empty())
            .collect()
    }
}
