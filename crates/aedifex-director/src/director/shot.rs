//! Shot bookkeeping: proposals in flight, the active shot and history.

use aedifex_models::EmotionEvent;
use serde::{Deserialize, Serialize};

use crate::interest::InterestPointId;
use crate::strategy::{CameraStrategy, StrategyKind, Subject};

/// How the director moves from one shot to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    Cut,
    Blend,
}

/// Progress of the next-shot proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProposalState {
    /// Cut time not chosen yet.
    #[default]
    Empty,
    /// Cut chosen, waiting for a subject.
    SubjectPending,
    /// Subject chosen, waiting for strategy samples.
    StrategiesPending,
    /// Ready to commit.
    Ready,
}

impl ProposalState {
    /// State after one step. A failed step discards the proposal.
    pub fn step(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (ProposalState::Ready, _) => ProposalState::Ready,
            (_, false) => ProposalState::Empty,
            (ProposalState::Empty, true) => ProposalState::SubjectPending,
            (ProposalState::SubjectPending, true) => ProposalState::StrategiesPending,
            (ProposalState::StrategiesPending, true) => ProposalState::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        *self == ProposalState::Ready
    }
}

/// Strategy sample that placed its camera, with its score.
pub struct ScoredStrategy {
    pub strategy: Box<dyn CameraStrategy>,
    pub score: f64,
}

/// Cut chosen for a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct CutSelection {
    /// Event the shot will end on, and the trigger of the shot after it.
    pub event: EmotionEvent,
    /// Normalized shot duration.
    pub duration: f64,
}

/// Shot being assembled.
#[derive(Default)]
pub struct ShotInformation {
    pub state: ProposalState,
    /// Event the shot starts on.
    pub trigger: Option<EmotionEvent>,
    pub cut: Option<CutSelection>,
    pub transition: TransitionType,
    pub subject: Option<Subject>,
    pub candidates: Vec<ScoredStrategy>,
}

impl ShotInformation {
    pub fn with_trigger(trigger: EmotionEvent) -> Self {
        Self {
            trigger: Some(trigger),
            ..Self::default()
        }
    }

    /// Drop everything but the trigger.
    pub fn discard(&mut self) {
        self.state = ProposalState::Empty;
        self.cut = None;
        self.subject = None;
        self.candidates.clear();
    }

    pub fn duration(&self) -> f64 {
        self.cut.as_ref().map(|c| c.duration).unwrap_or(0.0)
    }
}

/// Shot on screen.
pub struct ActiveShot {
    pub index: usize,
    pub trigger: EmotionEvent,
    pub cut: CutSelection,
    pub subject: Subject,
    pub strategy: Box<dyn CameraStrategy>,
    pub transition: TransitionType,
}

impl ActiveShot {
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn duration(&self) -> f64 {
        self.cut.duration
    }
}

/// Committed shot, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotRecord {
    pub index: usize,
    pub subject_id: InterestPointId,
    pub kind: StrategyKind,
    /// Normalized duration.
    pub duration: f64,
    /// Normalized playback time of the commit.
    pub start_time: f64,
    pub transition: TransitionType,
    /// Re-commit of the previous shot after a failed proposal.
    pub repeated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_step_function() {
        let mut state = ProposalState::Empty;
        state = state.step(true);
        assert_eq!(state, ProposalState::SubjectPending);
        state = state.step(true);
        assert_eq!(state, ProposalState::StrategiesPending);
        state = state.step(true);
        assert!(state.is_ready());
        assert!(state.step(false).is_ready());

        assert_eq!(ProposalState::StrategiesPending.step(false), ProposalState::Empty);
        assert_eq!(ProposalState::Empty.step(false), ProposalState::Empty);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ShotRecord {
            index: 0,
            subject_id: 3,
            kind: StrategyKind::Orbit,
            duration: 0.1,
            start_time: 0.2,
            transition: TransitionType::Cut,
            repeated: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["subjectId"], 3);
        assert_eq!(json["kind"], "orbit");
        assert_eq!(json["transition"], "cut");
    }
}
