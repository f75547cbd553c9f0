use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ConceptId;
use crate::mastery::ConceptMastery;

/// Default cap on the learner-wide recent-outcome window (§3, M ≤ 50).
pub const DEFAULT_LEARNER_WINDOW: usize = 50;

/// Default cap on the timestamped momentum log (§4.6a's temporal-momentum
/// signal looks at the last 10 by default).
pub const DEFAULT_MOMENTUM_LOG: usize = 10;

/// Coarse learning-state label driving pedagogical decisions in step 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerState {
    New,
    Learning,
    Progressing,
    Mastering,
    Struggling,
    Recovery,
}

/// Per-learner state exclusively owning its `ConceptMastery` entries.
/// Mutations are serialized per learner by the engine's registry (§5); this
/// type itself has no internal locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub masteries: HashMap<ConceptId, ConceptMastery>,
    pub adaptive_learning_rates: HashMap<ConceptId, f64>,
    pub stress_tolerance: f64,
    /// Outcomes across all concepts, most-recent last, bounded by `window_capacity`.
    overall_window: VecDeque<bool>,
    window_capacity: usize,
    pub struggle_counters: HashMap<ConceptId, u32>,
    /// Timestamped outcomes across all concepts, feeding the transfer
    /// engine's temporal-momentum signal for cold-start boosts.
    momentum_log: VecDeque<(bool, DateTime<Utc>)>,
    momentum_capacity: usize,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            masteries: HashMap::new(),
            adaptive_learning_rates: HashMap::new(),
            stress_tolerance: 0.5,
            overall_window: VecDeque::with_capacity(DEFAULT_LEARNER_WINDOW),
            window_capacity: DEFAULT_LEARNER_WINDOW,
            struggle_counters: HashMap::new(),
            momentum_log: VecDeque::with_capacity(DEFAULT_MOMENTUM_LOG),
            momentum_capacity: DEFAULT_MOMENTUM_LOG,
        }
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity.max(1);
        self
    }

    pub fn with_momentum_capacity(mut self, capacity: usize) -> Self {
        self.momentum_capacity = capacity.max(1);
        self
    }

    pub fn momentum_log(&self) -> &VecDeque<(bool, DateTime<Utc>)> {
        &self.momentum_log
    }

    pub fn push_momentum(&mut self, correct: bool, timestamp: DateTime<Utc>) {
        self.momentum_log.push_back((correct, timestamp));
        while self.momentum_log.len() > self.momentum_capacity {
            self.momentum_log.pop_front();
        }
    }

    pub fn overall_window(&self) -> &VecDeque<bool> {
        &self.overall_window
    }

    pub fn push_overall_outcome(&mut self, correct: bool) {
        self.overall_window.push_back(correct);
        while self.overall_window.len() > self.window_capacity {
            self.overall_window.pop_front();
        }
    }

    pub fn overall_success_rate(&self) -> Option<f64> {
        if self.overall_window.is_empty() {
            return None;
        }
        let correct = self.overall_window.iter().filter(|c| **c).count();
        Some(correct as f64 / self.overall_window.len() as f64)
    }

    /// Overall window accuracy used by step 13's learner-state classification.
    /// Learners with no history are treated as `New`, not `Struggling`.
    pub fn learner_state(&self) -> LearnerState {
        let Some(acc) = self.overall_success_rate() else {
            return LearnerState::New;
        };
        if self.masteries.values().any(|m| m.recovery_boost > 0.0 || m.enhanced_recovery_boost > 0.0) {
            return LearnerState::Recovery;
        }
        if acc < 0.3 {
            LearnerState::Struggling
        } else if acc < 0.6 {
            LearnerState::Learning
        } else if acc < 0.8 {
            LearnerState::Progressing
        } else {
            LearnerState::Mastering
        }
    }

    pub fn mastery_of(&self, concept: &str) -> Option<f64> {
        self.masteries.get(concept).map(|m| m.mastery)
    }

    pub fn count_learned_related(&self, related: &[ConceptId], threshold: f64) -> usize {
        related
            .iter()
            .filter(|c| self.masteries.get(*c).map(|m| m.mastery >= threshold).unwrap_or(false))
            .count()
    }
}

/// Read-only, serialization-stable view of a `LearnerProfile` returned by the
/// `profile(learner_id)` external operation (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub learner_id: String,
    pub masteries: HashMap<ConceptId, ConceptMastery>,
    pub stress_tolerance: f64,
    pub overall_success_rate: Option<f64>,
    pub learner_state: LearnerState,
}

impl From<&LearnerProfile> for ProfileSnapshot {
    fn from(p: &LearnerProfile) -> Self {
        Self {
            learner_id: p.learner_id.clone(),
            masteries: p.masteries.clone(),
            stress_tolerance: p.stress_tolerance,
            overall_success_rate: p.overall_success_rate(),
            learner_state: p.learner_state(),
        }
    }
}
