use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mastery probabilities are held strictly inside `(0, 1)`, never exactly at
/// the boundary. `1 - MASTERY_EPSILON` and `MASTERY_EPSILON` are the clamp
/// rails used throughout the engine.
pub const MASTERY_EPSILON: f64 = 5e-3;

/// Default cap on the per-concept recent-outcome window (§3, N ≤ 20).
pub const DEFAULT_CONCEPT_WINDOW: usize = 20;

/// Per (learner, concept) state maintained exclusively by the BKT update
/// core. Created on first interaction, mutated only by `bkt::update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptMastery {
    pub mastery: f64,
    pub confidence: f64,
    pub practice_count: u64,
    pub last_interaction: DateTime<Utc>,
    pub learning_rate: f64,
    pub slip_rate: f64,
    pub guess_rate: f64,
    pub decay_rate: f64,
    pub consecutive_errors: u32,
    /// Last `N` outcomes, oldest first; bounded by `window_capacity`.
    recent_window: VecDeque<bool>,
    window_capacity: usize,
    /// Currently active recovery boost magnitude (0 when inactive).
    pub recovery_boost: f64,
    /// "Enhanced" recovery boost activated after 4+ consecutive errors.
    pub enhanced_recovery_boost: f64,
}

impl ConceptMastery {
    pub fn new(initial_mastery: f64, now: DateTime<Utc>) -> Self {
        Self {
            mastery: clamp_mastery(initial_mastery),
            confidence: 0.0,
            practice_count: 0,
            last_interaction: now,
            learning_rate: 0.3,
            slip_rate: 0.15,
            guess_rate: 0.2,
            decay_rate: 0.05,
            consecutive_errors: 0,
            recent_window: VecDeque::with_capacity(DEFAULT_CONCEPT_WINDOW),
            window_capacity: DEFAULT_CONCEPT_WINDOW,
            recovery_boost: 0.0,
            enhanced_recovery_boost: 0.0,
        }
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity.max(1);
        self
    }

    pub fn window(&self) -> &VecDeque<bool> {
        &self.recent_window
    }

    /// Append an outcome, trimming the window to `window_capacity`.
    pub fn push_outcome(&mut self, correct: bool) {
        self.recent_window.push_back(correct);
        while self.recent_window.len() > self.window_capacity {
            self.recent_window.pop_front();
        }
    }

    pub fn recent_success_rate(&self) -> Option<f64> {
        if self.recent_window.is_empty() {
            return None;
        }
        let correct = self.recent_window.iter().filter(|c| **c).count();
        Some(correct as f64 / self.recent_window.len() as f64)
    }

    pub fn recent_correct_count(&self) -> usize {
        self.recent_window.iter().filter(|c| **c).count()
    }
}

/// Clamp a mastery value into the open interval guaranteed by §3/§8:
/// `0.005 <= mastery <= 0.995`.
pub fn clamp_mastery(p: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    p.clamp(MASTERY_EPSILON, 1.0 - MASTERY_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mastery_is_clamped() {
        let m = ConceptMastery::new(2.0, Utc::now());
        assert_eq!(m.mastery, 1.0 - MASTERY_EPSILON);
        let m = ConceptMastery::new(-1.0, Utc::now());
        assert_eq!(m.mastery, MASTERY_EPSILON);
    }

    #[test]
    fn window_trims_to_capacity() {
        let mut m = ConceptMastery::new(0.5, Utc::now()).with_window_capacity(3);
        for _ in 0..5 {
            m.push_outcome(true);
        }
        assert_eq!(m.window().len(), 3);
    }

    #[test]
    fn recent_success_rate_none_when_empty() {
        let m = ConceptMastery::new(0.5, Utc::now());
        assert_eq!(m.recent_success_rate(), None);
    }

    #[test]
    fn nan_clamps_to_midpoint() {
        assert_eq!(clamp_mastery(f64::NAN), 0.5);
    }
}
