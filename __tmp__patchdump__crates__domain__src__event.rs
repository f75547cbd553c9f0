use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::{ConceptId, LearnerId};

/// Device context used by the time allocator's `f_device` factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub mobile: bool,
    pub low_bandwidth: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            mobile: false,
            low_bandwidth: false,
        }
    }
}

/// Per-question metadata accompanying an `InteractionEvent`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionMetadata {
    #[validate(range(min = 0.0, max = 1.0))]
    pub difficulty: f64,
    pub solution_steps: u32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub schema_complexity: f64,
    pub prerequisites: Vec<ConceptId>,
}

/// Session/behavioral context accompanying an `InteractionEvent`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContextFactors {
    #[validate(range(min = 0.0, max = 1.0))]
    pub stress_hint: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub cognitive_load_hint: f64,
    #[validate(range(min = 0.0))]
    pub time_pressure_factor: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub fatigue: f64,
    pub session_elapsed_ms: u64,
    pub device: DeviceProfile,
}

/// The input to `bkt::update`: one observed answer plus its context.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InteractionEvent {
    pub learner_id: LearnerId,
    pub concept_id: ConceptId,
    pub correct: bool,
    #[validate(nested)]
    pub question: QuestionMetadata,
    #[validate(nested)]
    pub context: ContextFactors,
    #[validate(range(min = 0.0))]
    pub response_time_ms: f64,
    pub hint_used: bool,
    pub attempt_number: u32,
}

/// A single behavioral sample fed to the stress detector's sliding window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct BehavioralSample {
    #[validate(range(min = 0.0))]
    pub response_time_ms: f64,
    pub correct: bool,
    #[validate(range(min = 0.0))]
    pub hesitation_ms: f64,
    #[validate(range(min = 0.0))]
    pub keystroke_deviation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> InteractionEvent {
        InteractionEvent {
            learner_id: "u1".into(),
            concept_id: "algebra_basics".into(),
            correct: true,
            question: QuestionMetadata {
                difficulty: 0.3,
                solution_steps: 2,
                schema_complexity: 0.1,
                prerequisites: vec![],
            },
            context: ContextFactors {
                stress_hint: 0.1,
                cognitive_load_hint: 0.2,
                time_pressure_factor: 1.0,
                fatigue: 0.0,
                session_elapsed_ms: 0,
                device: DeviceProfile::default(),
            },
            response_time_ms: 3000.0,
            hint_used: false,
            attempt_number: 1,
        }
    }

    #[test]
    fn well_formed_event_validates() {
        assert!(sample_event().validate().is_ok());
    }

    #[test]
    fn out_of_range_difficulty_fails_validation() {
        let mut e = sample_event();
        e.question.difficulty = 1.5;
        assert!(e.validate().is_err());
    }
}


