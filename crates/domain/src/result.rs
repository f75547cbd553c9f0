use serde::{Deserialize, Serialize};

use crate::ids::ConceptId;

/// Question-difficulty band selected by step 3 of the update algorithm, and
/// also used as the "recommended next difficulty" decision in step 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBand {
    Foundation,
    Building,
    Intermediate,
    Advanced,
}

impl DifficultyBand {
    pub fn from_question_difficulty(delta: f64) -> Self {
        if delta < 0.4 {
            DifficultyBand::Foundation
        } else if delta < 0.6 {
            DifficultyBand::Building
        } else if delta < 0.7 {
            DifficultyBand::Intermediate
        } else {
            DifficultyBand::Advanced
        }
    }
}

/// BKT parameter band: prior, transit (learn), slip, guess.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParameterBand {
    pub prior: f64,
    pub transit: f64,
    pub slip: f64,
    pub guess: f64,
}

/// Output of C3 — cognitive load assessment for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadAssessment {
    pub intrinsic: f64,
    pub extraneous: f64,
    pub germane: f64,
    pub total: f64,
    pub working_memory_capacity: f64,
    pub overload_risk: f64,
    pub recommendations: Vec<String>,
}

/// Severity label driving recommended interventions, shared by C4 and C8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionTier {
    None,
    Mild,
    Moderate,
    High,
}

/// Output of C4 — a single stress reading over the current window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReading {
    pub level: f64,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub tier: InterventionTier,
}

/// Per-axis multiplicative breakdown of the time-allocation factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeFactorBreakdown {
    pub stress: f64,
    pub fatigue: f64,
    pub mastery: f64,
    pub difficulty: f64,
    pub session: f64,
    pub device: f64,
}

/// Output of C5 — the allocated time budget for the next question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeAllocation {
    pub final_time_ms: u64,
    pub factor: f64,
    pub breakdown: TimeFactorBreakdown,
}

/// One contributing source in a transfer-boost computation (§4.6a).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferContribution {
    pub source_concept: ConceptId,
    pub kind: TransferKind,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Prerequisite,
    Related,
    CrossSubject,
    TemporalMomentum,
    Similarity,
}

/// Result of C6(a), the pre-update transfer boost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferBoost {
    pub total: f64,
    pub contributions: Vec<TransferContribution>,
}

/// One post-update propagation effect on a related concept (§4.6b).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferUpdate {
    pub concept_id: ConceptId,
    pub delta: f64,
    pub new_mastery: f64,
}

/// A recorded transfer event for auditability (§4.6, Δ > 0.05).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAuditEntry {
    pub learner_id: String,
    pub concept_id: ConceptId,
    pub amount: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A pedagogical intervention surfaced by step 13.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub tier: InterventionTier,
    pub recommendations: Vec<String>,
    pub reason: String,
}

/// Error kinds from §7. `Validation`/`NotFound`/`Cancelled`/`TimeBudgetExceeded`
/// are recoverable and leave state untouched; `CycleDetected` is fatal only to
/// the catalog-load operation; `Internal` must be rare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    CycleDetected,
    Cancelled,
    TimeBudgetExceeded,
    Internal,
}

/// Output of C8 — the stable schema returned by `update(event)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_reason: Option<String>,

    pub previous_mastery: f64,
    pub new_mastery: f64,
    pub practice_count: u64,
    pub predicted_next_correct: f64,
    pub effective_parameters: ParameterBand,
    pub transfer_updates: Vec<TransferUpdate>,
    pub intervention: Option<Intervention>,
    pub motivational_feedback: Option<String>,
    pub recommended_difficulty: Option<DifficultyBand>,
    pub prerequisite_suggestion: Option<ConceptId>,
}

impl UpdateResult {
    pub fn failure(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            error_reason: Some(reason.into()),
            previous_mastery: 0.0,
            new_mastery: 0.0,
            practice_count: 0,
            predicted_next_correct: 0.0,
            effective_parameters: ParameterBand {
                prior: 0.0,
                transit: 0.0,
                slip: 0.0,
                guess: 0.0,
            },
            transfer_updates: vec![],
            intervention: None,
            motivational_feedback: None,
            recommended_difficulty: None,
            prerequisite_suggestion: None,
        }
    }
}
