//! Tuning knobs for the knowledge-tracing engine. Every numeric literal used
//! by a formula in `ktrace-engine` is named and documented here rather than
//! inlined at its use site, and can be overridden per deployment.

use serde::{Deserialize, Serialize};

/// Bounded-window capacities (§3, §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    /// N: per-concept recent-outcome window. Default: 20.
    pub concept_window: usize,
    /// M: learner-wide recent-outcome window. Default: 50.
    pub overall_window: usize,
    /// W: stress-detector behavioral-sample window. Default: 12.
    pub stress_window: usize,
    /// Capacity of the transfer-event audit ring buffer. Default: 200.
    pub transfer_audit_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            concept_window: 20,
            overall_window: 50,
            stress_window: 12,
            transfer_audit_capacity: 200,
        }
    }
}

/// Readiness and mastery thresholds used by C2 and C6.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// τ in `analyze_readiness`: per-prerequisite mastery target. Default: 0.7.
    pub readiness_tau: f64,
    /// Overall-readiness bar for `ready_to_learn`. Default: 0.8.
    pub ready_to_learn: f64,
    /// τ_t in the transfer boost: prerequisite/related mastery must exceed
    /// this to contribute. Default: 0.75.
    pub transfer_mastery_tau: f64,
    /// Mastery considered "already learned" when counting learned related
    /// concepts for the cold-start transfer multiplier. Default: 0.7.
    pub learned_related_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            readiness_tau: 0.7,
            ready_to_learn: 0.8,
            transfer_mastery_tau: 0.75,
            learned_related_threshold: 0.7,
        }
    }
}

/// One row of the base BKT parameter table (step 3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParameterBandRow {
    pub max_difficulty: f64,
    pub prior: f64,
    pub transit: f64,
    pub slip: f64,
    pub guess: f64,
}

/// Question-difficulty-indexed parameter bands. Rows are checked in order;
/// the last row's `max_difficulty` is ignored (it is the catch-all "advanced"
/// band, δ ≥ 0.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterBandTable {
    pub rows: Vec<ParameterBandRow>,
}

impl Default for ParameterBandTable {
    fn default() -> Self {
        Self {
            rows: vec![
                ParameterBandRow { max_difficulty: 0.4, prior: 0.05, transit: 0.40, slip: 0.10, guess: 0.30 },
                ParameterBandRow { max_difficulty: 0.6, prior: 0.08, transit: 0.30, slip: 0.15, guess: 0.25 },
                ParameterBandRow { max_difficulty: 0.7, prior: 0.10, transit: 0.25, slip: 0.20, guess: 0.20 },
                ParameterBandRow { max_difficulty: f64::INFINITY, prior: 0.15, transit: 0.20, slip: 0.25, guess: 0.15 },
            ],
        }
    }
}

impl ParameterBandTable {
    pub fn band_for(&self, difficulty: f64) -> ParameterBandRow {
        self.rows
            .iter()
            .find(|row| difficulty < row.max_difficulty)
            .copied()
            .unwrap_or(*self.rows.last().expect("parameter band table must not be empty"))
    }
}

/// A cross-subject transfer rule: mastery of `source` contributes to the
/// target's pre-update transfer boost with the given strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossSubjectRule {
    pub source: String,
    pub target: String,
    pub strength: f64,
}

/// Coefficients for C6's transfer boost and post-update propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub prerequisite_coefficient: f64,
    pub related_coefficient: f64,
    pub cross_subject_coefficient: f64,
    pub cross_subject_catalog: Vec<CrossSubjectRule>,
    /// Window of recent outcomes considered for temporal momentum. Default: 10.
    pub momentum_window: usize,
    /// Successes within the window required to grant momentum. Default: 3.
    pub momentum_success_floor: usize,
    pub momentum_coefficient: f64,
    pub momentum_cap: f64,
    /// "Hours" window for momentum recency, per the host-supplied clock.
    pub momentum_hours: i64,
    pub similarity_coefficient: f64,
    pub similarity_threshold: f64,
    pub similarity_top_k: usize,
    /// Hard cap on the summed transfer boost. Default: 0.3.
    pub boost_cap: f64,
    /// Coefficient applied to `(new_mastery - 0.5)` in post-update
    /// propagation over `related` edges. Default: 0.1.
    pub propagation_coefficient: f64,
    /// Transfer events at or above this Δ are recorded in the audit log.
    pub audit_threshold: f64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            prerequisite_coefficient: 0.20,
            related_coefficient: 0.10,
            cross_subject_coefficient: 0.15,
            cross_subject_catalog: default_cross_subject_catalog(),
            momentum_window: 10,
            momentum_success_floor: 3,
            momentum_coefficient: 0.15,
            momentum_cap: 0.10,
            momentum_hours: 24,
            similarity_coefficient: 0.08,
            similarity_threshold: 0.7,
            similarity_top_k: 3,
            boost_cap: 0.3,
            propagation_coefficient: 0.1,
            audit_threshold: 0.05,
        }
    }
}

/// A small starter catalog of cross-subject rules, in the spirit of the
/// physics/math pairings a STEM curriculum would ship with. Hosts are
/// expected to replace this with their own catalog.
fn default_cross_subject_catalog() -> Vec<CrossSubjectRule> {
    vec![
        CrossSubjectRule { source: "kinematics".into(), target: "dynamics".into(), strength: 0.8 },
        CrossSubjectRule { source: "linear_equations".into(), target: "kinematics".into(), strength: 0.5 },
        CrossSubjectRule { source: "quadratic_equations".into(), target: "dynamics".into(), strength: 0.4 },
    ]
}

/// Coefficients for C5's multiplicative time-allocation model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeAllocatorConfig {
    pub floor_ms: u64,
    pub ceiling_multiplier: u64,
    /// Stress contributes `1 + stress_coefficient * sigma` once sigma
    /// exceeds `stress_threshold`; otherwise the factor is 1.0.
    pub stress_threshold: f64,
    pub stress_coefficient: f64,
    /// Fatigue factor: `1 + fatigue_coefficient * phi`, capped at `fatigue_cap`.
    pub fatigue_coefficient: f64,
    pub fatigue_cap: f64,
    /// Mastery factor: `mastery_high - mastery_span * m`.
    pub mastery_high: f64,
    pub mastery_span: f64,
    /// Difficulty factor: `difficulty_base + difficulty_span * delta`.
    pub difficulty_base: f64,
    pub difficulty_span: f64,
    /// Session factor kicks in once elapsed time exceeds this threshold.
    pub long_session_threshold_ms: u64,
    pub long_session_factor: f64,
    pub mobile_penalty: f64,
    pub low_bandwidth_penalty: f64,
}

impl Default for TimeAllocatorConfig {
    fn default() -> Self {
        Self {
            floor_ms: 1_000,
            ceiling_multiplier: 8,
            stress_threshold: 0.3,
            stress_coefficient: 0.5,
            fatigue_coefficient: 0.3,
            fatigue_cap: 1.3,
            mastery_high: 1.3,
            mastery_span: 0.5,
            difficulty_base: 0.8,
            difficulty_span: 0.4,
            long_session_threshold_ms: 20 * 60 * 1000,
            long_session_factor: 1.1,
            mobile_penalty: 1.1,
            low_bandwidth_penalty: 1.05,
        }
    }
}

/// Coefficients for C3's Sweller-CLT decomposition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CognitiveLoadConfig {
    pub wm_base: f64,
    pub wm_floor: f64,
    pub wm_stress_weight: f64,
    pub wm_fatigue_weight: f64,
    pub intrinsic_steps_weight: f64,
    pub intrinsic_steps_cap: f64,
    pub intrinsic_mastery_weight: f64,
    pub intrinsic_mastery_span: f64,
    pub intrinsic_gap_weight: f64,
    pub intrinsic_gap_floor: f64,
    pub intrinsic_gap_span: f64,
    pub extraneous_pressure_weight: f64,
    pub extraneous_pressure_span: f64,
    pub extraneous_interface_weight: f64,
    pub extraneous_interface_span: f64,
    pub extraneous_distraction_weight: f64,
    pub extraneous_distraction_span: f64,
    pub germane_ratio: f64,
    pub overload_logistic_scale: f64,
    pub overload_risk_recommend_threshold: f64,
    pub extraneous_recommend_threshold: f64,
    pub intrinsic_recommend_threshold: f64,
    pub germane_recommend_threshold: f64,
}

impl Default for CognitiveLoadConfig {
    fn default() -> Self {
        Self {
            wm_base: 7.0,
            wm_floor: 2.0,
            wm_stress_weight: 0.4,
            wm_fatigue_weight: 0.3,
            intrinsic_steps_weight: 0.4,
            intrinsic_steps_cap: 5.0,
            intrinsic_mastery_weight: 0.3,
            intrinsic_mastery_span: 3.0,
            intrinsic_gap_weight: 0.3,
            intrinsic_gap_floor: 0.8,
            intrinsic_gap_span: 2.0,
            extraneous_pressure_weight: 0.35,
            extraneous_pressure_span: 4.0,
            extraneous_interface_weight: 0.25,
            extraneous_interface_span: 3.0,
            extraneous_distraction_weight: 0.25,
            extraneous_distraction_span: 2.0,
            germane_ratio: 0.2,
            overload_logistic_scale: 3.0,
            overload_risk_recommend_threshold: 0.7,
            extraneous_recommend_threshold: 3.0,
            intrinsic_recommend_threshold: 5.0,
            germane_recommend_threshold: 1.0,
        }
    }
}

/// Stress-level intervention-tier thresholds (§4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StressConfig {
    pub mild_threshold: f64,
    pub moderate_threshold: f64,
    pub high_threshold: f64,
    /// Per-component indicator thresholds for emitting tags.
    pub slow_response_z: f64,
    pub high_hesitation_ms: f64,
    pub erratic_keystroke_deviation: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            mild_threshold: 0.35,
            moderate_threshold: 0.55,
            high_threshold: 0.75,
            slow_response_z: 1.0,
            high_hesitation_ms: 2_000.0,
            erratic_keystroke_deviation: 0.5,
        }
    }
}

/// Top-level configuration bundle for the engine, constructed with
/// `EngineConfig::default()` and overridden piecemeal by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub windows: WindowConfig,
    pub thresholds: ThresholdConfig,
    pub parameter_bands: ParameterBandTable,
    pub transfer: TransferConfig,
    pub time_allocator: TimeAllocatorConfig,
    pub cognitive_load: CognitiveLoadConfig,
    pub stress: StressConfig,
}

impl EngineConfig {
    /// Override individual knobs from environment variables, following the
    /// "parse or keep default" pattern rather than failing fast — these are
    /// tuning knobs, not deployment secrets.
    pub fn from_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("KTRACE_CONCEPT_WINDOW") {
            if let Ok(n) = v.parse() {
                self.windows.concept_window = n;
            }
        }
        if let Ok(v) = std::env::var("KTRACE_OVERALL_WINDOW") {
            if let Ok(n) = v.parse() {
                self.windows.overall_window = n;
            }
        }
        if let Ok(v) = std::env::var("KTRACE_READINESS_TAU") {
            if let Ok(n) = v.parse() {
                self.thresholds.readiness_tau = n;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_band_table_picks_foundation_for_low_difficulty() {
        let table = ParameterBandTable::default();
        let row = table.band_for(0.3);
        assert_eq!(row.prior, 0.05);
        assert_eq!(row.transit, 0.40);
    }

    #[test]
    fn parameter_band_table_picks_advanced_for_high_difficulty() {
        let table = ParameterBandTable::default();
        let row = table.band_for(0.95);
        assert_eq!(row.prior, 0.15);
        assert_eq!(row.guess, 0.15);
    }

    #[test]
    fn parameter_band_table_boundary_is_exclusive_on_the_low_side() {
        let table = ParameterBandTable::default();
        // delta == 0.4 belongs to the "building" row, not "foundation".
        let row = table.band_for(0.4);
        assert_eq!(row.prior, 0.08);
    }

    #[test]
    fn default_cross_subject_catalog_is_nonempty() {
        let cfg = TransferConfig::default();
        assert!(!cfg.cross_subject_catalog.is_empty());
    }
}
