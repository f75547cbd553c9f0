//! C3 — Sweller cognitive-load-theory decomposition. Pure, deterministic,
//! no side effects.

use ktrace_config::CognitiveLoadConfig;
use ktrace_domain::LoadAssessment;

/// Inputs to the cognitive load assessment for a single question.
#[derive(Debug, Clone, Copy)]
pub struct LoadInputs {
    pub solution_steps: u32,
    pub mastery: f64,
    pub prerequisite_gap: f64,
    pub time_pressure_ratio: f64,
    pub interface_complexity: f64,
    pub distraction: f64,
    pub stress: f64,
    pub fatigue: f64,
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `assess_load(request)` — §4.3.
pub fn assess_load(inputs: &LoadInputs, config: &CognitiveLoadConfig) -> LoadAssessment {
    let sigma = inputs.stress.clamp(0.0, 1.0);
    let phi = inputs.fatigue.clamp(0.0, 1.0);
    let mastery = inputs.mastery.clamp(0.0, 1.0);
    let gap = inputs.prerequisite_gap.clamp(0.0, 1.0);
    let tp = inputs.time_pressure_ratio.max(0.0);
    let ix = inputs.interface_complexity.clamp(0.0, 1.0);
    let distraction = inputs.distraction.clamp(0.0, 1.0);

    let working_memory_capacity = (config.wm_base
        * (1.0 - config.wm_stress_weight * sigma - config.wm_fatigue_weight * phi))
        .max(config.wm_floor);

    let intrinsic = config.intrinsic_steps_weight * ((inputs.solution_steps as f64 + 1.0).log2()).min(config.intrinsic_steps_cap)
        + config.intrinsic_mastery_weight * (1.0 - mastery) * config.intrinsic_mastery_span
        + config.intrinsic_gap_weight * (gap - config.intrinsic_gap_floor).max(0.0) * config.intrinsic_gap_span;

    let extraneous = config.extraneous_pressure_weight * (1.0 - tp).max(0.0) * config.extraneous_pressure_span
        + config.extraneous_interface_weight * ix * config.extraneous_interface_span
        + config.extraneous_distraction_weight * distraction * config.extraneous_distraction_span;

    let germane = (config.germane_ratio * intrinsic).max(0.0);

    let total = intrinsic + extraneous + germane;

    let overload_risk = logistic(config.overload_logistic_scale * (total / working_memory_capacity - 1.0));

    let mut recommendations = Vec::new();
    if overload_risk > config.overload_risk_recommend_threshold {
        recommendations.push("break".to_string());
    }
    if extraneous > config.extraneous_recommend_threshold {
        recommendations.push("simplify-interface".to_string());
    }
    if intrinsic > config.intrinsic_recommend_threshold {
        recommendations.push("segment".to_string());
    }
    if germane < config.germane_recommend_threshold {
        recommendations.push("schema-prompt".to_string());
    }

    LoadAssessment {
        intrinsic,
        extraneous,
        germane,
        total,
        working_memory_capacity,
        overload_risk,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> LoadInputs {
        LoadInputs {
            solution_steps: 2,
            mastery: 0.8,
            prerequisite_gap: 0.1,
            time_pressure_ratio: 1.0,
            interface_complexity: 0.1,
            distraction: 0.1,
            stress: 0.1,
            fatigue: 0.0,
        }
    }

    #[test]
    fn working_memory_decreases_with_stress_and_fatigue() {
        let config = CognitiveLoadConfig::default();
        let calm = assess_load(&base_inputs(), &config);
        let mut stressed = base_inputs();
        stressed.stress = 0.9;
        stressed.fatigue = 0.9;
        let stressed_out = assess_load(&stressed, &config);
        assert!(stressed_out.working_memory_capacity < calm.working_memory_capacity);
    }

    #[test]
    fn working_memory_floor_is_respected() {
        let config = CognitiveLoadConfig::default();
        let mut extreme = base_inputs();
        extreme.stress = 1.0;
        extreme.fatigue = 1.0;
        let out = assess_load(&extreme, &config);
        assert!(out.working_memory_capacity >= config.wm_floor);
    }

    #[test]
    fn overload_risk_triggers_break_recommendation() {
        let config = CognitiveLoadConfig::default();
        let inputs = LoadInputs {
            solution_steps: 12,
            mastery: 0.2,
            prerequisite_gap: 0.9,
            time_pressure_ratio: 0.5,
            interface_complexity: 0.8,
            distraction: 0.8,
            stress: 0.8,
            fatigue: 0.8,
        };
        let out = assess_load(&inputs, &config);
        assert!(out.overload_risk > 0.7, "overload_risk was {}", out.overload_risk);
        assert!(out.recommendations.iter().any(|r| r == "break" || r == "simplify-interface"));
    }

    #[test]
    fn overload_risk_is_in_unit_interval() {
        let config = CognitiveLoadConfig::default();
        let out = assess_load(&base_inputs(), &config);
        assert!((0.0..=1.0).contains(&out.overload_risk));
    }

    #[test]
    fn low_mastery_raises_intrinsic_load() {
        let config = CognitiveLoadConfig::default();
        let mastered = assess_load(&base_inputs(), &config);
        let mut unmastered = base_inputs();
        unmastered.mastery = 0.0;
        let out = assess_load(&unmastered, &config);
        assert!(out.intrinsic > mastered.intrinsic);
    }
}


