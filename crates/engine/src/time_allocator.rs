//! C5 — dynamic per-question time budget. Deterministic in its inputs, no
//! suspension points.

use ktrace_config::TimeAllocatorConfig;
use ktrace_domain::{DeviceProfile, TimeAllocation, TimeFactorBreakdown};

#[derive(Debug, Clone, Copy)]
pub struct TimeAllocationInputs {
    pub base_time_ms: u64,
    pub stress: f64,
    pub fatigue: f64,
    pub mastery: f64,
    pub difficulty: f64,
    pub session_elapsed_ms: u64,
    pub device: DeviceProfile,
}

/// `allocate_time(request)` — §4.5.
pub fn allocate_time(inputs: &TimeAllocationInputs, config: &TimeAllocatorConfig) -> TimeAllocation {
    let sigma = inputs.stress.clamp(0.0, 1.0);
    let phi = inputs.fatigue.clamp(0.0, 1.0);
    let mastery = inputs.mastery.clamp(0.0, 1.0);
    let delta = inputs.difficulty.clamp(0.0, 1.0);

    let f_stress = if sigma > config.stress_threshold { 1.0 + config.stress_coefficient * sigma } else { 1.0 };
    let f_fatigue = (1.0 + config.fatigue_coefficient * phi).min(config.fatigue_cap);
    let f_mastery = config.mastery_high - config.mastery_span * mastery;
    let f_difficulty = config.difficulty_base + config.difficulty_span * delta;
    let f_session = if inputs.session_elapsed_ms > config.long_session_threshold_ms { config.long_session_factor } else { 1.0 };
    let f_device = {
        let mut factor = 1.0;
        if inputs.device.mobile {
            factor *= config.mobile_penalty;
        }
        if inputs.device.low_bandwidth {
            factor *= config.low_bandwidth_penalty;
        }
        factor
    };

    let factor = f_stress * f_fatigue * f_mastery * f_difficulty * f_session * f_device;

    let raw = (inputs.base_time_ms as f64 * factor).round() as i64;
    let ceiling = inputs.base_time_ms.saturating_mul(config.ceiling_multiplier);
    let final_time_ms = raw.max(config.floor_ms as i64).min(ceiling as i64) as u64;

    TimeAllocation {
        final_time_ms,
        factor,
        breakdown: TimeFactorBreakdown {
            stress: f_stress,
            fatigue: f_fatigue,
            mastery: f_mastery,
            difficulty: f_difficulty,
            session: f_session,
            device: f_device,
        },
    }
}
