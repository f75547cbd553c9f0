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

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> TimeAllocationInputs {
        TimeAllocationInputs {
            base_time_ms: 10_000,
            stress: 0.1,
            fatigue: 0.0,
            mastery: 0.8,
            difficulty: 0.3,
            session_elapsed_ms: 0,
            device: DeviceProfile::default(),
        }
    }

    #[test]
    fn low_stress_does_not_increase_factor() {
        let config = TimeAllocatorConfig::default();
        let out = allocate_time(&base_inputs(), &config);
        assert_eq!(out.breakdown.stress, 1.0);
    }

    #[test]
    fn high_stress_increases_time() {
        let config = TimeAllocatorConfig::default();
        let mut stressed = base_inputs();
        stressed.stress = 0.9;
        let calm = allocate_time(&base_inputs(), &config);
        let out = allocate_time(&stressed, &config);
        assert!(out.final_time_ms > calm.final_time_ms);
    }

    #[test]
    fn low_mastery_increases_time_more_than_high_mastery() {
        let config = TimeAllocatorConfig::default();
        let mut low = base_inputs();
        low.mastery = 0.1;
        let mut high = base_inputs();
        high.mastery = 0.95;
        let low_out = allocate_time(&low, &config);
        let high_out = allocate_time(&high, &config);
        assert!(low_out.final_time_ms > high_out.final_time_ms);
    }

    #[test]
    fn final_time_respects_floor_and_ceiling() {
        let config = TimeAllocatorConfig::default();
        let mut tiny = base_inputs();
        tiny.base_time_ms = 1;
        let out = allocate_time(&tiny, &config);
        assert!(out.final_time_ms >= config.floor_ms);

        let mut extreme = base_inputs();
        extreme.base_time_ms = 10_000;
        extreme.stress = 1.0;
        extreme.fatigue = 1.0;
        extreme.difficulty = 1.0;
        extreme.mastery = 0.0;
        extreme.session_elapsed_ms = u64::MAX;
        extreme.device = DeviceProfile { mobile: true, low_bandwidth: true };
        let out = allocate_time(&extreme, &config);
        assert!(out.final_time_ms <= extreme.base_time_ms * config.ceiling_multiplier);
    }

    #[test]
    fn mobile_device_increases_time() {
        let config = TimeAllocatorConfig::default();
        let mut mobile = base_inputs();
        mobile.device = DeviceProfile { mobile: true, low_bandwidth: false };
        let desktop_out = allocate_time(&base_inputs(), &config);
        let mobile_out = allocate_time(&mobile, &config);
        assert!(mobile_out.final_time_ms > desktop_out.final_time_ms);
    }
}


