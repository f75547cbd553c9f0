//! C4 — sliding-window behavioral-signal fusion into a stress reading.

use std::collections::VecDeque;

use ktrace_config::StressConfig;
use ktrace_domain::{BehavioralSample, InterventionTier, StressReading};

/// Per-learner stress-detection state: a bounded window of recent
/// behavioral samples. Private to one learner; concurrent calls for the
/// same learner are serialized by the registry (§5), not by this type.
#[derive(Debug, Clone)]
pub struct StressWindow {
    samples: VecDeque<BehavioralSample>,
    capacity: usize,
}

impl StressWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push `sample` into the window and compute a stress reading from the
    /// window as it stands afterward (§4.4).
    pub fn observe(&mut self, sample: BehavioralSample, config: &StressConfig) -> StressReading {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.reading(config)
    }

    fn reading(&self, config: &StressConfig) -> StressReading {
        let latest = *self.samples.back().expect("observe always pushes before reading");

        let rt_values: Vec<f64> = self.samples.iter().map(|s| s.response_time_ms).collect();
        let (rt_mean, rt_std) = mean_and_std(&rt_values);
        let rt_z = if rt_std > 1e-9 { (latest.response_time_ms - rt_mean) / rt_std } else { 0.0 };
        let rt_component = (rt_z.max(0.0) / 3.0).min(1.0);

        let incorrect_count = self.samples.iter().filter(|s| !s.correct).count();
        let error_rate = incorrect_count as f64 / self.samples.len() as f64;
        let correctness_component = if latest.correct { (error_rate * 0.5).min(1.0) } else { (error_rate + 0.2).min(1.0) };

        let hesitation_component = (latest.hesitation_ms / (config.high_hesitation_ms * 2.0)).clamp(0.0, 1.0);
        let keystroke_component = (latest.keystroke_deviation / (config.erratic_keystroke_deviation * 2.0)).clamp(0.0, 1.0);

        let level = (0.35 * rt_component + 0.25 * correctness_component + 0.2 * hesitation_component + 0.2 * keystroke_component)
            .clamp(0.0, 1.0);

        let fill_ratio = self.samples.len() as f64 / self.capacity as f64;
        let rt_cv = if rt_mean > 1e-9 { (rt_std / rt_mean).min(1.0) } else { 0.0 };
        let confidence = (fill_ratio * (1.0 - rt_cv)).clamp(0.0, 1.0);

        let mut indicators = Vec::new();
        if rt_z > config.slow_response_z {
            indicators.push("slow-response".to_string());
        }
        if trailing_error_streak(&self.samples) >= 2 {
            indicators.push("error-streak".to_string());
        }
        if latest.hesitation_ms > config.high_hesitation_ms {
            indicators.push("high-hesitation".to_string());
        }
        if latest.keystroke_deviation > config.erratic_keystroke_deviation {
            indicators.push("erratic-input".to_string());
        }

        let tier = if level < config.mild_threshold {
            InterventionTier::None
        } else if level < config.moderate_threshold {
            InterventionTier::Mild
        } else if level < config.high_threshold {
            InterventionTier::Moderate
        } else {
            InterventionTier::High
        };

        StressReading { level, confidence, indicators, tier }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

fn trailing_error_streak(samples: &VecDeque<BehavioralSample>) -> usize {
    samples.iter().rev().take_while(|s| !s.correct).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rt: f64, correct: bool, hesitation: f64, keystroke: f64) -> BehavioralSample {
        BehavioralSample {
            response_time_ms: rt,
            correct,
            hesitation_ms: hesitation,
            keystroke_deviation: keystroke,
        }
    }

    #[test]
    fn level_is_clamped_to_unit_interval() {
        let config = StressConfig::default();
        let mut window = StressWindow::new(12);
        for _ in 0..5 {
            let reading = window.observe(sample(20000.0, false, 5000.0, 2.0), &config);
            assert!((0.0..=1.0).contains(&reading.level));
        }
    }

    #[test]
    fn error_streak_indicator_after_two_failures() {
        let config = StressConfig::default();
        let mut window = StressWindow::new(12);
        window.observe(sample(1000.0, false, 100.0, 0.1), &config);
        let reading = window.observe(sample(1000.0, false, 100.0, 0.1), &config);
        assert!(reading.indicators.contains(&"error-streak".to_string()));
    }

    #[test]
    fn confidence_grows_with_fill_level() {
        let config = StressConfig::default();
        let mut window = StressWindow::new(12);
        let first = window.observe(sample(1000.0, true, 100.0, 0.1), &config);
        for _ in 0..10 {
            window.observe(sample(1000.0, true, 100.0, 0.1), &config);
        }
        let later = window.observe(sample(1000.0, true, 100.0, 0.1), &config);
        assert!(later.confidence >= first.confidence);
    }

    #[test]
    fn high_hesitation_triggers_indicator() {
        let config = StressConfig::default();
        let mut window = StressWindow::new(12);
        let reading = window.observe(sample(1000.0, true, 10_000.0, 0.1), &config);
        assert!(reading.indicators.contains(&"high-hesitation".to_string()));
    }

    #[test]
    fn window_respects_capacity() {
        let config = StressConfig::default();
        let mut window = StressWindow::new(3);
        for _ in 0..5 {
            window.observe(sample(1000.0, true, 100.0, 0.1), &config);
        }
        assert_eq!(window.len(), 3);
    }
}


