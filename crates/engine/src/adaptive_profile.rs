//! C7 — per-learner adaptive profile: cold-start mastery, temporal decay,
//! adaptive learning rate, stress modifier, and recovery-boost tracking.
//!
//! Mutations here are applied by the BKT update core (§4.8) while holding
//! the caller's per-learner exclusion boundary (§5); nothing in this module
//! does its own locking.

use chrono::{DateTime, Utc};
use ktrace_domain::{clamp_mastery, ConceptMastery, LearnerProfile};

/// `get_or_create_mastery(learner, concept)` — §4.7. Returns a mutable
/// reference to the (possibly newly created) mastery entry.
pub fn get_or_create_mastery<'a>(
    profile: &'a mut LearnerProfile,
    concept_id: &str,
    prior_knowledge: f64,
    enhanced_transfer_boost: f64,
    now: DateTime<Utc>,
    window_capacity: usize,
) -> &'a mut ConceptMastery {
    if !profile.masteries.contains_key(concept_id) {
        let initial = (prior_knowledge + enhanced_transfer_boost).min(0.5);
        let mastery = ConceptMastery::new(initial, now).with_window_capacity(window_capacity);
        profile.masteries.insert(concept_id.to_string(), mastery);
    }
    profile.masteries.get_mut(concept_id).expect("just inserted if absent")
}

/// Scales a raw pre-update transfer boost (§4.6a) by how many related
/// concepts the learner has already learned, for use as the
/// `enhanced_transfer_boost` input to `get_or_create_mastery`.
pub fn enhanced_transfer_boost(raw_boost: f64, learned_related_count: usize) -> f64 {
    let multiplier = if learned_related_count >= 3 {
        1.3
    } else if learned_related_count >= 2 {
        1.2
    } else {
        1.1
    };
    raw_boost * multiplier
}

/// `apply_temporal_decay(mastery, now)` — §4.7. Identity at `Δd = 0`.
pub fn apply_temporal_decay(mastery: &mut ConceptMastery, now: DateTime<Utc>) {
    let delta_days = (now - mastery.last_interaction).num_milliseconds() as f64 / 86_400_000.0;
    if delta_days <= 0.0 {
        return;
    }
    let prior = 0.5;
    let decayed = prior + (mastery.mastery - prior) * (-mastery.decay_rate * delta_days).exp();
    mastery.mastery = decayed.clamp(0.05, 0.95);
}

/// `adaptive_learning_rate(concept, base)` — §4.7.
pub fn adaptive_learning_rate(
    overall_window: &std::collections::VecDeque<bool>,
    concept_window: &std::collections::VecDeque<bool>,
    base: f64,
) -> f64 {
    let overall_rate = success_rate(overall_window, 15);
    let concept_rate = success_rate(concept_window, 10);

    let blended = match concept_rate {
        Some(c) => 0.4 * overall_rate.unwrap_or(c) + 0.6 * c,
        None => overall_rate.unwrap_or(0.5),
    };

    if blended > 0.85 {
        (base * 1.3).min(0.5)
    } else if blended > 0.7 {
        (base * 1.2).min(0.48)
    } else if blended < 0.3 {
        (base * 1.3).min(0.45)
    } else if blended < 0.5 {
        (base * 1.15).min(0.42)
    } else {
        base
    }
}

fn success_rate(window: &std::collections::VecDeque<bool>, last_n: usize) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let slice: Vec<bool> = window.iter().rev().take(last_n).copied().collect();
    let correct = slice.iter().filter(|c| **c).count();
    Some(correct as f64 / slice.len() as f64)
}

/// `stress_modifier(σ, tolerance)` — §4.7. Positive values make parameters
/// worse (fed into `Δ⁻` in step 4).
pub fn stress_modifier(sigma: f64, tolerance: f64) -> f64 {
    let t = tolerance.clamp(0.0, 1.0);
    if (0.2..=0.4).contains(&sigma) {
        -0.05 * (1.0 - t)
    } else if sigma > 0.6 {
        sigma * 0.15 * (2.0 - t)
    } else {
        sigma * 0.15 * (1.5 - t)
    }
}

/// Coarse recovery state surfaced to hosts, derived from the boost fields
/// the BKT update core maintains on `ConceptMastery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Inactive,
    Active,
    Enhanced,
}

pub fn recovery_state(mastery: &ConceptMastery) -> RecoveryState {
    if mastery.enhanced_recovery_boost > 0.0 {
        RecoveryState::Enhanced
    } else if mastery.recovery_boost > 0.0 {
        RecoveryState::Active
    } else {
        RecoveryState::Inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn get_or_create_mastery_caps_at_half_on_creation() {
        let mut profile = LearnerProfile::new("u1");
        let m = get_or_create_mastery(&mut profile, "algebra_basics", 0.4, 0.5, Utc::now(), 20);
        assert_eq!(m.mastery, 0.5);
    }

    #[test]
    fn get_or_create_mastery_is_idempotent_on_existing_entry() {
        let mut profile = LearnerProfile::new("u1");
        get_or_create_mastery(&mut profile, "algebra_basics", 0.05, 0.0, Utc::now(), 20);
        profile.masteries.get_mut("algebra_basics").unwrap().mastery = 0.7;
        let m = get_or_create_mastery(&mut profile, "algebra_basics", 0.05, 0.0, Utc::now(), 20);
        assert_eq!(m.mastery, 0.7);
    }

    #[test]
    fn enhanced_transfer_boost_scales_with_learned_related_count() {
        assert_eq!(enhanced_transfer_boost(0.1, 0), 0.1 * 1.1);
        assert_eq!(enhanced_transfer_boost(0.1, 2), 0.1 * 1.2);
        assert_eq!(enhanced_transfer_boost(0.1, 3), 0.1 * 1.3);
    }

    #[test]
    fn temporal_decay_is_identity_at_zero_days() {
        let now = Utc::now();
        let mut mastery = ConceptMastery::new(0.7, now);
        apply_temporal_decay(&mut mastery, now);
        assert_eq!(mastery.mastery, 0.7);
    }

    #[test]
    fn temporal_decay_moves_toward_prior() {
        let now = Utc::now();
        let mut mastery = ConceptMastery::new(0.9, now - chrono::Duration::days(30));
        apply_temporal_decay(&mut mastery, now);
        assert!(mastery.mastery < 0.9);
        assert!(mastery.mastery >= 0.05);
    }

    #[test]
    fn adaptive_learning_rate_boosts_on_high_success() {
        let overall: VecDeque<bool> = std::iter::repeat(true).take(15).collect();
        let concept: VecDeque<bool> = std::iter::repeat(true).take(10).collect();
        let rate = adaptive_learning_rate(&overall, &concept, 0.3);
        assert!((rate - 0.39).abs() < 1e-9); // 0.3 * 1.3 = 0.39, under the 0.5 cap
    }

    #[test]
    fn adaptive_learning_rate_boosts_on_low_success_for_remediation() {
        let overall: VecDeque<bool> = std::iter::repeat(false).take(15).collect();
        let concept: VecDeque<bool> = std::iter::repeat(false).take(10).collect();
        let rate = adaptive_learning_rate(&overall, &concept, 0.3);
        assert!((rate - 0.39).abs() < 1e-9); // <0.3 branch: 0.3*1.3=0.39
    }

    #[test]
    fn stress_modifier_eustress_band_is_slightly_negative() {
        let m = stress_modifier(0.3, 0.5);
        assert!(m < 0.0);
    }

    #[test]
    fn stress_modifier_high_stress_is_positive() {
        let m = stress_modifier(0.9, 0.5);
        assert!(m > 0.0);
    }

    #[test]
    fn recovery_state_reflects_boost_fields() {
        let mut mastery = ConceptMastery::new(0.5, Utc::now());
        assert_eq!(recovery_state(&mastery), RecoveryState::Inactive);
        mastery.recovery_boost = 0.1;
        assert_eq!(recovery_state(&mastery), RecoveryState::Active);
        mastery.enhanced_recovery_boost = 0.2;
        assert_eq!(recovery_state(&mastery), RecoveryState::Enhanced);
    }
}
