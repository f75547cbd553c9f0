//! C8 — the central Bayesian knowledge-tracing update algorithm (§4.8).

use chrono::{DateTime, Utc};
use ktrace_config::EngineConfig;
use ktrace_domain::{
    clamp_mastery, DifficultyBand, ErrorKind, Intervention, InteractionEvent, InterventionTier, LearnerProfile,
    LearnerState, ParameterBand, UpdateResult,
};
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::adaptive_profile;
use crate::cognitive_load::{self, LoadInputs};
use crate::concept_graph::ConceptGraph;
use crate::prerequisite;
use crate::transfer::{self, RecentInteraction};

/// Run one BKT update for `event` against `profile`, following §4.8 steps
/// 1-14. The caller is responsible for holding the per-learner exclusion
/// boundary (§5) for the duration of this call; everything here is
/// synchronous and either commits in full or leaves `profile` untouched.
/// Transfer events worth auditing are reported back via
/// `UpdateResult::transfer_updates`; recording them in a shared audit log,
/// if the caller keeps one, happens outside this call so that the global
/// log never serializes updates across different learners.
#[instrument(skip(graph, config, profile, event), fields(learner_id = %event.learner_id, concept_id = %event.concept_id))]
pub fn update(
    graph: &ConceptGraph,
    config: &EngineConfig,
    profile: &mut LearnerProfile,
    event: &InteractionEvent,
    now: DateTime<Utc>,
) -> UpdateResult {
    if let Err(errors) = event.validate() {
        return UpdateResult::failure(ErrorKind::Validation, errors.to_string());
    }
    let Ok(_concept) = graph.get(&event.concept_id) else {
        return UpdateResult::failure(ErrorKind::NotFound, format!("unknown concept {}", event.concept_id));
    };

    let band = config.parameter_bands.band_for(event.question.difficulty);

    // Step 1: locate (or cold-start) the mastery entry.
    let snapshot_before: std::collections::HashMap<_, _> =
        profile.masteries.iter().map(|(k, v)| (k.clone(), v.mastery)).collect();

    if !profile.masteries.contains_key(&event.concept_id) {
        let recent: Vec<RecentInteraction> = profile
            .momentum_log()
            .iter()
            .map(|(correct, ts)| RecentInteraction { correct: *correct, timestamp: *ts })
            .collect();
        let raw_boost = transfer::boost(
            graph,
            &event.concept_id,
            &snapshot_before,
            &recent,
            now,
            &config.transfer,
            &config.thresholds,
        );
        let related_ids: Vec<String> = graph.related(&event.concept_id).map(|m| m.keys().cloned().collect()).unwrap_or_default();
        let learned_related = profile.count_learned_related(&related_ids, config.thresholds.learned_related_threshold);
        let boost = adaptive_profile::enhanced_transfer_boost(raw_boost.total, learned_related);
        adaptive_profile::get_or_create_mastery(profile, &event.concept_id, band.prior, boost, now, config.windows.concept_window);
    }

    // Step 2: temporal decay.
    {
        let mastery = profile.masteries.get_mut(&event.concept_id).expect("just located or created");
        adaptive_profile::apply_temporal_decay(mastery, now);
    }

    let readiness = prerequisite::analyze_readiness(
        graph,
        &event.concept_id,
        &profile.masteries.iter().map(|(k, v)| (k.clone(), v.mastery)).collect(),
        config.thresholds.readiness_tau,
        &config.thresholds,
    )
    .unwrap_or_else(|_| prerequisite::Readiness { ready: true, overall_readiness: 1.0, gaps: vec![], recommended: vec![] });
    let prerequisite_gap = (1.0 - readiness.overall_readiness).clamp(0.0, 1.0);

    let mastery_before = profile.masteries[&event.concept_id].mastery;

    // Step 4: context modulation.
    let load = cognitive_load::assess_load(
        &LoadInputs {
            solution_steps: event.question.solution_steps,
            mastery: mastery_before,
            prerequisite_gap,
            time_pressure_ratio: event.context.time_pressure_factor,
            interface_complexity: event.question.schema_complexity,
            distraction: 0.0,
            stress: event.context.stress_hint,
            fatigue: event.context.fatigue,
        },
        &config.cognitive_load,
    );

    let stress_mod = adaptive_profile::stress_modifier(event.context.stress_hint, profile.stress_tolerance);
    let load_mod = 0.15 * load.total;
    let tp = event.context.time_pressure_factor;
    let time_mod = if tp > 1.2 {
        (tp - 1.0) * 0.12
    } else if tp < 0.8 {
        -(0.8 - tp) * 0.08
    } else {
        0.0
    };
    let fatigue_mod = 0.10 * event.context.fatigue;
    let device_mod = if event.context.device.mobile { 0.02 } else { 0.0 };
    let negative_impact = stress_mod + load_mod + time_mod + fatigue_mod + device_mod;

    // Step 5: effective parameters. `hint_used`/`attempt_number` (§9's open
    // question on hint/attempt effects) nudge guess' and slip' within the
    // same clamp bounds rather than introducing new parameters.
    let hint_mod = if event.hint_used { 0.05 } else { 0.0 };
    let retry_mod = (0.01 * event.attempt_number.saturating_sub(1) as f64).min(0.05);
    let (recovery_r, learn_prime, slip_prime, guess_prime) = {
        let mastery = &profile.masteries[&event.concept_id];
        let l = adaptive_profile::adaptive_learning_rate(profile.overall_window(), mastery.window(), band.transit);
        let r = mastery.recovery_boost + mastery.enhanced_recovery_boost;
        let slip_prime = (band.slip + negative_impact - r + retry_mod).clamp(0.02, 0.40);
        let guess_prime = (band.guess + 0.5 * stress_mod + 0.3 * fatigue_mod + hint_mod).clamp(0.05, 0.40);
        let learn_prime = (l - 0.5 * load_mod - 0.4 * fatigue_mod + r).clamp(0.10, 0.60);
        (r, learn_prime, slip_prime, guess_prime)
    };

    // Step 6: Bayesian posterior.
    let p = clamp_mastery(mastery_before).clamp(1e-3, 1.0 - 1e-3);
    let confidence_before = profile.masteries[&event.concept_id].confidence;
    let (num, den) = if event.correct {
        let num = p * (1.0 - slip_prime);
        (num, num + (1.0 - p) * guess_prime)
    } else {
        let num = p * slip_prime;
        (num, num + (1.0 - p) * (1.0 - guess_prime))
    };
    let mut posterior = if den > 1e-12 { num / den } else { p };
    if posterior > 0.98 {
        posterior -= 0.02 * (1.0 - confidence_before);
    } else if posterior < 0.02 {
        posterior += 0.02 * confidence_before;
    }

    // Step 7: learning transition.
    let learn_double_prime = learn_prime * (1.0 + 0.1 * confidence_before);
    let mut new_mastery = (posterior + (1.0 - posterior) * learn_double_prime).clamp(0.005, 0.995);

    // Step 8: pedagogical adjustments.
    let mastery_ref = &profile.masteries[&event.concept_id];
    let recent_rate = mastery_ref.recent_success_rate();
    let recent_correct = mastery_ref.recent_correct_count();
    if event.correct {
        if recent_rate.unwrap_or(0.0) >= 0.7 && recent_correct >= 3 {
            new_mastery = (new_mastery + 0.05).min(0.95);
        }
    } else if profile.overall_success_rate().unwrap_or(1.0) < 0.3 {
        new_mastery = new_mastery.max(0.9 * p);
    }

    // Step 9: recovery accounting.
    let practice_count_before = profile.masteries[&event.concept_id].practice_count;
    {
        let mastery = profile.masteries.get_mut(&event.concept_id).expect("located above");
        if event.correct {
            mastery.consecutive_errors = 0;
            mastery.recovery_boost = (mastery.recovery_boost - 0.02).max(0.0);
            mastery.enhanced_recovery_boost = (mastery.enhanced_recovery_boost - 0.05).max(0.0);
        } else {
            mastery.consecutive_errors += 1;
            let activation_threshold = if practice_count_before <= 3 { 1 } else { 2 };
            if mastery.consecutive_errors >= activation_threshold {
                let struggle = mastery.consecutive_errors as f64;
                let extra = if practice_count_before <= 2 || p < 0.25 { 0.05 } else { 0.0 };
                mastery.recovery_boost = (0.12 + 0.03 * struggle + extra).clamp(0.0, 0.35);
                debug!(concept_id = %event.concept_id, boost = mastery.recovery_boost, "recovery boost activated");
            }
            if mastery.consecutive_errors >= 4 {
                mastery.enhanced_recovery_boost = mastery.recovery_boost * 1.5;
            }
        }
    }

    // Step 10: write-back.
    {
        let mastery = profile.masteries.get_mut(&event.concept_id).expect("located above");
        mastery.mastery = new_mastery;
        mastery.last_interaction = now;
        mastery.practice_count += 1;
        mastery.push_outcome(event.correct);
        const CONFIDENCE_GROWTH_RATE: f64 = 0.15;
        mastery.confidence = 1.0 - (-CONFIDENCE_GROWTH_RATE * mastery.practice_count as f64).exp();
    }
    profile.push_overall_outcome(event.correct);
    profile.push_momentum(event.correct, now);

    // Step 11: post-update transfer.
    let current_masteries: std::collections::HashMap<_, _> =
        profile.masteries.iter().map(|(k, v)| (k.clone(), v.mastery)).collect();
    let transfer_updates = transfer::propagate(graph, &event.concept_id, new_mastery, &current_masteries, &config.transfer);
    for update in &transfer_updates {
        if let Some(mastery) = profile.masteries.get_mut(&update.concept_id) {
            mastery.mastery = update.new_mastery;
        }
    }

    // Step 12: prediction for the next item.
    let predicted_next_correct = (new_mastery * (1.0 - slip_prime) + (1.0 - new_mastery) * guess_prime).clamp(0.01, 0.99);

    // Step 13: decisions.
    let learner_state = profile.learner_state();
    let recommended_difficulty = recommended_band(learner_state, new_mastery);
    let needs_break = last_n_has_at_most_correct(profile.overall_window(), 5, 1);

    let prerequisite_suggestion = if !event.correct
        && matches!(learner_state, LearnerState::Struggling | LearnerState::Learning | LearnerState::Recovery)
    {
        let post_masteries: std::collections::HashMap<_, _> =
            profile.masteries.iter().map(|(k, v)| (k.clone(), v.mastery)).collect();
        prerequisite::analyze_readiness(graph, &event.concept_id, &post_masteries, config.thresholds.readiness_tau, &config.thresholds)
            .ok()
            .filter(|r| !r.ready)
            .and_then(|r| r.gaps.first().map(|g| g.concept.clone()))
    } else {
        None
    };

    let consecutive_errors = profile.masteries[&event.concept_id].consecutive_errors;
    let intervention = if consecutive_errors >= 4 || load.overload_risk > 0.7 {
        let tier = if load.overload_risk >= config.stress.high_threshold {
            InterventionTier::High
        } else if load.overload_risk >= config.stress.moderate_threshold {
            InterventionTier::Moderate
        } else if load.overload_risk >= config.stress.mild_threshold {
            InterventionTier::Mild
        } else {
            InterventionTier::Moderate // consecutive-error trigger with low load still warrants attention
        };
        info!(learner_id = %event.learner_id, concept_id = %event.concept_id, ?tier, "intervention emitted");
        Some(Intervention {
            tier,
            recommendations: load.recommendations.clone(),
            reason: if consecutive_errors >= 4 {
                "four or more consecutive errors on this concept".to_string()
            } else {
                "cognitive overload risk exceeded threshold".to_string()
            },
        })
    } else if needs_break {
        Some(Intervention {
            tier: InterventionTier::Mild,
            recommendations: vec!["break".to_string()],
            reason: "at most one correct answer in the last five attempts".to_string(),
        })
    } else {
        None
    };

    let motivational_feedback = Some(motivational_tag(learner_state, event.correct));

    if recovery_r > 0.0 {
        debug!(recovery_r, "recovery boost contributed to this update");
    }

    UpdateResult {
        success: true,
        error_kind: None,
        error_reason: None,
        previous_mastery: mastery_before,
        new_mastery,
        practice_count: profile.masteries[&event.concept_id].practice_count,
        predicted_next_correct,
        effective_parameters: ParameterBand { prior: band.prior, transit: learn_double_prime, slip: slip_prime, guess: guess_prime },
        transfer_updates,
        intervention,
        motivational_feedback,
        recommended_difficulty: Some(recommended_difficulty),
        prerequisite_suggestion,
    }
}

fn recommended_band(state: LearnerState, mastery: f64) -> DifficultyBand {
    let by_mastery = if mastery < 0.4 {
        DifficultyBand::Foundation
    } else if mastery < 0.6 {
        DifficultyBand::Building
    } else if mastery < 0.8 {
        DifficultyBand::Intermediate
    } else {
        DifficultyBand::Advanced
    };

    match state {
        LearnerState::Struggling | LearnerState::Recovery => by_mastery.min(DifficultyBand::Building),
        LearnerState::New | LearnerState::Learning => by_mastery.min(DifficultyBand::Intermediate),
        LearnerState::Progressing | LearnerState::Mastering => by_mastery,
    }
}

fn last_n_has_at_most_correct(window: &std::collections::VecDeque<bool>, n: usize, at_most: usize) -> bool {
    if window.len() < n {
        return false;
    }
    let correct = window.iter().rev().take(n).filter(|c| **c).count();
    correct <= at_most
}

fn motivational_tag(state: LearnerState, correct: bool) -> String {
    let state_str = match state {
        LearnerState::New => "new",
        LearnerState::Learning => "learning",
        LearnerState::Progressing => "progressing",
        LearnerState::Mastering => "mastering",
        LearnerState::Struggling => "struggling",
        LearnerState::Recovery => "recovery",
    };
    let outcome_str = if correct { "correct" } else { "incorrect" };
    let feeling = match (state, correct) {
        (LearnerState::Struggling, true) => "encourage",
        (LearnerState::Struggling, false) => "reassure",
        (LearnerState::Recovery, _) => "steady_on",
        (LearnerState::Mastering, true) => "excellent",
        (LearnerState::Mastering, false) => "stay_sharp",
        (_, true) => "keep_going",
        (_, false) => "try_again",
    };
    format!("{state_str}.{outcome_str}.{feeling}")
}
