//! Property-based checks for the quantified invariants in §8: mastery
//! bounds, monotone practice count, bounded windows, posterior monotonicity
//! on correctness, and parameter bounds.

use chrono::Utc;
use ktrace_config::EngineConfig;
use ktrace_domain::{Concept, ContextFactors, DeviceProfile, InteractionEvent, LearnerProfile, QuestionMetadata, SubjectTag};
use ktrace_engine::{bkt, ConceptGraph};
use proptest::prelude::*;

fn catalog() -> ConceptGraph {
    ConceptGraph::from_catalog(vec![
        Concept::new("algebra_basics", "Algebra Basics", SubjectTag::Mathematics, 2),
        Concept::new("linear_equations", "Linear Equations", SubjectTag::Mathematics, 3)
            .with_prerequisite("algebra_basics", 0.6)
            .with_related("geometry_basics", 0.3),
        Concept::new("geometry_basics", "Geometry Basics", SubjectTag::Mathematics, 2),
    ])
    .unwrap()
}

fn event(correct: bool, difficulty: f64, stress: f64, fatigue: f64, tp: f64) -> InteractionEvent {
    InteractionEvent {
        learner_id: "prop".into(),
        concept_id: "linear_equations".into(),
        correct,
        question: QuestionMetadata { difficulty, solution_steps: 3, schema_complexity: 0.2, prerequisites: vec![] },
        context: ContextFactors {
            stress_hint: stress,
            cognitive_load_hint: 0.2,
            time_pressure_factor: tp,
            fatigue,
            session_elapsed_ms: 0,
            device: DeviceProfile::default(),
        },
        response_time_ms: 3000.0,
        hint_used: false,
        attempt_number: 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn mastery_and_parameters_stay_in_bounds(
        outcomes in proptest::collection::vec(any::<bool>(), 1..40),
        difficulty in 0.0f64..1.0,
        stress in 0.0f64..1.0,
        fatigue in 0.0f64..1.0,
        tp in 0.0f64..2.0,
    ) {
        let graph = catalog();
        let config = EngineConfig::default();
        let mut profile = LearnerProfile::new("prop");
        let now = Utc::now();

        let mut previous_practice_count = 0;
        for &correct in &outcomes {
            let result = bkt::update(&graph, &config, &mut profile, &event(correct, difficulty, stress, fatigue, tp), now);
            prop_assert!(result.success);
            prop_assert!(result.new_mastery >= 0.005 - 1e-9 && result.new_mastery <= 0.995 + 1e-9);
            prop_assert!(result.practice_count >= previous_practice_count);
            previous_practice_count = result.practice_count;

            let slip = result.effective_parameters.slip;
            let guess = result.effective_parameters.guess;
            prop_assert!(slip >= 0.02 - 1e-9 && slip <= 0.40 + 1e-9);
            prop_assert!(guess >= 0.05 - 1e-9 && guess <= 0.40 + 1e-9);

            let mastery = &profile.masteries["linear_equations"];
            prop_assert!(mastery.window().len() <= config.windows.concept_window);
            prop_assert!(profile.overall_window().len() <= config.windows.overall_window);

            for update in &result.transfer_updates {
                prop_assert!(update.delta.abs() <= 0.05 + 1e-9);
            }
        }
    }

    #[test]
    fn temporal_decay_is_idempotent_at_zero_elapsed(initial in 0.05f64..0.95) {
        let now = Utc::now();
        let mut mastery = ktrace_domain::ConceptMastery::new(initial, now);
        let before = mastery.mastery;
        ktrace_engine::adaptive_profile::apply_temporal_decay(&mut mastery, now);
        prop_assert!((mastery.mastery - before).abs() < 1e-9);
    }

    #[test]
    fn correct_answer_does_not_decrease_posterior_relative_to_incorrect(
        difficulty in 0.0f64..1.0,
    ) {
        let graph = catalog();
        let config = EngineConfig::default();
        let now = Utc::now();

        let mut profile_correct = LearnerProfile::new("a");
        let r_correct = bkt::update(&graph, &config, &mut profile_correct, &event(true, difficulty, 0.1, 0.0, 1.0), now);

        let mut profile_incorrect = LearnerProfile::new("a");
        let r_incorrect = bkt::update(&graph, &config, &mut profile_incorrect, &event(false, difficulty, 0.1, 0.0, 1.0), now);

        prop_assert!(r_correct.new_mastery >= r_incorrect.new_mastery);
    }
}
