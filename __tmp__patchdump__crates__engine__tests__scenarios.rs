//! End-to-end scenarios against a realistic catalog, exercising the engine
//! through `EngineHandle` the way a host application would.

use std::sync::Arc;

use chrono::Utc;
use ktrace_config::EngineConfig;
use ktrace_domain::{Concept, ContextFactors, DeviceProfile, InteractionEvent, QuestionMetadata, SubjectTag};
use ktrace_engine::{EngineHandle, FixedClock};

fn catalog() -> Vec<Concept> {
    vec![
        Concept::new("algebra_basics", "Algebra Basics", SubjectTag::Mathematics, 2),
        Concept::new("linear_equations", "Linear Equations", SubjectTag::Mathematics, 3)
            .with_prerequisite("algebra_basics", 0.6),
        Concept::new("quadratic_equations", "Quadratic Equations", SubjectTag::Mathematics, 4)
            .with_prerequisite("linear_equations", 0.8)
            .with_prerequisite("algebra_basics", 0.6),
        Concept::new("kinematics", "Kinematics", SubjectTag::Physics, 2),
        Concept::new("dynamics", "Dynamics", SubjectTag::Physics, 3),
    ]
}

fn event(learner: &str, concept: &str, correct: bool, difficulty: f64, stress: f64, fatigue: f64) -> InteractionEvent {
    InteractionEvent {
        learner_id: learner.into(),
        concept_id: concept.into(),
        correct,
        question: QuestionMetadata { difficulty, solution_steps: 2, schema_complexity: 0.1, prerequisites: vec![] },
        context: ContextFactors {
            stress_hint: stress,
            cognitive_load_hint: 0.2,
            time_pressure_factor: 1.0,
            fatigue,
            session_elapsed_ms: 0,
            device: DeviceProfile::default(),
        },
        response_time_ms: 3000.0,
        hint_used: false,
        attempt_number: 1,
    }
}

fn handle() -> EngineHandle {
    EngineHandle::new(catalog(), EngineConfig::default(), Arc::new(FixedClock::new(Utc::now()))).unwrap()
}

#[tokio::test]
async fn s1_cold_start_easy_correct() {
    let engine = handle();
    let result = engine.update(event("s1", "algebra_basics", true, 0.3, 0.1, 0.0)).await;

    assert!(result.success);
    assert_eq!(result.previous_mastery, 0.05);
    assert!(result.new_mastery > 0.05 && result.new_mastery <= 0.5);
    assert_eq!(result.practice_count, 1);
    assert!(result.intervention.is_none());
}

#[tokio::test]
async fn s2_struggle_triggers_recovery_then_recovers_on_success() {
    let engine = handle();

    for _ in 0..3 {
        engine.update(event("s2", "linear_equations", false, 0.5, 0.6, 0.2)).await;
    }
    let struggling = engine.profile("s2").await.unwrap();
    let mastery = &struggling.masteries["linear_equations"];
    assert_eq!(mastery.consecutive_errors, 3);
    assert!(mastery.recovery_boost > 0.0);

    engine.update(event("s2", "linear_equations", true, 0.5, 0.1, 0.0)).await;
    let recovered = engine.profile("s2").await.unwrap();
    assert_eq!(recovered.masteries["linear_equations"].consecutive_errors, 0);
}

#[tokio::test]
async fn s4_readiness_flips_after_building_prerequisites() {
    let engine = handle();

    for _ in 0..5 {
        engine.update(event("s4", "algebra_basics", true, 0.5, 0.1, 0.0)).await;
    }
    for _ in 0..5 {
        engine.update(event("s4", "linear_equations", true, 0.5, 0.1, 0.0)).await;
    }

    let path = engine.learning_path("quadratic_equations", "s4").await.unwrap();
    assert_eq!(path.last().unwrap(), "quadratic_equations");
}

#[tokio::test]
async fn s5_transfer_boost_on_cold_cross_subject_target() {
    let engine = handle();

    for _ in 0..6 {
        engine.update(event("s5", "kinematics", true, 0.3, 0.1, 0.0)).await;
    }
    let before = engine.profile("s5").await.unwrap();
    let kinematics_mastery = before.masteries["kinematics"].mastery;
    assert!(kinematics_mastery > 0.75, "kinematics mastery was {kinematics_mastery}");

    let result = engine.update(event("s5", "dynamics", true, 0.4, 0.1, 0.0)).await;
    assert!(result.success);
    assert!(result.previous_mastery > 0.05, "expected a transfer boost over the bare prior");
}

#[tokio::test]
async fn allocate_time_and_assess_load_are_synchronous_pure_operations() {
    let engine = handle();
    let time = engine.allocate_time(&ktrace_engine::TimeRequest {
        base_time_ms: 10_000,
        stress: 0.2,
        fatigue: 0.1,
        mastery: 0.6,
        difficulty: 0.5,
        session_elapsed_ms: 0,
        device: DeviceProfile::default(),
    });
    assert!(time.final_time_ms >= 1_000);

    let load = engine.assess_load(&ktrace_engine::LoadRequest {
        solution_steps: 3,
        mastery: 0.6,
        prerequisite_gap: 0.1,
        time_pressure_ratio: 1.0,
        interface_complexity: 0.2,
        distraction: 0.1,
        stress: 0.2,
        fatigue: 0.1,
    });
    assert!((0.0..=1.0).contains(&load.overload_risk));
}

