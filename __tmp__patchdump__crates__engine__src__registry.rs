//! The engine's external-interface facade (§6). Owns the immutable concept
//! graph and config, a per-learner mutual-exclusion map (§5), and the
//! shared transfer-audit log.

use std::sync::Arc;

use dashmap::DashMap;
use ktrace_config::EngineConfig;
use ktrace_domain::{
    BehavioralSample, Concept, ConceptId, EngineError, InteractionEvent, LearnerId, LearnerProfile, LoadAssessment,
    ProfileSnapshot, StressReading, TimeAllocation, UpdateResult,
};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::bkt;
use crate::cognitive_load::{self, LoadInputs};
use crate::concept_graph::ConceptGraph;
use crate::ports::Clock;
use crate::prerequisite;
use crate::stress::StressWindow;
use crate::time_allocator::{self as time_mod, TimeAllocationInputs};
use crate::transfer::TransferAuditLog;

/// Request payload for `assess_load` (§6). Mirrors `cognitive_load::LoadInputs`
/// but is the externally-facing shape hosts construct directly, independent
/// of an `InteractionEvent`.
pub type LoadRequest = LoadInputs;

/// Request payload for `allocate_time` (§6).
pub type TimeRequest = TimeAllocationInputs;

/// The engine's single entry point. Cheap to clone (everything inside is
/// `Arc`-backed); hosts typically construct one and share it across tasks.
#[derive(Clone)]
pub struct EngineHandle {
    graph: Arc<ConceptGraph>,
    config: Arc<EngineConfig>,
    clock: Arc<dyn Clock>,
    profiles: Arc<DashMap<LearnerId, Arc<Mutex<LearnerProfile>>>>,
    stress_windows: Arc<DashMap<LearnerId, Arc<Mutex<StressWindow>>>>,
    audit_log: Arc<Mutex<TransferAuditLog>>,
}

impl EngineHandle {
    pub fn new(catalog: Vec<Concept>, config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let graph = ConceptGraph::from_catalog(catalog)?;
        let audit_capacity = config.windows.transfer_audit_capacity;
        Ok(Self {
            graph: Arc::new(graph),
            config: Arc::new(config),
            clock,
            profiles: Arc::new(DashMap::new()),
            stress_windows: Arc::new(DashMap::new()),
            audit_log: Arc::new(Mutex::new(TransferAuditLog::new(audit_capacity))),
        })
    }

    fn learner_lock(&self, learner_id: &str) -> Arc<Mutex<LearnerProfile>> {
        self.profiles
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LearnerProfile::new(learner_id))))
            .clone()
    }

    fn stress_lock(&self, learner_id: &str) -> Arc<Mutex<StressWindow>> {
        self.stress_windows
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(StressWindow::new(self.config.windows.stress_window))))
            .clone()
    }

    /// `update(event)` — §6. Acquires the learner's exclusion boundary,
    /// runs the BKT update core (§4.8) as a single atomic step, and releases
    /// the lock before returning.
    #[instrument(skip(self, event), fields(learner_id = %event.learner_id))]
    pub async fn update(&self, event: InteractionEvent) -> UpdateResult {
        let lock = self.learner_lock(&event.learner_id);
        let mut profile = lock.lock().await;
        let mut audit_log = self.audit_log.lock().await;
        let now = self.clock.now();
        bkt::update(&self.graph, &self.config, &mut profile, &mut audit_log, &event, now)
    }

    /// `profile(learner_id)` — §6.
    pub async fn profile(&self, learner_id: &str) -> Option<ProfileSnapshot> {
        let entry = self.profiles.get(learner_id)?;
        let profile = entry.lock().await;
        Some(ProfileSnapshot::from(&*profile))
    }

    /// `learning_path(target, learner_id)` — §6.
    pub async fn learning_path(&self, target: &str, learner_id: &str) -> Result<Vec<ConceptId>, EngineError> {
        let masteries = self.current_masteries(learner_id).await;
        prerequisite::learning_path(&self.graph, target, &masteries)
    }

    /// `recommend_next(current_concept, learner_id, k)` — §6.
    pub async fn recommend_next(&self, current_concept: &str, learner_id: &str, k: usize) -> Result<Vec<ConceptId>, EngineError> {
        let masteries = self.current_masteries(learner_id).await;
        prerequisite::recommend_next(&self.graph, current_concept, &masteries, &self.config.thresholds, k)
    }

    /// `allocate_time(request)` — §6. Pure, no suspend beyond the call itself.
    pub fn allocate_time(&self, request: &TimeRequest) -> TimeAllocation {
        time_mod::allocate_time(request, &self.config.time_allocator)
    }

    /// `assess_load(request)` — §6. Pure, no suspend.
    pub fn assess_load(&self, request: &LoadRequest) -> LoadAssessment {
        cognitive_load::assess_load(request, &self.config.cognitive_load)
    }

    /// `detect_stress(sample, learner_id)` — §6. Serialized per learner via
    /// the learner's private stress window (§4.4).
    pub async fn detect_stress(&self, sample: BehavioralSample, learner_id: &str) -> StressReading {
        let lock = self.stress_lock(learner_id);
        let mut window = lock.lock().await;
        window.observe(sample, &self.config.stress)
    }

    async fn current_masteries(&self, learner_id: &str) -> std::collections::HashMap<ConceptId, f64> {
        let Some(entry) = self.profiles.get(learner_id) else {
            return std::collections::HashMap::new();
        };
        let profile = entry.lock().await;
        profile.masteries.iter().map(|(k, v)| (k.clone(), v.mastery)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktrace_domain::{Concept, ContextFactors, DeviceProfile, QuestionMetadata, SubjectTag};

    fn catalog() -> Vec<Concept> {
        vec![
            Concept::new("algebra_basics", "Algebra Basics", SubjectTag::Mathematics, 2),
            Concept::new("linear_equations", "Linear Equations", SubjectTag::Mathematics, 3)
                .with_prerequisite("algebra_basics", 0.6),
        ]
    }

    fn event() -> InteractionEvent {
        InteractionEvent {
            learner_id: "u1".into(),
            concept_id: "algebra_basics".into(),
            correct: true,
            question: QuestionMetadata { difficulty: 0.3, solution_steps: 2, schema_complexity: 0.1, prerequisites: vec![] },
            context: ContextFactors {
                stress_hint: 0.1,
                cognitive_load_hint: 0.2,
                time_pressure_factor: 1.0,
                fatigue: 0.0,
                session_elapsed_ms: 0,
                device: DeviceProfile::default(),
            },
            response_time_ms: 3000.0,
            hint_used: false,
            attempt_number: 1,
        }
    }

    #[tokio::test]
    async fn update_then_profile_reflects_new_mastery() {
        let handle = EngineHandle::new(catalog(), EngineConfig::default(), Arc::new(crate::ports::SystemClock)).unwrap();
        let result = handle.update(event()).await;
        assert!(result.success);

        let snapshot = handle.profile("u1").await.unwrap();
        assert_eq!(snapshot.masteries["algebra_basics"].mastery, result.new_mastery);
    }

    #[tokio::test]
    async fn profile_of_unknown_learner_is_none() {
        let handle = EngineHandle::new(catalog(), EngineConfig::default(), Arc::new(crate::ports::SystemClock)).unwrap();
        assert!(handle.profile("nobody").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_updates_for_different_learners_both_apply() {
        let handle = EngineHandle::new(catalog(), EngineConfig::default(), Arc::new(crate::ports::SystemClock)).unwrap();
        let mut e1 = event();
        e1.learner_id = "u1".into();
        let mut e2 = event();
        e2.learner_id = "u2".into();

        let (r1, r2) = tokio::join!(handle.update(e1), handle.update(e2));
        assert!(r1.success && r2.success);
        assert!(handle.profile("u1").await.is_some());
        assert!(handle.profile("u2").await.is_some());
    }

    #[test]
    fn unknown_catalog_edge_rejects_construction() {
        let bad = vec![Concept::new("a", "A", SubjectTag::Mathematics, 1).with_prerequisite("missing", 0.5)];
        assert!(EngineHandle::new(bad, EngineConfig::default(), Arc::new(crate::ports::SystemClock)).is_err());
    }
}


