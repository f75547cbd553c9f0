//! C2 — prerequisite readiness, gap analysis, and learning paths.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ktrace_config::ThresholdConfig;
use ktrace_domain::{ConceptId, EngineError};

use crate::concept_graph::ConceptGraph;

#[derive(Debug, Clone)]
pub struct ReadinessGap {
    pub concept: ConceptId,
    pub current: f64,
    pub required: f64,
    pub gap: f64,
    pub impact: f64,
}

#[derive(Debug, Clone)]
pub struct Readiness {
    pub ready: bool,
    pub overall_readiness: f64,
    pub gaps: Vec<ReadinessGap>,
    pub recommended: Vec<ConceptId>,
}

/// `analyze_readiness(concept, masteries, tau)` — §4.2.
pub fn analyze_readiness(
    graph: &ConceptGraph,
    concept_id: &str,
    masteries: &HashMap<ConceptId, f64>,
    tau: f64,
    thresholds: &ThresholdConfig,
) -> Result<Readiness, EngineError> {
    let prereqs = graph.prerequisites(concept_id)?;

    if prereqs.is_empty() {
        return Ok(Readiness {
            ready: true,
            overall_readiness: 1.0,
            gaps: vec![],
            recommended: vec![],
        });
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut gaps = Vec::new();

    for (prereq_id, weight) in prereqs {
        let current = masteries.get(prereq_id).copied().unwrap_or(0.0);
        weighted_sum += (current / tau).min(1.0) * weight;
        weight_total += weight;

        let gap = (tau - current).max(0.0);
        gaps.push(ReadinessGap {
            concept: prereq_id.clone(),
            current,
            required: tau,
            gap,
            impact: gap * weight,
        });
    }

    let overall_readiness = if weight_total > 0.0 { weighted_sum / weight_total } else { 1.0 };

    gaps.sort_by(|a, b| b.impact.partial_cmp(&a.impact).unwrap_or(Ordering::Equal));
    let recommended = gaps.iter().filter(|g| g.impact > 0.0).map(|g| g.concept.clone()).collect();

    Ok(Readiness {
        ready: overall_readiness >= thresholds.ready_to_learn,
        overall_readiness,
        gaps,
        recommended,
    })
}

/// `learning_path(target, masteries)` — §4.2.
pub fn learning_path(
    graph: &ConceptGraph,
    target: &str,
    masteries: &HashMap<ConceptId, f64>,
) -> Result<Vec<ConceptId>, EngineError> {
    let mut subset = graph.all_prerequisites(target)?;
    subset.insert(target.to_string());

    let known_threshold = 0.8;
    let remaining: HashSet<ConceptId> = subset
        .into_iter()
        .filter(|id| id == target || masteries.get(id).copied().unwrap_or(0.0) < known_threshold)
        .collect();

    match graph.topological_order(&remaining) {
        Ok(order) => Ok(order),
        Err(_) => {
            // Fall back to (-current_mastery, difficulty) ordering, target last.
            let mut ids: Vec<ConceptId> = remaining.into_iter().filter(|id| id != target).collect();
            ids.sort_by(|a, b| {
                let ca = masteries.get(a).copied().unwrap_or(0.0);
                let cb = masteries.get(b).copied().unwrap_or(0.0);
                let da = graph.get(a).map(|c| c.difficulty_level).unwrap_or(5);
                let db = graph.get(b).map(|c| c.difficulty_level).unwrap_or(5);
                cb.partial_cmp(&ca)
                    .unwrap_or(Ordering::Equal)
                    .then(da.cmp(&db))
            });
            ids.push(target.to_string());
            Ok(ids)
        }
    }
}

/// `recommend_next(current_concept, k)` — §4.2.
pub fn recommend_next(
    graph: &ConceptGraph,
    current_concept: &str,
    masteries: &HashMap<ConceptId, f64>,
    thresholds: &ThresholdConfig,
    k: usize,
) -> Result<Vec<ConceptId>, EngineError> {
    let successors = graph.enables(current_concept)?;
    let mut scored: Vec<(ConceptId, f64)> = Vec::new();
    for successor in successors.keys() {
        let readiness = analyze_readiness(graph, successor, masteries, thresholds.readiness_tau, thresholds)?;
        scored.push((successor.clone(), readiness.overall_readiness));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Ok(scored.into_iter().take(k).map(|(id, _)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ktrace_domain::{Concept, SubjectTag};

    fn catalog() -> ConceptGraph {
        ConceptGraph::from_catalog(vec![
            Concept::new("algebra_basics", "Algebra Basics", SubjectTag::Mathematics, 2),
            Concept::new("linear_equations", "Linear Equations", SubjectTag::Mathematics, 3)
                .with_prerequisite("algebra_basics", 0.6)
                .with_enables("quadratic_equations", 0.8),
            Concept::new("quadratic_equations", "Quadratic Equations", SubjectTag::Mathematics, 4)
                .with_prerequisite("linear_equations", 0.8)
                .with_prerequisite("algebra_basics", 0.6),
        ])
        .unwrap()
    }

    #[test]
    fn no_prerequisites_is_fully_ready() {
        let graph = catalog();
        let r = analyze_readiness(&graph, "algebra_basics", &HashMap::new(), 0.7, &ThresholdConfig::default()).unwrap();
        assert!(r.ready);
        assert_eq!(r.overall_readiness, 1.0);
    }

    #[test]
    fn highest_impact_gap_is_first() {
        let graph = catalog();
        let masteries: HashMap<ConceptId, f64> =
            [("algebra_basics".to_string(), 0.2), ("linear_equations".to_string(), 0.2)].into_iter().collect();
        let r = analyze_readiness(&graph, "quadratic_equations", &masteries, 0.7, &ThresholdConfig::default()).unwrap();
        assert!(!r.ready);
        assert_eq!(r.gaps[0].concept, "linear_equations");
    }

    #[test]
    fn readiness_flips_to_ready_with_high_mastery() {
        let graph = catalog();
        let masteries: HashMap<ConceptId, f64> =
            [("algebra_basics".to_string(), 0.9), ("linear_equations".to_string(), 0.9)].into_iter().collect();
        let r = analyze_readiness(&graph, "quadratic_equations", &masteries, 0.7, &ThresholdConfig::default()).unwrap();
        assert!(r.ready);
        assert!(r.overall_readiness >= 0.8);
    }

    #[test]
    fn learning_path_ends_with_target() {
        let graph = catalog();
        let path = learning_path(&graph, "quadratic_equations", &HashMap::new()).unwrap();
        assert_eq!(path.last().unwrap(), "quadratic_equations");
        let pos = |id: &str| path.iter().position(|x| x == id).unwrap();
        assert!(pos("algebra_basics") < pos("quadratic_equations"));
    }

    #[test]
    fn recommend_next_ranks_by_readiness() {
        let graph = catalog();
        let masteries: HashMap<ConceptId, f64> =
            [("algebra_basics".to_string(), 0.9), ("linear_equations".to_string(), 0.9)].into_iter().collect();
        let next = recommend_next(&graph, "linear_equations", &masteries, &ThresholdConfig::default(), 5).unwrap();
        assert_eq!(next, vec!["quadratic_equations".to_string()]);
    }
}
