//! C1 — the static, immutable concept catalog.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use ktrace_domain::{Concept, ConceptId, EngineError};
use tracing::warn;

/// The validated, read-only concept catalog. Built once at startup and
/// shared across threads behind an `Arc`; every accessor here is safe for
/// concurrent readers because nothing ever mutates a `ConceptGraph` after
/// construction.
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    concepts: HashMap<ConceptId, Concept>,
}

impl ConceptGraph {
    /// Build a graph from a catalog, validating uniqueness of ids, edge
    /// weight ranges, absence of self-loops, and the prerequisite DAG
    /// invariant. Rejects the whole catalog on any violation.
    pub fn from_catalog(concepts: Vec<Concept>) -> Result<Self, EngineError> {
        let mut by_id = HashMap::with_capacity(concepts.len());
        for concept in concepts {
            let id = concept.id.clone();
            if by_id.insert(id.clone(), concept).is_some() {
                return Err(EngineError::Validation(format!("duplicate concept id in catalog: {id}")));
            }
        }

        for concept in by_id.values() {
            validate_edges(concept)?;
        }

        // Unknown edge targets would make graph traversal silently partial.
        let ids: HashSet<&ConceptId> = by_id.keys().collect();
        for concept in by_id.values() {
            for target in concept
                .prerequisites
                .keys()
                .chain(concept.enables.keys())
                .chain(concept.related.keys())
            {
                if !ids.contains(target) {
                    return Err(EngineError::Validation(format!(
                        "concept {} references unknown concept {}",
                        concept.id, target
                    )));
                }
            }
        }

        let graph = Self { concepts: by_id };
        graph.assert_prerequisite_dag()?;
        Ok(graph)
    }

    pub fn get(&self, concept_id: &str) -> Result<&Concept, EngineError> {
        self.concepts
            .get(concept_id)
            .ok_or_else(|| EngineError::NotFound(concept_id.to_string()))
    }

    pub fn contains(&self, concept_id: &str) -> bool {
        self.concepts.contains_key(concept_id)
    }

    pub fn prerequisites(&self, concept_id: &str) -> Result<&BTreeMap<ConceptId, f64>, EngineError> {
        Ok(&self.get(concept_id)?.prerequisites)
    }

    pub fn enables(&self, concept_id: &str) -> Result<&BTreeMap<ConceptId, f64>, EngineError> {
        Ok(&self.get(concept_id)?.enables)
    }

    pub fn related(&self, concept_id: &str) -> Result<&BTreeMap<ConceptId, f64>, EngineError> {
        Ok(&self.get(concept_id)?.related)
    }

    /// Transitive closure over prerequisite edges only.
    pub fn all_prerequisites(&self, concept_id: &str) -> Result<HashSet<ConceptId>, EngineError> {
        self.get(concept_id)?;
        let mut seen = HashSet::new();
        let mut stack: Vec<ConceptId> = self.concepts[concept_id].prerequisites.keys().cloned().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                if let Some(c) = self.concepts.get(&next) {
                    stack.extend(c.prerequisites.keys().cloned());
                }
            }
        }
        Ok(seen)
    }

    /// Topological order of `subset` respecting prerequisite edges: every
    /// prerequisite of N that is also in `subset` appears earlier than N.
    /// Fails with `CycleDetected` rather than emit a partial order.
    pub fn topological_order(&self, subset: &HashSet<ConceptId>) -> Result<Vec<ConceptId>, EngineError> {
        for id in subset {
            self.get(id)?;
        }

        let mut in_degree: HashMap<&ConceptId, usize> = subset.iter().map(|id| (id, 0)).collect();
        for id in subset {
            let concept = &self.concepts[id];
            for prereq in concept.prerequisites.keys() {
                if subset.contains(prereq) {
                    *in_degree.get_mut(id).unwrap() += 1;
                }
            }
        }

        let mut queue: VecDeque<&ConceptId> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        // Deterministic order among equally-ready nodes: lower difficulty
        // first, then fewer unresolved (total catalog) dependencies, then id.
        let mut ready: Vec<&ConceptId> = queue.drain(..).collect();
        ready.sort_by(|a, b| self.ready_order_key(a).cmp(&self.ready_order_key(b)));
        queue.extend(ready);

        let mut order = Vec::with_capacity(subset.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            let mut newly_ready = Vec::new();
            for candidate in subset {
                if order.contains(candidate) || queue.contains(&candidate) {
                    continue;
                }
                let concept = &self.concepts[candidate];
                if concept.prerequisites.keys().any(|p| p == id) {
                    let deg = in_degree.get_mut(candidate).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        newly_ready.push(candidate);
                    }
                }
            }
            newly_ready.sort_by(|a, b| self.ready_order_key(a).cmp(&self.ready_order_key(b)));
            queue.extend(newly_ready);
        }

        if order.len() != subset.len() {
            warn!(subset_size = subset.len(), produced = order.len(), "cycle detected while ordering subset");
            return Err(EngineError::CycleDetected(
                subset.iter().next().cloned().unwrap_or_default(),
            ));
        }
        Ok(order)
    }

    /// Tie-break key for equally-ready nodes in `topological_order`: prefer
    /// lower difficulty, then fewer total prerequisite dependencies, then id.
    fn ready_order_key(&self, id: &ConceptId) -> (u8, usize, ConceptId) {
        let concept = &self.concepts[id];
        (concept.difficulty_level, concept.prerequisites.len(), id.clone())
    }

    fn assert_prerequisite_dag(&self) -> Result<(), EngineError> {
        let all_ids: HashSet<ConceptId> = self.concepts.keys().cloned().collect();
        self.topological_order(&all_ids)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }
}

fn validate_edges(concept: &Concept) -> Result<(), EngineError> {
    for (target, strength) in concept
        .prerequisites
        .iter()
        .chain(concept.enables.iter())
        .chain(concept.related.iter())
    {
        if target == &concept.id {
            return Err(EngineError::Validation(format!("concept {} has a self-loop edge", concept.id)));
        }
        if !(0.0..=1.0).contains(strength) || *strength <= 0.0 {
            return Err(EngineError::Validation(format!(
                "concept {} has edge weight {} out of (0,1]",
                concept.id, strength
            )));
        }
    }
    Ok(())
}
