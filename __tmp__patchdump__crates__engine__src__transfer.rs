//! C6 — transfer learning: pre-update boost, post-update propagation, and
//! the transfer-event audit log.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use ktrace_config::{ThresholdConfig, TransferConfig};
use ktrace_domain::{
    clamp_mastery, ConceptId, TransferAuditEntry, TransferBoost, TransferContribution, TransferKind, TransferUpdate,
};

use crate::concept_graph::ConceptGraph;

/// One past outcome on a concept, used for temporal-momentum scoring.
#[derive(Debug, Clone, Copy)]
pub struct RecentInteraction {
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// `boost(target, masteries, recent_interactions?)` — §4.6(a).
pub fn boost(
    graph: &ConceptGraph,
    target: &str,
    masteries: &HashMap<ConceptId, f64>,
    recent_interactions: &[RecentInteraction],
    now: DateTime<Utc>,
    config: &TransferConfig,
    thresholds: &ThresholdConfig,
) -> TransferBoost {
    let tau_t = thresholds.transfer_mastery_tau;
    let mut contributions = Vec::new();

    if let Ok(prereqs) = graph.prerequisites(target) {
        for (p, strength) in prereqs {
            if let Some(&m_p) = masteries.get(p) {
                if m_p > tau_t {
                    contributions.push(TransferContribution {
                        source_concept: p.clone(),
                        kind: TransferKind::Prerequisite,
                        amount: strength * (m_p - tau_t) * config.prerequisite_coefficient,
                    });
                }
            }
        }
    }

    if let Ok(related) = graph.related(target) {
        for (r, strength) in related {
            if let Some(&m_r) = masteries.get(r) {
                if m_r > tau_t {
                    contributions.push(TransferContribution {
                        source_concept: r.clone(),
                        kind: TransferKind::Related,
                        amount: strength * (m_r - tau_t) * config.related_coefficient,
                    });
                }
            }
        }
    }

    for rule in &config.cross_subject_catalog {
        if rule.target != target {
            continue;
        }
        if let Some(&m_source) = masteries.get(&rule.source) {
            if m_source > tau_t {
                contributions.push(TransferContribution {
                    source_concept: rule.source.clone(),
                    kind: TransferKind::CrossSubject,
                    amount: rule.strength * (m_source - tau_t) * config.cross_subject_coefficient,
                });
            }
        }
    }

    if let Some(momentum) = temporal_momentum(recent_interactions, now, config) {
        contributions.push(TransferContribution {
            source_concept: target.to_string(),
            kind: TransferKind::TemporalMomentum,
            amount: momentum,
        });
    }

    if let Ok(target_concept) = graph.get(target) {
        let target_embedding = target_concept.embedding();
        let mut similarities: Vec<(ConceptId, f64, f64)> = masteries
            .iter()
            .filter(|(id, &m)| id.as_str() != target && m > tau_t)
            .filter_map(|(id, &m)| {
                let concept = graph.get(id).ok()?;
                let sim = cosine_similarity(&target_embedding, &concept.embedding());
                (sim > config.similarity_threshold).then_some((id.clone(), m, sim))
            })
            .collect();
        similarities.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        for (id, m, sim) in similarities.into_iter().take(config.similarity_top_k) {
            contributions.push(TransferContribution {
                source_concept: id,
                kind: TransferKind::Similarity,
                amount: sim * (m - tau_t) * config.similarity_coefficient,
            });
        }
    }

    let total = contributions.iter().map(|c| c.amount).sum::<f64>().max(0.0).min(config.boost_cap);

    TransferBoost { total, contributions }
}

fn temporal_momentum(recent: &[RecentInteraction], now: DateTime<Utc>, config: &TransferConfig) -> Option<f64> {
    let window: Vec<&RecentInteraction> = recent
        .iter()
        .rev()
        .take(config.momentum_window)
        .collect();
    if window.is_empty() {
        return None;
    }
    let recent_successes = window
        .iter()
        .filter(|i| i.correct && (now - i.timestamp).num_hours() < config.momentum_hours)
        .count();
    if recent_successes > config.momentum_success_floor {
        let success_rate = recent_successes as f64 / window.len() as f64;
        Some((success_rate * config.momentum_coefficient).min(config.momentum_cap))
    } else {
        None
    }
}

fn cosine_similarity(a: &[f64; 5], b: &[f64; 5]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a < 1e-12 || norm_b < 1e-12 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// `propagate(source, new_mastery, profile)` — §4.6(b). Only `related`
/// edges participate, to avoid double counting with the pre-update boost.
pub fn propagate(
    graph: &ConceptGraph,
    source: &str,
    new_mastery: f64,
    current_masteries: &HashMap<ConceptId, f64>,
    config: &TransferConfig,
) -> Vec<TransferUpdate> {
    let Ok(related) = graph.related(source) else {
        return vec![];
    };
    related
        .iter()
        .filter_map(|(r, weight)| {
            let current = *current_masteries.get(r)?;
            let delta = (new_mastery - 0.5) * weight * config.propagation_coefficient;
            let new_value = clamp_mastery(current + delta);
            Some(TransferUpdate {
                concept_id: r.clone(),
                delta: new_value - current,
                new_mastery: new_value,
            })
        })
        .collect()
}

/// Bounded ring buffer of transfer events recorded for auditability
/// (Δ above `TransferConfig::audit_threshold`).
#[derive(Debug, Clone)]
pub struct TransferAuditLog {
    entries: VecDeque<TransferAuditEntry>,
    capacity: usize,
}

impl TransferAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    pub fn record_if_significant(&mut self, learner_id: &str, concept_id: &str, amount: f64, timestamp: DateTime<Utc>, threshold: f64) {
        if amount <= threshold {
            return;
        }
        self.entries.push_back(TransferAuditEntry {
            learner_id: learner_id.to_string(),
            concept_id: concept_id.to_string(),
            amount,
            timestamp,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Aggregate analytics over a trailing window of audit entries,
    /// supplementing the core boost/propagate operations with the
    /// read-only reporting surface the original transfer-learning module
    /// exposed over its own event log.
    pub fn analytics(&self, window: usize) -> TransferAnalytics {
        let recent: Vec<&TransferAuditEntry> = self.entries.iter().rev().take(window).collect();
        if recent.is_empty() {
            return TransferAnalytics { event_count: 0, total_transferred: 0.0, average_transfer: 0.0, top_concepts: vec![] };
        }
        let total_transferred: f64 = recent.iter().map(|e| e.amount).sum();
        let mut per_concept: HashMap<ConceptId, f64> = HashMap::new();
        for e in &recent {
            *per_concept.entry(e.concept_id.clone()).or_insert(0.0) += e.amount;
        }
        let mut top_concepts: Vec<(ConceptId, f64)> = per_concept.into_iter().collect();
        top_concepts.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        top_concepts.truncate(5);

        TransferAnalytics {
            event_count: recent.len(),
            total_transferred,
            average_transfer: total_transferred / recent.len() as f64,
            top_concepts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferAnalytics {
    pub event_count: usize,
    pub total_transferred: f64,
    pub average_transfer: f64,
    pub top_concepts: Vec<(ConceptId, f64)>,
}
