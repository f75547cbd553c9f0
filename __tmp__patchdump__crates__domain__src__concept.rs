use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ConceptId;

/// Subject a concept belongs to. Open set in the source catalog; the
/// `Other` variant keeps catalog loading total over arbitrary tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectTag {
    Mathematics,
    Physics,
    Chemistry,
    Biology,
    Other(String),
}

impl SubjectTag {
    pub fn as_str(&self) -> &str {
        match self {
            SubjectTag::Mathematics => "mathematics",
            SubjectTag::Physics => "physics",
            SubjectTag::Chemistry => "chemistry",
            SubjectTag::Biology => "biology",
            SubjectTag::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for SubjectTag {
    fn from(value: &str) -> Self {
        match value {
            "mathematics" => SubjectTag::Mathematics,
            "physics" => SubjectTag::Physics,
            "chemistry" => SubjectTag::Chemistry,
            "biology" => SubjectTag::Biology,
            other => SubjectTag::Other(other.to_string()),
        }
    }
}

/// Convenience constructors for the named edge-strength bands used by the
/// source catalog (`WEAK/MODERATE/STRONG/CRITICAL`). The raw `f64` in
/// `(0, 1]` is still what `Concept`'s edge maps store; these are just
/// readable literals for catalog authors.
pub struct EdgeStrength;

impl EdgeStrength {
    pub const fn weak() -> f64 {
        0.3
    }
    pub const fn moderate() -> f64 {
        0.6
    }
    pub const fn strong() -> f64 {
        0.8
    }
    pub const fn critical() -> f64 {
        0.95
    }
}

/// A single curriculum concept as loaded from the catalog. Immutable for
/// the lifetime of the process once the catalog has been validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub name: String,
    pub subject: SubjectTag,
    /// 1..=5, coarse author-assigned difficulty band (distinct from the
    /// per-question difficulty `InteractionEvent` carries).
    pub difficulty_level: u8,
    /// concept_id -> strength in (0, 1]
    pub prerequisites: BTreeMap<ConceptId, f64>,
    pub enables: BTreeMap<ConceptId, f64>,
    pub related: BTreeMap<ConceptId, f64>,
}

impl Concept {
    pub fn new(id: impl Into<ConceptId>, name: impl Into<String>, subject: SubjectTag, difficulty_level: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subject,
            difficulty_level: difficulty_level.clamp(1, 5),
            prerequisites: BTreeMap::new(),
            enables: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    pub fn with_prerequisite(mut self, id: impl Into<ConceptId>, strength: f64) -> Self {
        self.prerequisites.insert(id.into(), strength);
        self
    }

    pub fn with_enables(mut self, id: impl Into<ConceptId>, strength: f64) -> Self {
        self.enables.insert(id.into(), strength);
        self
    }

    pub fn with_related(mut self, id: impl Into<ConceptId>, strength: f64) -> Self {
        self.related.insert(id.into(), strength);
        self
    }

    /// The 5-dimensional embedding used by C6's similarity transfer:
    /// `[normalized_difficulty, normalized_prereq_count, normalized_enables_count,
    /// normalized_related_count, subject_tag_embedding]`.
    pub fn embedding(&self) -> [f64; 5] {
        [
            (self.difficulty_level as f64 - 1.0) / 4.0,
            normalize_count(self.prerequisites.len()),
            normalize_count(self.enables.len()),
            normalize_count(self.related.len()),
            subject_embedding(&self.subject),
        ]
    }
}

fn normalize_count(n: usize) -> f64 {
    // Saturates at 8 edges; catalogs rarely exceed this per concept and the
    // similarity metric only needs a stable relative scale.
    (n as f64 / 8.0).min(1.0)
}

fn subject_embedding(subject: &SubjectTag) -> f64 {
    match subject {
        SubjectTag::Mathematics => 0.0,
        SubjectTag::Physics => 0.25,
        SubjectTag::Chemistry => 0.5,
        SubjectTag::Biology => 0.75,
        SubjectTag::Other(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_strength_constants_are_in_unit_interval() {
        assert!((0.0..=1.0).contains(&EdgeStrength::weak()));
        assert!((0.0..=1.0).contains(&EdgeStrength::critical()));
    }

    #[test]
    fn difficulty_level_clamps_into_band() {
        let c = Concept::new("x", "X", SubjectTag::Mathematics, 9);
        assert_eq!(c.difficulty_level, 5);
        let c = Concept::new("y", "Y", SubjectTag::Mathematics, 0);
        assert_eq!(c.difficulty_level, 1);
    }

    #[test]
    fn embedding_is_normalized() {
        let c = Concept::new("z", "Z", SubjectTag::Physics, 3)
            .with_prerequisite("a", 0.5)
            .with_enables("b", 0.5);
        let e = c.embedding();
        assert!(e.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((e[0] - 0.5).abs() < 1e-9); // (3-1)/4
    }
}


