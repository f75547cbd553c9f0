/// Opaque concept identifier, stable across catalog reloads.
pub type ConceptId = String;

/// Opaque learner identifier supplied by the host.
pub type LearnerId = String;
