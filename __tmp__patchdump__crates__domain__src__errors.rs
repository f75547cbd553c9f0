use thiserror::Error;
use validator::ValidationErrors;

use crate::ids::ConceptId;
use crate::result::ErrorKind;

/// Library error type for the engine. Carries no transport mapping — unlike
/// an HTTP-facing error type, callers decide how to surface these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("concept not found: {0}")]
    NotFound(ConceptId),

    #[error("cycle detected in prerequisite graph at or reachable from {0}")]
    CycleDetected(ConceptId),

    #[error("operation cancelled before entering the learner's critical section")]
    Cancelled,

    #[error("update aborted before write-back: time budget exceeded")]
    TimeBudgetExceeded,

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::CycleDetected(_) => ErrorKind::CycleDetected,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::TimeBudgetExceeded => ErrorKind::TimeBudgetExceeded,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        EngineError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_each_variant() {
        assert_eq!(EngineError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(EngineError::NotFound("x".into()).kind(), ErrorKind::NotFound);
    }
}


