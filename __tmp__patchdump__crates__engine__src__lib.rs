//! Knowledge-tracing and adaptation engine.
//!
//! Wires together the static concept graph (C1), the prerequisite analyzer
//! (C2), the cognitive-load assessor (C3), the stress detector (C4), the
//! time allocator (C5), the transfer-learning engine (C6), the per-learner
//! adaptive profile (C7), and the Bayesian knowledge-tracing update core
//! (C8) behind a single [`registry::EngineHandle`].

pub mod adaptive_profile;
pub mod bkt;
pub mod cognitive_load;
pub mod concept_graph;
pub mod ports;
pub mod prerequisite;
pub mod registry;
pub mod stress;
pub mod time_allocator;
pub mod transfer;

pub use concept_graph::ConceptGraph;
pub use ports::{Clock, FixedClock, SystemClock};
pub use registry::{EngineHandle, LoadRequest, TimeRequest};
pub use transfer::{TransferAnalytics, TransferAuditLog};


