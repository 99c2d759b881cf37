//! Cadence Artifacts - phase-specific records produced by workflow transitions
//!
//! Planning artifacts carry the feature, its tasks and optional research
//! context. Execution is tracked by an `ExecutionTracker`, with `ExecutionLog`
//! as the JSON-backed implementation. Review artifacts reference both prior
//! artifacts by path.

pub mod execution;
pub mod planning;
pub mod review;

pub use execution::{ExecutionLog, ExecutionLogFactory, ExecutionState, ExecutionTracker, TrackerFactory};
pub use planning::{PlannedTask, PlanningArtifact, ResearchContext};
pub use review::{ReviewArtifact, ReviewStatus};
