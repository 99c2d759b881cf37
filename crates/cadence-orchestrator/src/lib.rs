//! # cadence-orchestrator
//!
//! Workflow orchestration engine for Cadence.
//!
//! This crate provides:
//! - `WorkflowManager`, the planning -> execution -> review state machine
//! - Command risk classification and tool-call authorization
//! - Durable pause/resume backed by a session store
//! - A lossy progress channel and a bounded research step

mod execution;
mod pause;
mod planning;
mod progress;
mod research;
mod review;
pub mod risk;
mod session;
mod workflow;

pub use pause::PauseMonitor;
pub use progress::{ProgressNotifier, ProgressUpdate};
pub use research::{ResearchReport, Researcher};
pub use risk::CommandRisk;
pub use session::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use workflow::{WorkflowManager, RESUME_LABEL, DEFAULT_RESOLUTION};
