//! # cadence-core
//!
//! Core types for the Cadence workflow orchestrator.
//!
//! Cadence drives a feature through a fixed three-phase lifecycle
//! (planning, execution, review). This crate holds what every other crate
//! shares:
//!
//! - The phase tags and the skill/pause/session records passed between crates
//! - `CadenceError`, whose `kind()` separates pause signals from failures
//! - Repository-level configuration loaded from `.cadence/config.toml`
//! - Fail-open helpers for best-effort infrastructure calls

mod error;
mod types;

pub mod config;
pub mod fail_open;

pub use config::CadenceConfig;
pub use error::{
    CadenceError, ErrorKind, Result, SkillFailure, SkillOperation, PERMISSION_ESCALATION,
};
pub use types::*;
