//! # cadence-skills
//!
//! Skill activation engine for Cadence.
//!
//! This crate provides:
//! - The `SkillRegistry` and `Conversation` capabilities the engine talks to
//! - In-memory implementations of both, plus a TOML directory loader
//! - `SkillManager`, which (de)activates every skill tagged for a phase,
//!   injects skill content, installs tool filters and enforces TODO policy

mod conversation;
mod manager;
mod registry;

pub use conversation::{Conversation, InMemoryConversation, HAS_TODOS_KEY};
pub use manager::{build_skill_message, todo_requirement_block, SkillManager, TODO_WARNING_MARKER};
pub use registry::{Activation, InMemorySkillRegistry, SkillRegistry, DEFAULT_ACTIVATED_BY};
