//! Phase-scoped skill activation engine
//!
//! `SkillManager` walks every skill a registry tags for a phase and either
//! activates or deactivates it. Activation injects the skill's content as a
//! single system message and installs its tool filter; deactivation clears
//! the filter once no restricted skill remains active in any phase.
//!
//! Per-skill failures never stop the walk. They are collected and returned
//! together as `CadenceError::SkillFailures` once every skill was attempted.
//! Partial activation is a valid final state; nothing is rolled back.

use cadence_core::{skill_scope, CadenceError, Phase, Result, Skill, SkillFailure, SkillOperation};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::registry::{SkillRegistry, DEFAULT_ACTIVATED_BY};

/// Marker placed in the TODO block when the conversation has no TODO list
pub const TODO_WARNING_MARKER: &str = "WARNING: No TODO list found for this conversation.";

/// Drives skill (de)activation for workflow phases
#[derive(Clone)]
pub struct SkillManager {
    registry: Option<Arc<dyn SkillRegistry>>,
    conversation: Option<Arc<dyn Conversation>>,
    activated_by: String,
}

impl Default for SkillManager {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SkillManager {
    pub fn new(
        registry: Option<Arc<dyn SkillRegistry>>,
        conversation: Option<Arc<dyn Conversation>>,
    ) -> Self {
        Self {
            registry,
            conversation,
            activated_by: DEFAULT_ACTIVATED_BY.to_string(),
        }
    }

    pub fn with_activated_by(mut self, activated_by: impl Into<String>) -> Self {
        self.activated_by = activated_by.into();
        self
    }

    /// Activate every skill tagged for `phase` that is not already active
    ///
    /// Succeeds without side effects when no registry is configured or no
    /// skill is tagged for the phase. Skills are processed, and their messages
    /// appended, in registry order.
    pub fn activate_phase_skills(&self, phase: &str) -> Result<()> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };

        let skills = registry.get_by_phase(phase);
        if skills.is_empty() {
            debug!("No skills tagged for {} phase", phase);
            return Ok(());
        }

        let scope = skill_scope(phase);
        let mut failures = Vec::new();

        for skill in &skills {
            if registry.is_active(&skill.name) {
                debug!("Skill {} already active, skipping", skill.name);
                continue;
            }

            if let Err(e) = registry.activate(&skill.name, &scope, &self.activated_by) {
                failures.push(SkillFailure::new(&skill.name, SkillOperation::Activate, e.to_string()));
                continue;
            }

            match self.inject_skill_content(skill, phase) {
                Ok(()) => info!(skill = %skill.name, phase, "Activated skill"),
                Err(e) => {
                    failures.push(SkillFailure::new(&skill.name, SkillOperation::Inject, e.to_string()))
                }
            }
        }

        into_result(failures)
    }

    /// Deactivate every active skill tagged for `phase`
    ///
    /// Afterwards the tool filter is cleared only if no skill active in any
    /// known phase still declares an allow-list.
    pub fn deactivate_phase_skills(&self, phase: &str) -> Result<()> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };

        let skills = registry.get_by_phase(phase);
        if skills.is_empty() {
            return Ok(());
        }

        let mut failures = Vec::new();

        for skill in skills.iter().filter(|s| registry.is_active(&s.name)) {
            match registry.deactivate(&skill.name) {
                Ok(()) => info!(skill = %skill.name, phase, "Deactivated skill"),
                Err(e) => failures.push(SkillFailure::new(
                    &skill.name,
                    SkillOperation::Deactivate,
                    e.to_string(),
                )),
            }
        }

        if let Some(conversation) = &self.conversation {
            if !self.has_active_tool_filters() {
                debug!("No restricted skills remain active, clearing tool filter");
                conversation.clear_tool_filter();
            }
        }

        into_result(failures)
    }

    /// Whether any active skill, across every known phase, restricts tools
    ///
    /// A skill tagged for several phases is considered once.
    pub fn has_active_tool_filters(&self) -> bool {
        let Some(registry) = &self.registry else {
            return false;
        };

        let mut seen = HashSet::new();
        Phase::all().iter().any(|phase| {
            registry
                .get_by_phase(phase.as_str())
                .into_iter()
                .filter(|skill| seen.insert(skill.name.clone()))
                .any(|skill| skill.restricts_tools() && registry.is_active(&skill.name))
        })
    }

    /// Registry's formatted skill descriptions, empty without a registry
    pub fn skills_description(&self) -> String {
        self.registry
            .as_ref()
            .map(|r| r.get_descriptions())
            .unwrap_or_default()
    }

    fn inject_skill_content(&self, skill: &Skill, phase: &str) -> Result<()> {
        let conversation = self
            .conversation
            .as_ref()
            .ok_or_else(|| CadenceError::NoConversation(skill.name.clone()))?;

        let message = build_skill_message(skill, phase, conversation.has_todos());
        conversation.add_system_message(&message);

        if skill.restricts_tools() {
            // Last writer wins: filters from concurrently active skills are not merged
            debug!("Skill {} restricts tools to {:?}", skill.name, skill.allowed_tools);
            conversation.set_tool_filter(&skill.allowed_tools);
        }

        Ok(())
    }
}

fn into_result(failures: Vec<SkillFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CadenceError::SkillFailures(failures))
    }
}

/// TODO requirement block; the template is always included
pub fn todo_requirement_block(skill: &Skill, has_todos: bool) -> String {
    let mut block = String::from("### TODO Requirement\n");
    if !has_todos {
        block.push_str(TODO_WARNING_MARKER);
        block.push_str(" Create one before starting work.\n");
    }
    block.push_str("This skill requires a TODO list. Use this template:\n\n");
    block.push_str(skill.todo_template.trim_end());
    block.push('\n');
    block
}

/// System message injected when a skill activates
pub fn build_skill_message(skill: &Skill, phase: &str, has_todos: bool) -> String {
    let mut message = format!("## Skill Activated: {}\n", skill.name);
    if !skill.description.is_empty() {
        message.push_str(&format!("{}\n", skill.description));
    }
    message.push_str(&format!("Scope: {}\n\n", skill_scope(phase)));

    if skill.requires_todo {
        message.push_str(&todo_requirement_block(skill, has_todos));
        message.push('\n');
    }

    message.push_str(&skill.content);
    message
}
