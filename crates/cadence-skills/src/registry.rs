//! Skill registry capability and an in-memory implementation

use cadence_core::{CadenceError, Result, Skill};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Who activated a skill when the workflow manager does it
pub const DEFAULT_ACTIVATED_BY: &str = "workflow-manager";

/// Capability for looking up skills and toggling their active flag
///
/// The registry owns both the skills and the "active" flag; the activation
/// engine only reads skills and asks the registry to flip the flag.
pub trait SkillRegistry: Send + Sync {
    /// Skills tagged for `phase`, in registry order
    fn get_by_phase(&self, phase: &str) -> Vec<Skill>;

    fn activate(&self, name: &str, scope: &str, activated_by: &str) -> Result<()>;

    fn deactivate(&self, name: &str) -> Result<()>;

    fn is_active(&self, name: &str) -> bool;

    /// Formatted description of every registered skill
    fn get_descriptions(&self) -> String;
}

/// Record of why and when a skill was activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub scope: String,
    pub activated_by: String,
    pub activated_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    skills: Vec<Skill>,
    active: HashMap<String, Activation>,
}

/// Thread-safe registry keeping skills in registration order
#[derive(Default)]
pub struct InMemorySkillRegistry {
    inner: RwLock<RegistryInner>,
}

impl InMemorySkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skills(skills: impl IntoIterator<Item = Skill>) -> Self {
        let registry = Self::new();
        for skill in skills {
            registry.register(skill);
        }
        registry
    }

    /// Register a skill, replacing any existing skill with the same name
    pub fn register(&self, skill: Skill) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.skills.iter_mut().find(|s| s.name == skill.name) {
            *existing = skill;
        } else {
            inner.skills.push(skill);
        }
    }

    /// Load every `*.toml` skill definition in `dir`, sorted by file name
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let registry = Self::new();
        if !dir.exists() {
            return Ok(registry);
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("toml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let skill: Skill = toml::from_str(&content).map_err(|e| {
                CadenceError::Config(format!("Invalid skill file {}: {}", path.display(), e))
            })?;
            debug!("Loaded skill {} from {:?}", skill.name, path);
            registry.register(skill);
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<Skill> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.skills.iter().find(|s| s.name == name).cloned()
    }

    pub fn activation(&self, name: &str) -> Option<Activation> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.active.get(name).cloned()
    }

    /// Names of active skills, in registry order
    pub fn active_names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .skills
            .iter()
            .filter(|s| inner.active.contains_key(&s.name))
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SkillRegistry for InMemorySkillRegistry {
    fn get_by_phase(&self, phase: &str) -> Vec<Skill> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .skills
            .iter()
            .filter(|s| s.is_tagged_for(phase))
            .cloned()
            .collect()
    }

    fn activate(&self, name: &str, scope: &str, activated_by: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.skills.iter().any(|s| s.name == name) {
            return Err(CadenceError::SkillNotFound(name.to_string()));
        }
        inner.active.entry(name.to_string()).or_insert_with(|| Activation {
            scope: scope.to_string(),
            activated_by: activated_by.to_string(),
            activated_at: Utc::now(),
        });
        Ok(())
    }

    fn deactivate(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.skills.iter().any(|s| s.name == name) {
            return Err(CadenceError::SkillNotFound(name.to_string()));
        }
        match inner.active.remove(name) {
            Some(_) => Ok(()),
            None => Err(CadenceError::SkillDeactivation {
                name: name.to_string(),
                message: "skill is not active".to_string(),
            }),
        }
    }

    fn is_active(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.active.contains_key(name)
    }

    fn get_descriptions(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.skills.is_empty() {
            return String::new();
        }

        let mut out = String::from("Available skills:\n");
        for skill in &inner.skills {
            let marker = if inner.active.contains_key(&skill.name) {
                " [active]"
            } else {
                ""
            };
            let phases = if skill.phases.is_empty() {
                "any".to_string()
            } else {
                skill.phases.join(", ")
            };
            out.push_str(&format!(
                "- {}{} ({}): {}\n",
                skill.name, marker, phases, skill.description
            ));
        }
        out
    }
}
