//! Core type definitions for Cadence orchestration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow phase. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Planning,
    Execution,
    Review,
}

impl Phase {
    /// Every known phase, in lifecycle order
    pub fn all() -> &'static [Phase] {
        &[Phase::Planning, Phase::Execution, Phase::Review]
    }

    /// Tag used for skill lookups ("planning", "execution", "review")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::Review => "review",
        }
    }

    /// Default active-agent label for this phase
    pub fn agent_label(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Execution => "Execution",
            Self::Review => "Review",
        }
    }

    /// Scope recorded when a skill is activated for this phase
    pub fn scope(&self) -> String {
        skill_scope(self.as_str())
    }
}

/// Scope string for a phase tag, e.g. "planning phase"
pub fn skill_scope(phase: &str) -> String {
    format!("{} phase", phase)
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" | "plan" => Ok(Self::Planning),
            "execution" | "execute" => Ok(Self::Execution),
            "review" => Ok(Self::Review),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

/// A named bundle of instructions and constraints owned by a skill registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Phase tags this skill is activated for
    #[serde(default)]
    pub phases: Vec<String>,
    /// Raw instruction text injected into the conversation
    #[serde(default)]
    pub content: String,
    /// Tool allow-list; empty means unrestricted
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub requires_todo: bool,
    #[serde(default)]
    pub todo_template: String,
}

impl Skill {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn for_phase(mut self, phase: impl Into<String>) -> Self {
        self.phases.push(phase.into());
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_todo(mut self, template: impl Into<String>) -> Self {
        self.requires_todo = true;
        self.todo_template = template.into();
        self
    }

    pub fn is_tagged_for(&self, phase: &str) -> bool {
        self.phases.iter().any(|p| p == phase)
    }

    /// Whether this skill restricts the tools a conversation may call
    pub fn restricts_tools(&self) -> bool {
        !self.allowed_tools.is_empty()
    }
}

/// Snapshot of the in-memory pause record
///
/// A paused record always carries a non-empty reason. An unpaused record is
/// all-empty with no timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseInfo {
    pub paused: bool,
    pub reason: String,
    pub question: String,
    pub paused_at: Option<DateTime<Utc>>,
}

impl PauseInfo {
    pub fn paused(reason: impl Into<String>, question: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            paused: true,
            reason: reason.into(),
            question: question.into(),
            paused_at: Some(at),
        }
    }
}

/// Status of a durable session record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Durable, restart-surviving record of one orchestration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub pause_reason: Option<String>,
    #[serde(default)]
    pub pause_question: Option<String>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Active,
            pause_reason: None,
            pause_question: None,
            paused_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a pause update; `None` timestamp clears the pause
    pub fn apply_pause(&mut self, reason: &str, question: &str, paused_at: Option<DateTime<Utc>>) {
        match paused_at {
            Some(at) => {
                self.status = SessionStatus::Paused;
                self.pause_reason = Some(reason.to_string());
                self.pause_question = Some(question.to_string());
                self.paused_at = Some(at);
            }
            None => {
                if self.status == SessionStatus::Paused {
                    self.status = SessionStatus::Active;
                }
                self.pause_reason = None;
                self.pause_question = None;
                self.paused_at = None;
            }
        }
        self.updated_at = Utc::now();
    }

    /// Pause record to rehydrate, if this session is paused with details
    pub fn pause_info(&self) -> Option<PauseInfo> {
        if self.status != SessionStatus::Paused {
            return None;
        }
        let reason = self.pause_reason.clone().unwrap_or_default();
        let question = self.pause_question.clone().unwrap_or_default();
        if reason.is_empty() && question.is_empty() {
            return None;
        }
        Some(PauseInfo {
            paused: true,
            reason,
            question,
            paused_at: self.paused_at,
        })
    }
}

/// Pause entry appended to an execution tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPause {
    pub reason: String,
    pub question: String,
    pub paused_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution_label: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl ExecutionPause {
    pub fn new(reason: impl Into<String>, question: impl Into<String>, paused_at: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            question: question.into(),
            paused_at,
            resolved_at: None,
            resolution_label: None,
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
