//! Unified error types for Cadence

use thiserror::Error;

/// Reason recorded when a shell command needs elevated privileges
pub const PERMISSION_ESCALATION: &str = "Permission Escalation";

/// Which skill operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillOperation {
    Activate,
    Inject,
    Deactivate,
}

impl std::fmt::Display for SkillOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activate => write!(f, "activate"),
            Self::Inject => write!(f, "inject"),
            Self::Deactivate => write!(f, "deactivate"),
        }
    }
}

/// One failed skill operation inside an aggregate error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillFailure {
    pub skill: String,
    pub operation: SkillOperation,
    pub message: String,
}

impl SkillFailure {
    pub fn new(skill: impl Into<String>, operation: SkillOperation, message: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            operation,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SkillFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.skill, self.operation, self.message)
    }
}

fn describe_failures(failures: &[SkillFailure]) -> String {
    let listed: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!(
        "{} skill operation(s) failed: {}",
        failures.len(),
        listed.join("; ")
    )
}

/// Coarse classification of an error, stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Automation is blocked pending human input; not a failure
    PauseSignal,
    /// A required precondition was missing; fatal to the call
    Precondition,
    /// One or more per-skill operations failed; every item was attempted
    AggregateSkill,
    /// Durable store, tracker or telemetry failure; logged, never propagated
    SoftPersistence,
    Other,
}

/// Unified error type for all Cadence operations
#[derive(Error, Debug)]
pub enum CadenceError {
    // Control signal
    #[error("Workflow paused ({reason}): {question}")]
    Paused { reason: String, question: String },

    // Preconditions
    #[error("No planning artifact: start planning before execution")]
    NoPlanningArtifact,

    #[error("No conversation attached: cannot inject skill '{0}'")]
    NoConversation(String),

    // Skill errors
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Skill activation failed for '{name}': {message}")]
    SkillActivation { name: String, message: String },

    #[error("Skill deactivation failed for '{name}': {message}")]
    SkillDeactivation { name: String, message: String },

    #[error("{}", describe_failures(.0))]
    SkillFailures(Vec<SkillFailure>),

    // Collaborator failures
    #[error("Session store error: {0}")]
    Store(String),

    #[error("Execution tracker error: {0}")]
    Tracker(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Research failed: {0}")]
    Research(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Paused { .. } => ErrorKind::PauseSignal,
            Self::NoPlanningArtifact | Self::NoConversation(_) => ErrorKind::Precondition,
            Self::SkillFailures(_) => ErrorKind::AggregateSkill,
            Self::Store(_) | Self::Tracker(_) | Self::Telemetry(_) => ErrorKind::SoftPersistence,
            _ => ErrorKind::Other,
        }
    }

    /// True when this error means "waiting on a human", not "something broke"
    pub fn is_pause(&self) -> bool {
        self.kind() == ErrorKind::PauseSignal
    }

    /// Reason and question carried by a pause signal
    pub fn pause_details(&self) -> Option<(&str, &str)> {
        match self {
            Self::Paused { reason, question } => Some((reason.as_str(), question.as_str())),
            _ => None,
        }
    }

    /// Per-skill failures carried by an aggregate error
    pub fn skill_failures(&self) -> &[SkillFailure] {
        match self {
            Self::SkillFailures(failures) => failures,
            _ => &[],
        }
    }
}

/// Result type alias using CadenceError
pub type Result<T> = std::result::Result<T, CadenceError>;
