//! Workflow manager: the planning -> execution -> review state machine
//!
//! The manager owns the current phase, the active-agent label, the pause cell
//! and the collaborators each phase transition drives. Transitions take
//! `&mut self` and are triggered explicitly by an external driver; the manager
//! never re-enters a prior phase on its own.
//!
//! Pause operations and tool-call authorization take `&self` so they can run
//! while other tasks read pause state through a [`PauseMonitor`].

use cadence_artifacts::{
    ExecutionLogFactory, ExecutionTracker, PlanningArtifact, ReviewArtifact, TrackerFactory,
};
use cadence_core::fail_open::fail_open;
use cadence_core::{
    CadenceConfig, CadenceError, PauseInfo, Phase, Result, SkillFailure, SkillOperation,
    PERMISSION_ESCALATION,
};
use cadence_metrics::{counters, TelemetryEvent, TelemetryEventKind, TelemetrySink};
use cadence_skills::SkillManager;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::pause::PauseMonitor;
use crate::progress::ProgressNotifier;
use crate::research::Researcher;
use crate::risk::{classify_with, elevation_question, CommandRisk};
use crate::session::SessionStore;

/// Label recorded on a tracker pause resolved by [`WorkflowManager::resume`]
pub const RESUME_LABEL: &str = "user resolution";

/// Resolution text used when a resume carries none
pub const DEFAULT_RESOLUTION: &str = "Resumed by user";

/// Orchestrates one feature through its three phases
pub struct WorkflowManager {
    pub(crate) config: CadenceConfig,
    pub(crate) phase: Phase,
    pub(crate) active_agent: Option<String>,
    pub(crate) pause: Arc<RwLock<PauseInfo>>,
    // Orders session-store writes of the pause record
    pub(crate) persist_gate: Mutex<()>,
    pub(crate) skills: SkillManager,
    pub(crate) telemetry: Option<Arc<dyn TelemetrySink>>,
    pub(crate) session_store: Option<Arc<dyn SessionStore>>,
    pub(crate) session_id: Option<String>,
    pub(crate) researcher: Option<Arc<dyn Researcher>>,
    pub(crate) tracker_factory: Arc<dyn TrackerFactory>,
    pub(crate) tracker: Option<Arc<dyn ExecutionTracker>>,
    pub(crate) progress: ProgressNotifier,
    pub(crate) planning_artifact: Option<PlanningArtifact>,
    pub(crate) review_artifact: Option<ReviewArtifact>,
}

impl WorkflowManager {
    pub fn new(config: CadenceConfig) -> Self {
        let progress = ProgressNotifier::new(config.progress.capacity);
        Self {
            config,
            phase: Phase::Planning,
            active_agent: None,
            pause: Arc::new(RwLock::new(PauseInfo::default())),
            persist_gate: Mutex::new(()),
            skills: SkillManager::default(),
            telemetry: None,
            session_store: None,
            session_id: None,
            researcher: None,
            tracker_factory: Arc::new(ExecutionLogFactory::in_memory()),
            tracker: None,
            progress,
            planning_artifact: None,
            review_artifact: None,
        }
    }

    pub fn with_skills(mut self, skills: SkillManager) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Attach a durable session store and the session this run belongs to
    pub fn with_session(mut self, store: Arc<dyn SessionStore>, session_id: impl Into<String>) -> Self {
        self.session_store = Some(store);
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_researcher(mut self, researcher: Arc<dyn Researcher>) -> Self {
        self.researcher = Some(researcher);
        self
    }

    pub fn with_tracker_factory(mut self, factory: Arc<dyn TrackerFactory>) -> Self {
        self.tracker_factory = factory;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Who is "speaking"; defaults to the phase label when unset
    pub fn active_agent(&self) -> &str {
        self.active_agent
            .as_deref()
            .unwrap_or_else(|| self.phase.agent_label())
    }

    pub fn set_active_agent(&mut self, agent: impl Into<String>) {
        self.active_agent = Some(agent.into());
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn skills(&self) -> &SkillManager {
        &self.skills
    }

    pub fn skills_description(&self) -> String {
        self.skills.skills_description()
    }

    pub fn has_active_tool_filters(&self) -> bool {
        self.skills.has_active_tool_filters()
    }

    pub fn progress(&self) -> &ProgressNotifier {
        &self.progress
    }

    pub fn planning_artifact(&self) -> Option<&PlanningArtifact> {
        self.planning_artifact.as_ref()
    }

    /// Provide a planning artifact produced outside `start_planning`
    pub fn set_planning_artifact(&mut self, artifact: PlanningArtifact) {
        self.planning_artifact = Some(artifact);
    }

    pub fn review_artifact(&self) -> Option<&ReviewArtifact> {
        self.review_artifact.as_ref()
    }

    pub fn tracker(&self) -> Option<&Arc<dyn ExecutionTracker>> {
        self.tracker.as_ref()
    }

    /// Read-only handle over the pause cell, usable from other tasks
    pub fn pause_monitor(&self) -> PauseMonitor {
        PauseMonitor::new(self.pause.clone())
    }

    /// Gate a tool call before it executes
    ///
    /// Only shell tools with a string `command` parameter are inspected. An
    /// elevated command pauses the workflow and returns the pause signal.
    pub async fn authorize_tool_call(&self, tool: &str, params: &Value) -> Result<()> {
        let policy = &self.config.authorization;
        if !policy.is_shell_tool(tool) {
            return Ok(());
        }
        let Some(command) = params.get("command").and_then(Value::as_str) else {
            return Ok(());
        };

        counters::record_authorization();

        match classify_with(command, &policy.safe_prefixes) {
            CommandRisk::Elevated => {
                let question = elevation_question(command, policy.summary_max_chars);
                Err(self.pause_workflow(PERMISSION_ESCALATION, &question).await)
            }
            risk => {
                debug!(tool, %risk, "Tool call authorized");
                Ok(())
            }
        }
    }

    /// Record a finished task on the tracker and report progress
    pub async fn complete_task(&self, task_id: &str) {
        let Some(tracker) = &self.tracker else {
            debug!("No execution tracker, ignoring completion of {}", task_id);
            return;
        };

        if let Some((done, total)) =
            fail_open("tracker::complete_task", || tracker.complete_task(task_id)).await
        {
            self.progress
                .notify(format!("Task {} complete ({}/{})", task_id, done, total));
            self.emit_task_event(
                TelemetryEventKind::TaskCompleted,
                task_id,
                serde_json::json!({ "completed": done, "total": total }),
            )
            .await;
        }
    }

    pub async fn emit_plan_event(&self, kind: TelemetryEventKind, payload: Value) {
        self.publish(self.event(kind).with_payload(payload)).await;
    }

    pub async fn emit_task_event(&self, kind: TelemetryEventKind, task_id: &str, payload: Value) {
        self.publish(self.event(kind).with_task(task_id).with_payload(payload))
            .await;
    }

    pub async fn emit_builder_event(&self, kind: TelemetryEventKind, payload: Value) {
        self.publish(
            self.event(kind)
                .with_field("agent", self.active_agent())
                .with_payload(payload),
        )
        .await;
    }

    pub async fn emit_research_event(&self, kind: TelemetryEventKind, payload: Value) {
        self.publish(self.event(kind).with_payload(payload)).await;
    }

    /// Event pre-filled with the session and plan identifiers
    fn event(&self, kind: TelemetryEventKind) -> TelemetryEvent {
        let mut event = TelemetryEvent::new(kind).with_field("phase", self.phase.as_str());
        if let Some(session_id) = &self.session_id {
            event = event.with_session(session_id.clone());
        }
        if let Some(plan) = &self.planning_artifact {
            event = event.with_plan(plan.id.clone());
        }
        event
    }

    pub(crate) async fn publish(&self, event: TelemetryEvent) {
        if let Some(sink) = &self.telemetry {
            fail_open("telemetry::publish", || sink.publish(event)).await;
        }
    }

    /// Shared bookkeeping for every phase transition
    pub(crate) async fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.active_agent = Some(phase.agent_label().to_string());
        counters::record_phase_started();
        info!(phase = %phase, "Starting {} phase", phase);
        self.progress.notify(format!("Starting {} phase", phase));
        self.publish(self.event(TelemetryEventKind::PhaseStarted)).await;
    }
}

impl Default for WorkflowManager {
    fn default() -> Self {
        Self::new(CadenceConfig::default())
    }
}

/// Fold a skill-engine result into the transition's failure list
pub(crate) fn absorb_skill_result(
    failures: &mut Vec<SkillFailure>,
    operation: SkillOperation,
    phase: Phase,
    result: Result<()>,
) {
    match result {
        Ok(()) => {}
        Err(CadenceError::SkillFailures(mut items)) => failures.append(&mut items),
        Err(other) => failures.push(SkillFailure::new(
            format!("{} skills", phase),
            operation,
            other.to_string(),
        )),
    }
}

pub(crate) fn failures_into_result(failures: Vec<SkillFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CadenceError::SkillFailures(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ErrorKind;
    use cadence_metrics::TelemetryHub;
    use serde_json::json;

    #[tokio::test]
    async fn test_sudo_command_pauses_with_permission_escalation() {
        let manager = WorkflowManager::default();
        let err = manager
            .authorize_tool_call("bash", &json!({ "command": "sudo rm -rf /" }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PauseSignal);
        let (reason, question) = err.pause_details().unwrap();
        assert_eq!(reason, "Permission Escalation");
        assert!(question.contains("sudo rm -rf /"));

        let info = manager.get_pause_info().await;
        assert!(info.paused);
        assert_eq!(info.reason, "Permission Escalation");
    }

    #[tokio::test]
    async fn test_safe_prefix_wins_over_trailing_sudo() {
        let manager = WorkflowManager::default();
        for command in ["git commit -m sudo", "git status && sudo rm -rf /", "sudoku --solve", ""] {
            manager
                .authorize_tool_call("bash", &json!({ "command": command }))
                .await
                .unwrap();
        }
        assert!(!manager.get_pause_info().await.paused);
    }

    #[tokio::test]
    async fn test_non_shell_tools_and_odd_params_pass() {
        let manager = WorkflowManager::default();
        manager
            .authorize_tool_call("read_file", &json!({ "command": "sudo ls" }))
            .await
            .unwrap();
        manager
            .authorize_tool_call("bash", &json!({ "command": ["sudo", "ls"] }))
            .await
            .unwrap();
        manager.authorize_tool_call("bash", &json!({})).await.unwrap();
        assert!(!manager.get_pause_info().await.paused);
    }

    #[tokio::test]
    async fn test_long_command_question_is_bounded() {
        let manager = WorkflowManager::default();
        let command = format!("sudo {}", "a".repeat(200));
        let err = manager
            .authorize_tool_call("shell", &json!({ "command": command }))
            .await
            .unwrap_err();
        let (_, question) = err.pause_details().unwrap();
        assert!(question.contains(&format!("{}...", &command[..80])));
        assert!(!question.contains(&command[..81]));
    }

    #[tokio::test]
    async fn test_active_agent_defaults_to_phase_label() {
        let mut manager = WorkflowManager::default();
        assert_eq!(manager.active_agent(), "Planning");
        manager.set_active_agent("Architect");
        assert_eq!(manager.active_agent(), "Architect");
    }

    #[tokio::test]
    async fn test_emitted_events_carry_identifiers() {
        let hub = Arc::new(TelemetryHub::new());
        let store = Arc::new(crate::session::InMemorySessionStore::new());
        let mut manager = WorkflowManager::default()
            .with_telemetry(hub.clone())
            .with_session(store, "s-42");
        manager.set_planning_artifact(PlanningArtifact::new("login", "goal"));
        let plan_id = manager.planning_artifact().unwrap().id.clone();

        manager
            .emit_task_event(TelemetryEventKind::TaskStarted, "task-1", json!({ "attempt": 1 }))
            .await;
        manager
            .emit_builder_event(TelemetryEventKind::BuilderStarted, json!(null))
            .await;

        let events = hub.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].session_id.as_deref(), Some("s-42"));
        assert_eq!(events[0].plan_id.as_deref(), Some(plan_id.as_str()));
        assert_eq!(events[0].task_id.as_deref(), Some("task-1"));
        assert_eq!(events[0].payload["attempt"], json!(1));
        assert_eq!(events[1].payload["agent"], json!("Planning"));
    }

    #[test]
    fn test_absorb_flattens_aggregate_errors() {
        let mut failures = Vec::new();
        absorb_skill_result(&mut failures, SkillOperation::Activate, Phase::Review, Ok(()));
        absorb_skill_result(
            &mut failures,
            SkillOperation::Deactivate,
            Phase::Review,
            Err(CadenceError::SkillFailures(vec![SkillFailure::new(
                "a",
                SkillOperation::Deactivate,
                "x",
            )])),
        );
        absorb_skill_result(
            &mut failures,
            SkillOperation::Activate,
            Phase::Review,
            Err(CadenceError::Other("registry gone".into())),
        );

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[1].skill, "review skills");
        assert!(failures_into_result(failures).is_err());
        assert!(failures_into_result(Vec::new()).is_ok());
    }
}
