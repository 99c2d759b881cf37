//! Execution phase controller

use cadence_artifacts::PlanningArtifact;
use cadence_core::{CadenceError, Phase, Result, SkillOperation};
use cadence_metrics::{counters, TelemetryEventKind};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

use crate::workflow::{absorb_skill_result, failures_into_result, WorkflowManager};

impl WorkflowManager {
    /// Enter execution for the current planning artifact
    ///
    /// Without an in-memory artifact, `planning_artifact_path` is loaded
    /// instead; if neither is available the call fails with
    /// `NoPlanningArtifact` and nothing changes. A tracker that cannot be
    /// initialized fails the call. Skill failures are returned together after
    /// every other side effect has happened.
    pub async fn start_execution(&mut self, planning_artifact_path: &str) -> Result<()> {
        if self.planning_artifact.is_none() {
            self.planning_artifact = Some(load_planning_artifact(planning_artifact_path).await?);
        }

        self.clear_pause().await;
        self.enter_phase(Phase::Execution).await;

        let mut failures = Vec::new();
        absorb_skill_result(
            &mut failures,
            SkillOperation::Deactivate,
            Phase::Planning,
            self.skills.deactivate_phase_skills(Phase::Planning.as_str()),
        );
        let activation = self.skills.activate_phase_skills(Phase::Execution.as_str());
        if activation.is_ok() {
            counters::record_skill_activation();
        }
        absorb_skill_result(&mut failures, SkillOperation::Activate, Phase::Execution, activation);

        let Some(artifact) = &self.planning_artifact else {
            return Err(CadenceError::NoPlanningArtifact);
        };
        let task_count = artifact.task_count();
        let tracker = self.tracker_factory.create(artifact).await?;
        self.tracker = Some(tracker);
        info!(tasks = task_count, "Execution tracker ready");

        self.emit_plan_event(
            TelemetryEventKind::PlanUpdated,
            json!({ "phase": Phase::Execution.as_str(), "tasks": task_count }),
        )
        .await;

        if !failures.is_empty() {
            warn!(count = failures.len(), "Skill operations failed entering execution");
        }
        failures_into_result(failures)
    }
}

async fn load_planning_artifact(path: &str) -> Result<PlanningArtifact> {
    if path.trim().is_empty() {
        return Err(CadenceError::NoPlanningArtifact);
    }
    PlanningArtifact::load(Path::new(path)).await.map_err(|e| {
        warn!(path, error = %e, "Cannot load planning artifact");
        CadenceError::NoPlanningArtifact
    })
}
