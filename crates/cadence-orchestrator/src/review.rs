//! Review phase controller

use cadence_artifacts::ReviewArtifact;
use cadence_core::{Phase, Result, SkillOperation};
use cadence_metrics::{counters, TelemetryEventKind};
use serde_json::json;
use tracing::warn;

use crate::workflow::{absorb_skill_result, failures_into_result, WorkflowManager};

impl WorkflowManager {
    /// Enter review with an artifact referencing both prior artifacts
    ///
    /// An outstanding pause is kept. Skill failures are returned together
    /// after the review artifact has been built.
    pub async fn start_review(&mut self, planning_path: &str, execution_path: &str) -> Result<()> {
        self.enter_phase(Phase::Review).await;

        let mut failures = Vec::new();
        absorb_skill_result(
            &mut failures,
            SkillOperation::Deactivate,
            Phase::Execution,
            self.skills.deactivate_phase_skills(Phase::Execution.as_str()),
        );
        let activation = self.skills.activate_phase_skills(Phase::Review.as_str());
        if activation.is_ok() {
            counters::record_skill_activation();
        }
        absorb_skill_result(&mut failures, SkillOperation::Activate, Phase::Review, activation);

        self.review_artifact = Some(ReviewArtifact::new(planning_path, execution_path));
        self.emit_plan_event(
            TelemetryEventKind::PlanUpdated,
            json!({
                "phase": Phase::Review.as_str(),
                "planning_path": planning_path,
                "execution_path": execution_path,
            }),
        )
        .await;

        if !failures.is_empty() {
            warn!(count = failures.len(), "Skill operations failed entering review");
        }
        failures_into_result(failures)
    }
}
