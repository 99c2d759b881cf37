//! Planning phase controller

use cadence_artifacts::PlanningArtifact;
use cadence_core::{fail_open::soft, Phase};
use cadence_metrics::{counters, TelemetryEventKind};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::research::run_bounded;
use crate::workflow::WorkflowManager;

impl WorkflowManager {
    /// Enter planning and build a fresh planning artifact
    ///
    /// Skill activation failures are logged, not returned. When a researcher
    /// is configured its findings are copied into the artifact; a failed,
    /// timed out or cancelled research step leaves the artifact without
    /// research context.
    pub async fn start_planning(
        &mut self,
        cancel: &CancellationToken,
        feature_name: &str,
        user_goal: &str,
    ) -> &PlanningArtifact {
        self.clear_pause().await;
        self.tracker = None;
        self.review_artifact = None;
        self.planning_artifact = Some(PlanningArtifact::new(feature_name, user_goal));
        self.enter_phase(Phase::Planning).await;

        let activation = self.skills.activate_phase_skills(Phase::Planning.as_str());
        if soft("skills::activate_planning", activation).is_some() {
            counters::record_skill_activation();
        }

        self.emit_plan_event(
            TelemetryEventKind::PlanCreated,
            json!({ "feature": feature_name, "goal": user_goal }),
        )
        .await;

        let research = match self.researcher.clone() {
            Some(researcher) => {
                self.emit_research_event(
                    TelemetryEventKind::ResearchStarted,
                    json!({ "feature": feature_name }),
                )
                .await;

                let limit = self.config.research.timeout();
                match run_bounded(researcher.as_ref(), feature_name, user_goal, limit, cancel).await {
                    Ok(report) => {
                        let context = report.into_context(self.config.research.max_risks);
                        info!(
                            risks = context.risks.len(),
                            files = context.relevant_files.len(),
                            "Research complete"
                        );
                        self.emit_research_event(
                            TelemetryEventKind::ResearchCompleted,
                            json!({
                                "risks": context.risks.len(),
                                "relevant_files": context.relevant_files.len(),
                            }),
                        )
                        .await;
                        Some(context)
                    }
                    Err(e) => {
                        warn!(error = %e, "Research failed, planning without research context");
                        self.emit_research_event(
                            TelemetryEventKind::ResearchFailed,
                            json!({ "error": e.to_string() }),
                        )
                        .await;
                        None
                    }
                }
            }
            None => None,
        };

        let artifact = self
            .planning_artifact
            .get_or_insert_with(|| PlanningArtifact::new(feature_name, user_goal));
        artifact.research = research;
        artifact
    }
}

#[cfg(test)]
mod tests {
    use crate::research::{ResearchReport, Researcher};
    use crate::workflow::WorkflowManager;
    use async_trait::async_trait;
    use cadence_core::{CadenceConfig, CadenceError, Phase, Result, Skill};
    use cadence_metrics::{TelemetryEventKind, TelemetryHub};
    use cadence_skills::{InMemoryConversation, InMemorySkillRegistry, SkillManager, SkillRegistry};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct FixedResearcher(Result<ResearchReport>);

    #[async_trait]
    impl Researcher for FixedResearcher {
        async fn research(&self, _feature_name: &str, _user_goal: &str) -> Result<ResearchReport> {
            match &self.0 {
                Ok(report) => Ok(report.clone()),
                Err(e) => Err(CadenceError::Research(e.to_string())),
            }
        }
    }

    struct StuckResearcher;

    #[async_trait]
    impl Researcher for StuckResearcher {
        async fn research(&self, _feature_name: &str, _user_goal: &str) -> Result<ResearchReport> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ResearchReport::default())
        }
    }

    #[tokio::test]
    async fn test_start_planning_sets_state() {
        let mut manager = WorkflowManager::default();
        manager.pause_workflow("R", "Q").await;
        manager.set_active_agent("Someone");

        let artifact = manager
            .start_planning(&CancellationToken::new(), "login", "Users can sign in")
            .await;
        assert_eq!(artifact.feature_name, "login");
        assert!(artifact.research.is_none());

        assert_eq!(manager.phase(), Phase::Planning);
        assert_eq!(manager.active_agent(), "Planning");
        assert!(!manager.get_pause_info().await.paused);
    }

    #[tokio::test]
    async fn test_research_context_is_copied_with_capped_risks() {
        let researcher = FixedResearcher(Ok(ResearchReport {
            summary: "Auth lives in src/auth".to_string(),
            risks: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            relevant_files: vec!["src/auth/mod.rs".into()],
        }));
        let hub = Arc::new(TelemetryHub::new());
        let mut manager = WorkflowManager::default()
            .with_researcher(Arc::new(researcher))
            .with_telemetry(hub.clone());

        let artifact = manager
            .start_planning(&CancellationToken::new(), "login", "goal")
            .await;
        let research = artifact.research.clone().unwrap();
        assert_eq!(research.summary, "Auth lives in src/auth");
        assert_eq!(research.risks.len(), 3);
        assert_eq!(research.relevant_files, vec!["src/auth/mod.rs"]);

        assert_eq!(hub.count(TelemetryEventKind::ResearchCompleted).await, 1);
        assert_eq!(hub.count(TelemetryEventKind::PlanCreated).await, 1);
    }

    #[tokio::test]
    async fn test_research_failure_degrades_gracefully() {
        let hub = Arc::new(TelemetryHub::new());
        let mut manager = WorkflowManager::default()
            .with_researcher(Arc::new(FixedResearcher(Err(CadenceError::Research(
                "index unavailable".into(),
            )))))
            .with_telemetry(hub.clone());

        let artifact = manager
            .start_planning(&CancellationToken::new(), "login", "goal")
            .await;
        assert!(artifact.research.is_none());
        assert_eq!(hub.count(TelemetryEventKind::ResearchFailed).await, 1);
    }

    #[tokio::test]
    async fn test_research_timeout_degrades_gracefully() {
        let mut config = CadenceConfig::default();
        config.research.timeout_secs = 0;
        let mut manager = WorkflowManager::new(config).with_researcher(Arc::new(StuckResearcher));

        let artifact = manager
            .start_planning(&CancellationToken::new(), "login", "goal")
            .await;
        assert!(artifact.research.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_research() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut manager = WorkflowManager::default().with_researcher(Arc::new(StuckResearcher));

        let artifact = manager.start_planning(&cancel, "login", "goal").await;
        assert!(artifact.research.is_none());
    }

    #[tokio::test]
    async fn test_skill_failures_do_not_block_planning() {
        let registry = Arc::new(InMemorySkillRegistry::with_skills([
            Skill::new("design", "Sketch first").for_phase("planning"),
        ]));
        // No conversation: injection fails, planning still proceeds
        let skills = SkillManager::new(Some(registry.clone()), None);
        let mut manager = WorkflowManager::default().with_skills(skills);

        manager
            .start_planning(&CancellationToken::new(), "login", "goal")
            .await;
        assert_eq!(manager.phase(), Phase::Planning);
        assert!(manager.planning_artifact().is_some());
        assert!(registry.is_active("design"));
    }

    #[tokio::test]
    async fn test_planning_skills_inject_messages() {
        let registry = Arc::new(InMemorySkillRegistry::with_skills([
            Skill::new("design", "Sketch first").for_phase("planning"),
        ]));
        let conversation = Arc::new(InMemoryConversation::new());
        let skills = SkillManager::new(Some(registry), Some(conversation.clone()));
        let mut manager = WorkflowManager::default().with_skills(skills);

        manager
            .start_planning(&CancellationToken::new(), "login", "goal")
            .await;
        assert_eq!(conversation.system_messages().len(), 1);
    }
}
