//! Bounded research step run while planning

use async_trait::async_trait;
use cadence_artifacts::ResearchContext;
use cadence_core::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Findings returned by a researcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub relevant_files: Vec<String>,
}

impl ResearchReport {
    /// Context copied into a planning artifact, keeping at most `max_risks`
    pub fn into_context(self, max_risks: usize) -> ResearchContext {
        let mut risks = self.risks;
        risks.truncate(max_risks);
        ResearchContext {
            summary: self.summary,
            risks,
            relevant_files: self.relevant_files,
        }
    }
}

/// Collaborator that investigates a feature before planning
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, feature_name: &str, user_goal: &str) -> Result<ResearchReport>;
}

/// Run research bounded by `limit` and cancellable through `cancel`
///
/// Every failure mode (error, timeout, cancellation) is returned as an error
/// for the caller to log; none of them is fatal to planning.
pub(crate) async fn run_bounded(
    researcher: &dyn Researcher,
    feature_name: &str,
    user_goal: &str,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<ResearchReport> {
    let fut = tokio::time::timeout(limit, researcher.research(feature_name, user_goal));

    tokio::select! {
        outcome = fut => match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!("Research timed out after {:?}", limit);
                Err(CadenceError::Research(format!("timed out after {}s", limit.as_secs())))
            }
        },
        _ = cancel.cancelled() => Err(CadenceError::Research("cancelled".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowResearcher(Duration);

    #[async_trait]
    impl Researcher for SlowResearcher {
        async fn research(&self, feature_name: &str, _user_goal: &str) -> Result<ResearchReport> {
            tokio::time::sleep(self.0).await;
            Ok(ResearchReport {
                summary: format!("Looked into {}", feature_name),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_into_context_caps_risks() {
        let report = ResearchReport {
            summary: "s".to_string(),
            risks: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            relevant_files: vec!["src/lib.rs".into()],
        };
        let context = report.into_context(3);
        assert_eq!(context.risks, vec!["a", "b", "c"]);
        assert_eq!(context.relevant_files, vec!["src/lib.rs"]);
    }

    #[tokio::test]
    async fn test_fast_research_completes() {
        let researcher = SlowResearcher(Duration::from_millis(1));
        let report = run_bounded(&researcher, "login", "goal", Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.summary, "Looked into login");
    }

    #[tokio::test]
    async fn test_slow_research_times_out() {
        let researcher = SlowResearcher(Duration::from_secs(600));
        let err = run_bounded(&researcher, "login", "goal", Duration::from_millis(20), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::Research(_)));
    }

    #[tokio::test]
    async fn test_cancelled_research_returns_early() {
        let researcher = SlowResearcher(Duration::from_secs(600));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_bounded(&researcher, "login", "goal", Duration::from_secs(120), &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
