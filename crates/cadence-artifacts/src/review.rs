//! Review artifact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
}

/// Review-phase record referencing the planning and execution artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewArtifact {
    pub id: String,
    pub planning_path: String,
    pub execution_path: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub findings: Vec<String>,
}

impl ReviewArtifact {
    pub fn new(planning_path: impl Into<String>, execution_path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            planning_path: planning_path.into(),
            execution_path: execution_path.into(),
            created_at: Utc::now(),
            status: ReviewStatus::Pending,
            findings: Vec::new(),
        }
    }

    pub fn add_finding(&mut self, finding: impl Into<String>) {
        self.findings.push(finding.into());
    }

    pub fn approve(&mut self) {
        self.status = ReviewStatus::Approved;
    }

    pub fn request_changes(&mut self, finding: impl Into<String>) {
        self.add_finding(finding);
        self.status = ReviewStatus::ChangesRequested;
    }
}
