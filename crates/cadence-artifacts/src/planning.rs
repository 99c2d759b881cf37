//! Planning artifact data structures

use cadence_core::{CadenceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Findings copied from the research step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub relevant_files: Vec<String>,
}

/// A unit of work planned for execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Planning-phase record for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningArtifact {
    pub id: String,
    pub feature_name: String,
    pub user_goal: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchContext>,
}

impl PlanningArtifact {
    /// Create an empty artifact shell for a feature
    pub fn new(feature_name: impl Into<String>, user_goal: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            feature_name: feature_name.into(),
            user_goal: user_goal.into(),
            created_at: Utc::now(),
            tasks: Vec::new(),
            research: None,
        }
    }

    /// Append a task; ids are assigned in order as "task-1", "task-2", ...
    pub fn add_task(&mut self, title: impl Into<String>, description: impl Into<String>) -> &PlannedTask {
        let id = format!("task-{}", self.tasks.len() + 1);
        self.tasks.push(PlannedTask {
            id,
            title: title.into(),
            description: description.into(),
        });
        &self.tasks[self.tasks.len() - 1]
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn has_research(&self) -> bool {
        self.research.is_some()
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CadenceError::Other(format!("Failed to read planning artifact {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}
