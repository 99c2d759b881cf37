//! Execution tracking
//!
//! The tracker records task progress and the pauses raised while executing.
//! `ExecutionLog` keeps its state in memory and, when given a path, mirrors
//! every change to a pretty JSON file.

use async_trait::async_trait;
use cadence_core::{CadenceError, ExecutionPause, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::planning::PlanningArtifact;

/// Capability for recording execution pauses
#[async_trait]
pub trait ExecutionTracker: Send + Sync {
    async fn add_pause(&self, pause: ExecutionPause) -> Result<()>;

    /// Resolve every outstanding pause; fails when none is outstanding
    async fn resolve_pause(&self, label: &str, resolution: &str) -> Result<()>;

    /// Record a finished task; returns (completed, total)
    async fn complete_task(&self, task_id: &str) -> Result<(usize, usize)>;
}

/// Builds the tracker for a freshly started execution phase
#[async_trait]
pub trait TrackerFactory: Send + Sync {
    async fn create(&self, artifact: &PlanningArtifact) -> Result<Arc<dyn ExecutionTracker>>;
}

/// Serializable execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default)]
    pub plan_id: Option<String>,
    pub total_tasks: usize,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub pauses: Vec<ExecutionPause>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionState {
    pub fn new(total_tasks: usize) -> Self {
        let now = Utc::now();
        Self {
            plan_id: None,
            total_tasks,
            completed_tasks: Vec::new(),
            pauses: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn outstanding_pause(&self) -> Option<&ExecutionPause> {
        self.pauses.iter().rev().find(|p| !p.is_resolved())
    }

    pub fn is_complete(&self) -> bool {
        self.completed_tasks.len() >= self.total_tasks
    }
}

/// JSON-backed execution tracker
pub struct ExecutionLog {
    state: RwLock<ExecutionState>,
    path: Option<PathBuf>,
}

impl ExecutionLog {
    /// Create a tracker sized for `total_tasks`
    ///
    /// With a path the initial state is written immediately; a failed write
    /// fails creation.
    pub async fn create(total_tasks: usize, path: Option<PathBuf>) -> Result<Self> {
        Self::from_state(ExecutionState::new(total_tasks), path).await
    }

    /// Create a tracker for a planning artifact
    pub async fn for_plan(artifact: &PlanningArtifact, path: Option<PathBuf>) -> Result<Self> {
        let mut state = ExecutionState::new(artifact.task_count());
        state.plan_id = Some(artifact.id.clone());
        Self::from_state(state, path).await
    }

    async fn from_state(state: ExecutionState, path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = &path {
            write_state(path, &state).await?;
        }
        info!("Execution tracker initialized for {} task(s)", state.total_tasks);
        Ok(Self {
            state: RwLock::new(state),
            path,
        })
    }

    /// Reopen a persisted tracker
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CadenceError::Tracker(format!("Failed to read execution log: {}", e)))?;
        let state: ExecutionState = serde_json::from_str(&content)
            .map_err(|e| CadenceError::Tracker(format!("Failed to parse execution log: {}", e)))?;
        Ok(Self {
            state: RwLock::new(state),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> ExecutionState {
        self.state.read().await.clone()
    }

    async fn persist(&self, state: &ExecutionState) -> Result<()> {
        match &self.path {
            Some(path) => write_state(path, state).await,
            None => Ok(()),
        }
    }
}

async fn write_state(path: &Path, state: &ExecutionState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CadenceError::Tracker(format!("Failed to create {}: {}", parent.display(), e)))?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| CadenceError::Tracker(format!("Failed to write execution log: {}", e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CadenceError::Tracker(format!("Failed to replace execution log: {}", e)))?;

    debug!("Saved execution log to {:?}", path);
    Ok(())
}

#[async_trait]
impl ExecutionTracker for ExecutionLog {
    async fn add_pause(&self, pause: ExecutionPause) -> Result<()> {
        let mut state = self.state.write().await;
        state.pauses.push(pause);
        state.updated_at = Utc::now();
        self.persist(&state).await
    }

    async fn resolve_pause(&self, label: &str, resolution: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut resolved = 0;
        for pause in state.pauses.iter_mut().filter(|p| !p.is_resolved()) {
            pause.resolved_at = Some(now);
            pause.resolution_label = Some(label.to_string());
            pause.resolution = Some(resolution.to_string());
            resolved += 1;
        }
        if resolved == 0 {
            return Err(CadenceError::Tracker("No outstanding pause to resolve".to_string()));
        }

        state.updated_at = now;
        self.persist(&state).await
    }

    async fn complete_task(&self, task_id: &str) -> Result<(usize, usize)> {
        let mut state = self.state.write().await;
        if !state.completed_tasks.iter().any(|t| t == task_id) {
            state.completed_tasks.push(task_id.to_string());
        }
        state.updated_at = Utc::now();
        self.persist(&state).await?;
        Ok((state.completed_tasks.len(), state.total_tasks))
    }
}

/// Factory producing `ExecutionLog`s, persisted under `dir` when set
#[derive(Debug, Clone, Default)]
pub struct ExecutionLogFactory {
    dir: Option<PathBuf>,
}

impl ExecutionLogFactory {
    pub fn in_memory() -> Self {
        Self { dir: None }
    }

    pub fn persisted(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    /// File an artifact's execution log is written to
    pub fn log_path(&self, artifact: &PlanningArtifact) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("execution-{}.json", artifact.id)))
    }
}

#[async_trait]
impl TrackerFactory for ExecutionLogFactory {
    async fn create(&self, artifact: &PlanningArtifact) -> Result<Arc<dyn ExecutionTracker>> {
        let log = ExecutionLog::for_plan(artifact, self.log_path(artifact)).await?;
        Ok(Arc::new(log))
    }
}
