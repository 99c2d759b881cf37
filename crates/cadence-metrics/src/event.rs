//! Telemetry event shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Types of telemetry events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventKind {
    PlanCreated,
    PlanUpdated,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    BuilderStarted,
    BuilderFinished,
    ResearchStarted,
    ResearchCompleted,
    ResearchFailed,
    PhaseStarted,
    WorkflowPaused,
    WorkflowResumed,
}

impl TelemetryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanCreated => "plan_created",
            Self::PlanUpdated => "plan_updated",
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::BuilderStarted => "builder_started",
            Self::BuilderFinished => "builder_finished",
            Self::ResearchStarted => "research_started",
            Self::ResearchCompleted => "research_completed",
            Self::ResearchFailed => "research_failed",
            Self::PhaseStarted => "phase_started",
            Self::WorkflowPaused => "workflow_paused",
            Self::WorkflowResumed => "workflow_resumed",
        }
    }
}

impl std::fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band notification forwarded to a telemetry sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub kind: TelemetryEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Open key/value payload
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryEventKind) -> Self {
        Self {
            kind,
            session_id: None,
            plan_id: None,
            task_id: None,
            payload: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Insert a payload entry, replacing any previous value for `key`
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Merge a JSON object into the payload; non-object values land under "data"
    pub fn with_payload(mut self, payload: Value) -> Self {
        match payload {
            Value::Object(map) => self.payload.extend(map),
            Value::Null => {}
            other => {
                self.payload.insert("data".to_string(), other);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_sets_identifiers() {
        let event = TelemetryEvent::new(TelemetryEventKind::TaskStarted)
            .with_session("s-1")
            .with_plan("p-1")
            .with_task("t-1")
            .with_field("attempt", 2);

        assert_eq!(event.session_id.as_deref(), Some("s-1"));
        assert_eq!(event.plan_id.as_deref(), Some("p-1"));
        assert_eq!(event.task_id.as_deref(), Some("t-1"));
        assert_eq!(event.payload["attempt"], json!(2));
    }

    #[test]
    fn test_payload_merge() {
        let event = TelemetryEvent::new(TelemetryEventKind::BuilderFinished)
            .with_payload(json!({"status": "ok", "files": 3}))
            .with_payload(json!("raw"))
            .with_payload(Value::Null);

        assert_eq!(event.payload["status"], json!("ok"));
        assert_eq!(event.payload["files"], json!(3));
        assert_eq!(event.payload["data"], json!("raw"));
    }

    #[test]
    fn test_serialized_shape() {
        let event = TelemetryEvent::new(TelemetryEventKind::WorkflowPaused).with_session("s-9");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], json!("workflow_paused"));
        assert_eq!(value["session_id"], json!("s-9"));
        assert!(value.get("plan_id").is_none());
    }
}
