//! Durable pause/resume
//!
//! The pause record lives behind a single `RwLock`. Writers only assign the
//! record inside the critical section; the session store, tracker and
//! telemetry are touched after the guard is dropped, so a crash between the
//! two can leave the durable record behind the in-memory one.
//!
//! Session-store writes go through a separate persistence gate. Whoever holds
//! the gate writes the record as it stands at that moment, so concurrent
//! pause and clear calls leave the store agreeing with memory.

use cadence_core::fail_open::fail_open;
use cadence_core::{CadenceError, ExecutionPause, PauseInfo};
use cadence_metrics::{counters, TelemetryEventKind};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::workflow::{WorkflowManager, DEFAULT_RESOLUTION, RESUME_LABEL};

/// Reason recorded when a pause is requested without one
const UNSPECIFIED_REASON: &str = "Paused";

/// Cloneable read-only view of a workflow's pause state
#[derive(Clone)]
pub struct PauseMonitor {
    state: Arc<RwLock<PauseInfo>>,
}

impl PauseMonitor {
    pub(crate) fn new(state: Arc<RwLock<PauseInfo>>) -> Self {
        Self { state }
    }

    pub async fn info(&self) -> PauseInfo {
        self.state.read().await.clone()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}

impl WorkflowManager {
    /// Block further automated action pending human input
    ///
    /// Returns the pause signal for the caller to propagate. Persisting to the
    /// session store and appending to the execution tracker are best-effort.
    pub async fn pause_workflow(&self, reason: &str, question: &str) -> CadenceError {
        let reason = if reason.trim().is_empty() {
            UNSPECIFIED_REASON
        } else {
            reason
        };
        let paused_at = Utc::now();

        *self.pause.write().await = PauseInfo::paused(reason, question, paused_at);

        counters::record_pause();
        info!(reason, question, "Workflow paused");

        self.persist_pause_state().await;

        if let Some(tracker) = &self.tracker {
            fail_open("tracker::add_pause", || {
                tracker.add_pause(ExecutionPause::new(reason, question, paused_at))
            })
            .await;
        }

        self.progress.notify(format!("Paused ({}): {}", reason, question));
        self.emit_plan_event(
            TelemetryEventKind::WorkflowPaused,
            json!({ "reason": reason, "question": question }),
        )
        .await;

        CadenceError::Paused {
            reason: reason.to_string(),
            question: question.to_string(),
        }
    }

    /// Reset the pause record and the durable session record
    pub async fn clear_pause(&self) {
        let was_paused = {
            let mut state = self.pause.write().await;
            let was_paused = state.paused;
            *state = PauseInfo::default();
            was_paused
        };

        self.persist_pause_state().await;

        if was_paused {
            debug!("Pause cleared");
            self.progress.notify("Pause cleared");
        }
    }

    /// Resolve the outstanding pause and clear it
    ///
    /// A blank `resolution` is recorded as [`DEFAULT_RESOLUTION`].
    pub async fn resume(&self, resolution: &str) {
        let resolution = match resolution.trim() {
            "" => DEFAULT_RESOLUTION,
            text => text,
        };

        if let Some(tracker) = &self.tracker {
            fail_open("tracker::resolve_pause", || {
                tracker.resolve_pause(RESUME_LABEL, resolution)
            })
            .await;
        }

        self.clear_pause().await;

        counters::record_resume();
        info!(resolution, "Workflow resumed");
        self.progress.notify(format!("Resumed: {}", resolution));
        self.emit_plan_event(
            TelemetryEventKind::WorkflowResumed,
            json!({ "resolution": resolution }),
        )
        .await;
    }

    /// Rehydrate pause state from the durable session record
    ///
    /// Read-only: no pause signal, telemetry or store write is produced.
    /// Returns whether a pause was restored.
    pub async fn restore_pause_state_from_session(&self) -> bool {
        let (Some(store), Some(session_id)) = (&self.session_store, &self.session_id) else {
            return false;
        };

        let session = fail_open("session_store::get_session", || store.get_session(session_id))
            .await
            .flatten();
        let Some(mut info) = session.and_then(|s| s.pause_info()) else {
            return false;
        };

        if info.reason.is_empty() {
            info.reason = UNSPECIFIED_REASON.to_string();
        }

        info!(session_id = %session_id, reason = %info.reason, "Restored pause state from session");
        *self.pause.write().await = info;
        true
    }

    /// Write the current pause record to the session store, best-effort
    async fn persist_pause_state(&self) {
        let (Some(store), Some(session_id)) = (&self.session_store, &self.session_id) else {
            return;
        };

        let _gate = self.persist_gate.lock().await;
        let info = self.pause.read().await.clone();
        fail_open("session_store::update_session_pause_state", || {
            store.update_session_pause_state(session_id, &info.reason, &info.question, info.paused_at)
        })
        .await;
    }

    /// Snapshot of (paused, reason, question, timestamp)
    pub async fn get_pause_info(&self) -> PauseInfo {
        self.pause.read().await.clone()
    }
}
