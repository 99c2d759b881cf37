//! Telemetry sink capability and the in-process hub

use async_trait::async_trait;
use cadence_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::event::{TelemetryEvent, TelemetryEventKind};

/// Events kept by a hub before the oldest are evicted
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Destination for telemetry events
///
/// Publishing is best-effort from the caller's side: the orchestrator logs
/// and swallows any error returned here.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish(&self, event: TelemetryEvent) -> Result<()>;
}

/// In-process sink with bounded history and per-kind counts
pub struct TelemetryHub {
    history: Arc<RwLock<VecDeque<TelemetryEvent>>>,
    counts: Arc<RwLock<HashMap<TelemetryEventKind, u64>>>,
    history_limit: usize,
    total_events: AtomicU64,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            history: Arc::new(RwLock::new(VecDeque::new())),
            counts: Arc::new(RwLock::new(HashMap::new())),
            history_limit,
            total_events: AtomicU64::new(0),
        }
    }

    /// Retained events, oldest first
    pub async fn events(&self) -> Vec<TelemetryEvent> {
        self.history.read().await.iter().cloned().collect()
    }

    pub async fn events_of(&self, kind: TelemetryEventKind) -> Vec<TelemetryEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Events ever published with `kind`, including evicted ones
    pub async fn count(&self, kind: TelemetryEventKind) -> u64 {
        self.counts.read().await.get(&kind).copied().unwrap_or(0)
    }

    pub async fn summary(&self) -> HubSummary {
        HubSummary {
            total_events: self.total_events.load(Ordering::Relaxed),
            retained_events: self.history.read().await.len(),
            by_kind: self
                .counts
                .read()
                .await
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
        }
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySink for TelemetryHub {
    async fn publish(&self, event: TelemetryEvent) -> Result<()> {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        *self.counts.write().await.entry(event.kind).or_insert(0) += 1;

        debug!(kind = %event.kind, "Telemetry event");

        let mut history = self.history.write().await;
        history.push_back(event);
        while history.len() > self.history_limit {
            history.pop_front();
        }
        Ok(())
    }
}

/// Hub totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSummary {
    pub total_events: u64,
    pub retained_events: usize,
    pub by_kind: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_records_events_in_order() {
        let hub = TelemetryHub::new();
        hub.publish(TelemetryEvent::new(TelemetryEventKind::PlanCreated).with_plan("p-1"))
            .await
            .unwrap();
        hub.publish(TelemetryEvent::new(TelemetryEventKind::TaskStarted).with_task("t-1"))
            .await
            .unwrap();

        let events = hub.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, TelemetryEventKind::PlanCreated);
        assert_eq!(events[1].task_id.as_deref(), Some("t-1"));
        assert_eq!(hub.events_of(TelemetryEventKind::TaskStarted).await.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded_but_counts_are_not() {
        let hub = TelemetryHub::with_history_limit(2);
        for _ in 0..5 {
            hub.publish(TelemetryEvent::new(TelemetryEventKind::BuilderStarted))
                .await
                .unwrap();
        }

        assert_eq!(hub.events().await.len(), 2);
        assert_eq!(hub.count(TelemetryEventKind::BuilderStarted).await, 5);
        assert_eq!(hub.count(TelemetryEventKind::BuilderFinished).await, 0);

        let summary = hub.summary().await;
        assert_eq!(summary.total_events, 5);
        assert_eq!(summary.retained_events, 2);
        assert_eq!(summary.by_kind["builder_started"], 5);
    }
}
