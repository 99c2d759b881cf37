//! Append-only JSONL telemetry storage

use async_trait::async_trait;
use cadence_core::{CadenceError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::event::TelemetryEvent;
use crate::hub::TelemetrySink;

/// Sink appending each event as one JSON line
pub struct JsonlTelemetrySink {
    path: PathBuf,
    // Serializes appends so concurrent publishers never interleave lines
    write_lock: Mutex<()>,
}

impl JsonlTelemetrySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every event back; unparseable lines are skipped
    pub async fn load_all(&self) -> Result<Vec<TelemetryEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut events = Vec::new();

        for line in content.lines() {
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<TelemetryEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    debug!("Failed to parse telemetry line: {}", e);
                }
            }
        }

        Ok(events)
    }
}

#[async_trait]
impl TelemetrySink for JsonlTelemetrySink {
    async fn publish(&self, event: TelemetryEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                CadenceError::Telemetry(format!("Cannot open {}: {}", self.path.display(), e))
            })?;

        file.write_all(line.as_bytes()).await?;

        debug!(kind = %event.kind, "Stored telemetry event to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TelemetryEventKind;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let sink = JsonlTelemetrySink::new(dir.path().join("telemetry/events.jsonl"));

        sink.publish(TelemetryEvent::new(TelemetryEventKind::ResearchStarted).with_plan("p-1"))
            .await
            .unwrap();
        sink.publish(TelemetryEvent::new(TelemetryEventKind::ResearchCompleted).with_field("risks", 2))
            .await
            .unwrap();

        let events = sink.load_all().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].plan_id.as_deref(), Some("p-1"));
        assert_eq!(events[1].payload["risks"], 2);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonlTelemetrySink::new(&path);

        sink.publish(TelemetryEvent::new(TelemetryEventKind::PhaseStarted))
            .await
            .unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"not json\n"))
            .unwrap();

        assert_eq!(sink.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let sink = JsonlTelemetrySink::new("/nonexistent/events.jsonl");
        assert!(sink.load_all().await.unwrap().is_empty());
    }
}
