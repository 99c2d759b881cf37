//! Lossy progress notifications
//!
//! Updates are advisory: a full buffer or a missing consumer drops them
//! silently. Nothing may depend on their delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// One progress message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded, non-blocking progress channel with a single consumer
pub struct ProgressNotifier {
    tx: mpsc::Sender<ProgressUpdate>,
    rx: Mutex<Option<mpsc::Receiver<ProgressUpdate>>>,
}

impl ProgressNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Hand out the consumer end; `None` after the first call
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<ProgressUpdate>> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Best-effort send; never blocks, drops when full or closed
    pub fn notify(&self, message: impl Into<String>) {
        let _ = self.tx.try_send(ProgressUpdate::new(message));
    }
}

impl Default for ProgressNotifier {
    fn default() -> Self {
        Self::new(cadence_core::CadenceConfig::default().progress.capacity)
    }
}
