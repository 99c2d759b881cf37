//! Durable session storage
//!
//! Sessions survive process restarts so an outstanding pause can be
//! rehydrated when a driver re-attaches.

use async_trait::async_trait;
use cadence_core::{CadenceError, Result, SessionSnapshot};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Capability for persisting session pause state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a pause (`Some` timestamp) or clear it (`None`)
    ///
    /// Creates the session record when it does not exist yet.
    async fn update_session_pause_state(
        &self,
        session_id: &str,
        reason: &str,
        question: &str,
        paused_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionSnapshot>>;
}

/// Session store kept in process memory
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SessionSnapshot) {
        self.sessions.write().await.insert(session.id.clone(), session);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn update_session_pause_state(
        &self,
        session_id: &str,
        reason: &str,
        question: &str,
        paused_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionSnapshot::new(session_id))
            .apply_pause(reason, question, paused_at);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }
}

/// One pretty JSON document per session: `<dir>/<session-id>.json`
pub struct FileSessionStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a session's record; ids containing path separators are rejected
    pub fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id == "."
            || session_id == ".."
        {
            return Err(CadenceError::Store(format!("Invalid session id: {:?}", session_id)));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }

    async fn read(&self, path: &Path) -> Result<Option<SessionSnapshot>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                CadenceError::Store(format!("Failed to parse session {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CadenceError::Store(format!(
                "Failed to read session {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, path: &Path, session: &SessionSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CadenceError::Store(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        // Write to temp file, then rename over the last good record
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CadenceError::Store(format!("Failed to write session {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| CadenceError::Store(format!("Failed to replace session {}: {}", path.display(), e)))?;

        debug!("Saved session to {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn update_session_pause_state(
        &self,
        session_id: &str,
        reason: &str,
        question: &str,
        paused_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = self.session_path(session_id)?;
        let _guard = self.write_lock.lock().await;

        let mut session = self
            .read(&path)
            .await?
            .unwrap_or_else(|| SessionSnapshot::new(session_id));
        session.apply_pause(reason, question, paused_at);
        self.write(&path, &session).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.session_path(session_id)?;
        self.read(&path).await
    }
}
