//! Persistence adapters for the event log.

use super::TrackingEvent;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only event log with a retention cap.
///
/// Implementations keep at most `max_events` entries, evicting the oldest
/// first when an append would exceed the cap.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: TrackingEvent) -> Result<(), AppError>;

    /// Events with `timestamp >= since`, in append order.
    async fn query_window(&self, since: DateTime<Utc>) -> Result<Vec<TrackingEvent>, AppError>;

    async fn count(&self) -> Result<usize, AppError>;
}

/// Drop the oldest entries until at most `max_events` remain.
pub(crate) fn enforce_cap(events: &mut Vec<TrackingEvent>, max_events: usize) {
    if events.len() > max_events {
        let excess = events.len() - max_events;
        events.drain(..excess);
    }
}

fn in_window(events: Vec<TrackingEvent>, since: DateTime<Utc>) -> Vec<TrackingEvent> {
    events
        .into_iter()
        .filter(|event| event.timestamp >= since)
        .collect()
}

// ==================== JSON File Store ====================

/// The whole log is one JSON array, rewritten on every append.
///
/// Appends are serialised through an async mutex and the new contents are
/// written to a sibling temp file and renamed over the log, so concurrent
/// requests in this process cannot lose each other's events and readers
/// never observe a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    max_events: usize,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, max_events: usize) -> Self {
        Self {
            path: path.into(),
            max_events,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full log. A missing or blank file is an empty log; a file
    /// that doesn't parse is a storage error rather than silently reset.
    pub async fn load(&self) -> Result<Vec<TrackingEvent>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read event log {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Storage(format!(
                "Event log {} is not a valid event array: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn persist(&self, events: &[TrackingEvent]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Storage(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let body = serde_json::to_vec_pretty(events)
            .map_err(|e| AppError::Storage(format!("Failed to serialize events: {}", e)))?;

        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, body).await.map_err(|e| {
            AppError::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "events.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn append(&self, event: TrackingEvent) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        let mut events = self.load().await?;
        events.push(event);
        let before = events.len();
        enforce_cap(&mut events, self.max_events);
        if events.len() < before {
            debug!("Event log at cap, evicted {} oldest", before - events.len());
        }

        self.persist(&events).await
    }

    async fn query_window(&self, since: DateTime<Utc>) -> Result<Vec<TrackingEvent>, AppError> {
        Ok(in_window(self.load().await?, since))
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.load().await?.len())
    }
}

// ==================== In-Memory Store ====================

pub struct MemoryStore {
    events: std::sync::Mutex<Vec<TrackingEvent>>,
    max_events: usize,
}

impl MemoryStore {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
            max_events,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<TrackingEvent>>, AppError> {
        self.events
            .lock()
            .map_err(|_| AppError::Storage("event store lock poisoned".to_string()))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: TrackingEvent) -> Result<(), AppError> {
        let mut events = self.lock()?;
        events.push(event);
        enforce_cap(&mut events, self.max_events);
        Ok(())
    }

    async fn query_window(&self, since: DateTime<Utc>) -> Result<Vec<TrackingEvent>, AppError> {
        Ok(in_window(self.lock()?.clone(), since))
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.len())
    }
}
