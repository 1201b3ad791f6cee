//! Persistence of finished dispatches.
//!
//! The orchestrator hands every finished dispatch to a [`PersistenceSink`]
//! on a spawned task and never waits for it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dk_protocol::DispatchResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Errors a sink can report. They are logged, never returned to callers
/// of `route_and_dispatch`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write dispatch record to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize dispatch record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write-only store for finished dispatches.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn record(&self, message: &str, result: &DispatchResult) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct Record<'a> {
    recorded_at: DateTime<Utc>,
    message: &'a str,
    result: &'a DispatchResult,
}

/// Appends one JSON object per dispatch to a file.
pub struct JsonlSink {
    path: PathBuf,
    /// Keeps concurrent records from interleaving.
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn record(&self, message: &str, result: &DispatchResult) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&Record {
            recorded_at: Utc::now(),
            message,
            result,
        })?;
        line.push('\n');

        let write_err = |source| SinkError::Write {
            path: self.path.clone(),
            source,
        };

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }
}
