//! Snapshot writers and descriptors
//!
//! A snapshot is the derived state of a channel at a position: replaying the
//! channel from that position on top of the snapshot contents reproduces the
//! channel's current state. Writes are atomic from the engine's point of
//! view: a reader sees either the previous snapshot or the new one, never a
//! partial document.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use skein_core::ChannelPosition;

/// Errors raised while writing or reading snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(String),

    #[error("snapshot serialization error: {0}")]
    Serialization(String),

    #[error("no snapshot for channel: {0}")]
    NotFound(String),
}

/// Identifies a written snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    /// Channel the snapshot covers
    pub channel_name: String,
    /// High-water mark the replay reached, where one was reported
    pub position: Option<ChannelPosition>,
    /// Number of state entries in the snapshot
    pub entry_count: usize,
    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
    /// Writer-defined locator (file path, object key, memory id)
    pub location: String,
}

/// A complete snapshot document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub channel_name: String,
    pub position: Option<ChannelPosition>,
    pub entries: Vec<(String, Bytes)>,
    pub created_at: DateTime<Utc>,
}

/// Writes point-in-time snapshots of derived channel state
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Persist `(position, entries)` for a channel and describe the result
    async fn write(
        &self,
        channel_name: &str,
        position: Option<ChannelPosition>,
        entries: Vec<(String, Bytes)>,
    ) -> Result<SnapshotDescriptor, SnapshotError>;
}

/// Keeps the latest snapshot per channel in memory
///
/// Suitable for tests and simulation; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemorySnapshotWriter {
    snapshots: DashMap<String, Snapshot>,
}

impl InMemorySnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot written for a channel
    pub fn latest(&self, channel_name: &str) -> Option<Snapshot> {
        self.snapshots.get(channel_name).map(|s| s.clone())
    }
}

#[async_trait]
impl SnapshotWriter for InMemorySnapshotWriter {
    async fn write(
        &self,
        channel_name: &str,
        position: Option<ChannelPosition>,
        entries: Vec<(String, Bytes)>,
    ) -> Result<SnapshotDescriptor, SnapshotError> {
        let snapshot = Snapshot {
            channel_name: channel_name.to_string(),
            position,
            entries,
            created_at: Utc::now(),
        };
        let descriptor = SnapshotDescriptor {
            channel_name: channel_name.to_string(),
            position: snapshot.position.clone(),
            entry_count: snapshot.entries.len(),
            created_at: snapshot.created_at,
            location: format!("memory:{channel_name}"),
        };
        self.snapshots.insert(channel_name.to_string(), snapshot);
        debug!(channel = %channel_name, "stored in-memory snapshot");
        Ok(descriptor)
    }
}

/// Configuration for file-backed snapshots
#[derive(Debug, Clone)]
pub struct FileSnapshotConfig {
    /// Directory snapshot documents are written into
    pub base_dir: PathBuf,
    /// Pretty-print the JSON documents
    pub pretty: bool,
}

impl Default for FileSnapshotConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/snapshots"),
            pretty: false,
        }
    }
}

/// Writes one JSON snapshot document per channel
///
/// The document is written to a temporary file and renamed into place, so a
/// concurrent reader sees either the previous document or the new one.
#[derive(Debug)]
pub struct FileSnapshotWriter {
    config: FileSnapshotConfig,
}

impl FileSnapshotWriter {
    pub fn new(config: FileSnapshotConfig) -> Self {
        Self { config }
    }

    fn snapshot_path(&self, channel_name: &str) -> PathBuf {
        self.config.base_dir.join(format!("{channel_name}.snapshot.json"))
    }

    /// Read back the latest snapshot document for a channel
    pub async fn read(&self, channel_name: &str) -> Result<Snapshot, SnapshotError> {
        let path = self.snapshot_path(channel_name);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|_| SnapshotError::NotFound(channel_name.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl SnapshotWriter for FileSnapshotWriter {
    async fn write(
        &self,
        channel_name: &str,
        position: Option<ChannelPosition>,
        entries: Vec<(String, Bytes)>,
    ) -> Result<SnapshotDescriptor, SnapshotError> {
        tokio::fs::create_dir_all(&self.config.base_dir)
            .await
            .map_err(|e| SnapshotError::Io(e.to_string()))?;

        let snapshot = Snapshot {
            channel_name: channel_name.to_string(),
            position,
            entries,
            created_at: Utc::now(),
        };
        let data = if self.config.pretty {
            serde_json::to_vec_pretty(&snapshot)
        } else {
            serde_json::to_vec(&snapshot)
        }
        .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        let path = self.snapshot_path(channel_name);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data)
            .await
            .map_err(|e| SnapshotError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| SnapshotError::Io(e.to_string()))?;

        info!(channel = %channel_name, path = %path.display(), entries = snapshot.entries.len(),
            "wrote snapshot");

        Ok(SnapshotDescriptor {
            channel_name: channel_name.to_string(),
            position: snapshot.position.clone(),
            entry_count: snapshot.entries.len(),
            created_at: snapshot.created_at,
            location: path.display().to_string(),
        })
    }
}
