//! Append-only JSON array stores.
//!
//! Each store is one file holding a JSON array, newest entry first, capped
//! at a fixed length. Writes go through a temp file and a rename so a
//! reader never sees a half-written array.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{MAX_LOG_ENTRIES, PRIMARY_LOG_FILE, RECEIVED_LOG_FILE, VISITS_LOG_FILE};
use crate::errors::{RelayError, RelayResult};

/// File metadata reported by the debug endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStat {
    pub size: u64,
    pub mtime: Option<String>,
}

/// One JSON array file.
///
/// Appends through one instance are serialized. Every write uses its own
/// temp file, so separate instances on the same path never share one;
/// there is no locking across instances or processes.
pub struct LogStore {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, MAX_LOG_ENTRIES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents, `None` when the file does not exist.
    pub async fn read_raw(&self) -> RelayResult<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RelayError::StorageError(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Parsed file contents as any JSON value, `None` when missing.
    /// An empty file reads as an empty array.
    pub async fn read_value(&self) -> RelayResult<Option<Value>> {
        match self.read_raw().await? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(Some(Value::Array(Vec::new()))),
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        }
    }

    /// Existing entries. A missing, unreadable or malformed store reads as empty.
    pub async fn read_entries_lenient(&self) -> Vec<Value> {
        match self.read_value().await {
            Ok(Some(Value::Array(entries))) => entries,
            Ok(None) => Vec::new(),
            Ok(Some(_)) => {
                log::warn!("{} does not hold a JSON array, starting over", self.path.display());
                Vec::new()
            }
            Err(e) => {
                log::warn!("{}, starting over", e);
                Vec::new()
            }
        }
    }

    /// Prepends `entry` and writes the store back, keeping the newest
    /// `capacity` entries.
    pub async fn append(&self, entry: Value) -> RelayResult<()> {
        let _guard = self.write_lock.lock().await;

        let existing = self.read_entries_lenient().await;
        let updated = prepend_capped(existing, entry, self.capacity);
        let content = serde_json::to_vec_pretty(&updated)?;
        self.write_atomic(&content).await
    }

    async fn write_atomic(&self, content: &[u8]) -> RelayResult<()> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self
            .path
            .with_file_name(format!(".{}.tmp.{}", file_name, Uuid::new_v4().simple()));

        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(RelayError::StorageError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Size and modification time, `None` when the file does not exist.
    pub async fn stat(&self) -> Option<StoreStat> {
        let meta = fs::metadata(&self.path).await.ok()?;
        let mtime = meta.modified().ok().map(|t| {
            DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true)
        });
        Some(StoreStat { size: meta.len(), mtime })
    }
}

/// Puts `entry` in front of `existing` and drops everything past `capacity`.
pub fn prepend_capped(existing: Vec<Value>, entry: Value, capacity: usize) -> Vec<Value> {
    let mut updated = Vec::with_capacity(existing.len().min(capacity) + 1);
    updated.push(entry);
    updated.extend(existing);
    updated.truncate(capacity);
    updated
}

/// The stores the relay knows about.
#[derive(Clone)]
pub struct StoreSet {
    /// Written by the generation endpoint (`logs.json`)
    pub primary: Arc<LogStore>,
    /// Written by the log receiver (`received.json`)
    pub received: Arc<LogStore>,
    /// Inspected only (`visits.json`)
    pub visits: Arc<LogStore>,
}

impl StoreSet {
    pub fn from_config(config: &Config) -> Self {
        Self {
            primary: Arc::new(LogStore::new(config.log_path(PRIMARY_LOG_FILE))),
            received: Arc::new(LogStore::new(config.log_path(RECEIVED_LOG_FILE))),
            visits: Arc::new(LogStore::new(config.log_path(VISITS_LOG_FILE))),
        }
    }

    /// Stores in the order the debug endpoint reports them.
    pub fn named(&self) -> [(&'static str, &Arc<LogStore>); 3] {
        [
            ("received", &self.received),
            ("visits", &self.visits),
            ("legacy", &self.primary),
        ]
    }
}
