//! File-backed key -> data-URL index used when local disk has been wiped.
//!
//! The whole mapping lives in one JSON object document. Reads tolerate a
//! missing or corrupt document; writes are serialized in-process and land
//! via temp-file + rename so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One asset inside the mapping document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub key: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// An entry for the key already existed and was kept (first write wins).
    Existing,
}

pub struct MappingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MappingStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `key`. Missing documents, unparsable documents and malformed
    /// entries all read as "not found".
    pub async fn get(&self, key: &str) -> Option<MappingEntry> {
        let mut document = self.load().await;
        let value = document.remove(key)?;
        match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed mapping entry");
                None
            }
        }
    }

    /// Add `entry` unless its key is already present.
    pub async fn upsert(&self, entry: &MappingEntry) -> Result<UpsertOutcome, MappingError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.load().await;
        // A malformed entry under the same key does not count as a prior write.
        let existing = document
            .get(&entry.key)
            .is_some_and(|v| MappingEntry::deserialize(v).is_ok());
        if existing {
            return Ok(UpsertOutcome::Existing);
        }
        document.insert(entry.key.clone(), serde_json::to_value(entry)?);

        self.store(&document).await?;
        Ok(UpsertOutcome::Inserted)
    }

    async fn load(&self) -> Map<String, Value> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Mapping document unreadable");
                return Map::new();
            }
        };

        match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Mapping document is not a JSON object");
                Map::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Mapping document is corrupt");
                Map::new()
            }
        }
    }

    async fn store(&self, document: &Map<String, Value>) -> Result<(), MappingError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
