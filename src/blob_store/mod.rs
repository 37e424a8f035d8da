mod rest;

pub use rest::RestBlobStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::models::BlobRecord;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// A record for the key already exists. Not a failure for ingest.
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Blob store unavailable: {0}")]
    Transient(String),
}

/// The most durable asset tier: one record per key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<BlobRecord>, BlobStoreError>;
    async fn insert(&self, record: &BlobRecord) -> Result<(), BlobStoreError>;
}

impl From<DatabaseError> for BlobStoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Duplicate(key) => BlobStoreError::Duplicate(key),
            other => BlobStoreError::Transient(other.to_string()),
        }
    }
}

#[async_trait]
impl BlobStore for Database {
    async fn get(&self, key: &str) -> Result<Option<BlobRecord>, BlobStoreError> {
        Ok(self.get_blob(key)?)
    }

    async fn insert(&self, record: &BlobRecord) -> Result<(), BlobStoreError> {
        Ok(self.insert_blob(record)?)
    }
}
