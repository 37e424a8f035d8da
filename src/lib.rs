//! asset-store - Tiered image asset storage and resolution
//!
//! Uploaded images are written to local disk and mirrored into slower but
//! more durable tiers, so they stay servable on hosts whose disk is wiped
//! between invocations:
//! - local disk, probed across environment-dependent candidate directories
//! - a single JSON mapping document holding base64 data URLs
//! - an optional durable blob store (embedded redb or a REST row endpoint)
//! - a deterministic SVG placeholder when every tier misses

pub mod api;
pub mod asset;
pub mod blob_store;
pub mod config;
pub mod ingest;
pub mod mapping;
pub mod object_store;
pub mod resolve;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use blob_store::{BlobStore, RestBlobStore};
use config::{BlobStoreBackend, Config};
use ingest::WriteCoordinator;
use mapping::MappingStore;
use object_store::LocalStore;
use resolve::Resolver;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub coordinator: WriteCoordinator,
    pub resolver: Resolver,
    pub mapping: Arc<MappingStore>,
}

impl AppState {
    /// Wire every tier from configuration. Candidate directories are fixed
    /// here, once, for the lifetime of the process.
    pub fn from_config(config: Config) -> Result<Self, anyhow::Error> {
        let blob_store: Option<Arc<dyn BlobStore>> = match config.blob_store.backend {
            BlobStoreBackend::Disabled => None,
            BlobStoreBackend::Embedded => {
                Some(Arc::new(Database::open(&config.blob_store.data_dir)?))
            }
            BlobStoreBackend::Rest => {
                let url = config.blob_store.url.as_deref().unwrap_or_default();
                let key = config.blob_store.api_key.as_deref().unwrap_or_default();
                Some(Arc::new(RestBlobStore::new(
                    url,
                    key,
                    &config.blob_store.table,
                )?))
            }
        };

        Ok(Self::with_blob_store(config, blob_store))
    }

    /// Wire the local tiers around an already-constructed blob store.
    pub fn with_blob_store(config: Config, blob_store: Option<Arc<dyn BlobStore>>) -> Self {
        let candidates: Vec<LocalStore> = config
            .candidate_dirs()
            .into_iter()
            .map(LocalStore::new)
            .collect();
        // Uploads land in the first candidate; every environment has one.
        let write_dir = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| LocalStore::new(config.storage.root(config::DiskRoot::Static)));

        let mapping = Arc::new(MappingStore::new(&config.storage.mapping_file));
        let mirror = blob_store
            .clone()
            .filter(|_| config.blob_store.mirror_writes);

        let coordinator = WriteCoordinator::new(
            write_dir,
            Arc::clone(&mapping),
            mirror,
            config.max_upload_size,
        );
        let resolver = Resolver::new(candidates, Arc::clone(&mapping), blob_store);

        Self {
            config,
            coordinator,
            resolver,
            mapping,
        }
    }
}
