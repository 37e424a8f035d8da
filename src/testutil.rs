//! Shared test helpers for asset-store unit tests.

use std::sync::Arc;

use crate::blob_store::BlobStore;
use crate::config::{BlobStoreConfig, Config, Environment, StorageConfig, DEFAULT_MAX_UPLOAD_SIZE};
use crate::storage::Database;
use crate::AppState;

/// An `AppState` rooted in a temporary directory, plus a handle on its
/// embedded blob database.
pub struct TestState {
    pub app: Arc<AppState>,
    pub db: Database,
}

/// Build a test config whose roots all live under `temp_dir`.
pub fn test_config(temp_dir: &tempfile::TempDir, environment: Environment) -> Config {
    let root = temp_dir.path();
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        environment,
        storage: StorageConfig {
            static_root: root.join("public").to_string_lossy().to_string(),
            ephemeral_root: root.join("tmp").to_string_lossy().to_string(),
            uploads_dir: "uploads".to_string(),
            mapping_file: root
                .join("public/image-mapping.json")
                .to_string_lossy()
                .to_string(),
        },
        blob_store: BlobStoreConfig::default(),
        max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
    }
}

/// Create a local-dev test state with an embedded blob store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> TestState {
    test_state_in(temp_dir, Environment::LocalDev)
}

pub fn test_state_in(temp_dir: &tempfile::TempDir, environment: Environment) -> TestState {
    let config = test_config(temp_dir, environment);
    let db = Database::open(temp_dir.path().join("data")).expect("Failed to open test database");
    let blob_store: Arc<dyn BlobStore> = Arc::new(db.clone());

    TestState {
        app: Arc::new(AppState::with_blob_store(config, Some(blob_store))),
        db,
    }
}
