use asset_store::asset::encoding::encode_data_url;
use asset_store::blob_store::{BlobStore, BlobStoreError};
use asset_store::storage::models::BlobRecord;
use asset_store::storage::{Database, DatabaseError};
use chrono::Utc;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_record(key: &str, bytes: &[u8]) -> BlobRecord {
    BlobRecord {
        key: key.to_string(),
        data: encode_data_url("image/png", bytes),
        mime_type: "image/png".to_string(),
        size: bytes.len() as u64,
        related_product_id: Some("prod-1".to_string()),
        created_at: Utc::now(),
    }
}

#[test]
fn test_insert_and_get_blob() {
    let (_dir, db) = test_db();
    let record = sample_record("product-1.png", b"pixels");

    db.insert_blob(&record).unwrap();

    let retrieved = db.get_blob("product-1.png").unwrap().expect("blob should exist");
    assert_eq!(retrieved, record);
    assert_eq!(retrieved.decode().unwrap(), b"pixels");
}

#[test]
fn test_get_blob_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_blob("nonexistent.png").unwrap().is_none());
}

#[test]
fn test_duplicate_insert_keeps_first_record() {
    let (_dir, db) = test_db();
    db.insert_blob(&sample_record("product-1.png", b"first")).unwrap();

    let err = db
        .insert_blob(&sample_record("product-1.png", b"second"))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Duplicate(ref key) if key == "product-1.png"));

    let stored = db.get_blob("product-1.png").unwrap().unwrap();
    assert_eq!(stored.decode().unwrap(), b"first");
    assert_eq!(db.count_blobs().unwrap(), 1);
}

#[test]
fn test_reopen_preserves_blobs() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open(dir.path().join("data")).unwrap();
        db.insert_blob(&sample_record("product-1.png", b"durable")).unwrap();
    }

    let db = Database::open(dir.path().join("data")).unwrap();
    let stored = db.get_blob("product-1.png").unwrap().unwrap();
    assert_eq!(stored.decode().unwrap(), b"durable");
}

#[tokio::test]
async fn test_trait_maps_duplicate() {
    let (_dir, db) = test_db();
    let store: &dyn BlobStore = &db;

    store.insert(&sample_record("product-1.png", b"a")).await.unwrap();
    let err = store
        .insert(&sample_record("product-1.png", b"b"))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobStoreError::Duplicate(_)));

    assert!(store.get("product-1.png").await.unwrap().is_some());
    assert!(store.get("product-2.png").await.unwrap().is_none());
}
