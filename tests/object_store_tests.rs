use asset_store::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use bytes::Bytes;

#[tokio::test]
async fn test_local_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let data = Bytes::from("hello world");
    store.put("product-1.png", data.clone()).await.unwrap();

    let retrieved = store.get("product-1.png").await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn test_local_store_creates_directory_on_put() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("public/uploads");
    let store = LocalStore::new(&base);
    assert!(!base.exists());

    store.put("product-1.png", Bytes::from("data")).await.unwrap();
    assert!(base.join("product-1.png").is_file());
}

#[tokio::test]
async fn test_local_store_get_does_not_create_directory() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("never-created");
    let store = LocalStore::new(&base);

    let result = store.get("product-1.png").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
    assert!(!base.exists());
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let result = store.get("missing.png").await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), ObjectStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_local_store_directory_under_key_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("product-1.png")).unwrap();
    let store = LocalStore::new(dir.path());

    let result = store.get("product-1.png").await;
    assert!(matches!(result, Err(ObjectStoreError::Io(_))));
}

#[test]
fn test_object_path_is_inside_base() {
    let store = LocalStore::new("/srv/public/uploads");
    let key = asset_store::asset::AssetKey::parse("../../etc/passwd").unwrap();
    let path = store.object_path(key.as_str());
    assert_eq!(path, std::path::Path::new("/srv/public/uploads/etcpasswd"));
}
