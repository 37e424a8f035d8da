use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{BlobStore, BlobStoreError};
use crate::storage::models::BlobRecord;

/// Blob store backed by a PostgREST-style row endpoint
/// (`<base>/rest/v1/<table>`), authenticated with a service key.
pub struct RestBlobStore {
    base_url: String,
    api_key: String,
    client: Client,
    table: String,
}

impl RestBlobStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, anyhow::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn get(&self, key: &str) -> Result<Option<BlobRecord>, BlobStoreError> {
        let filter = format!("eq.{key}");
        let resp = self
            .request(self.client.get(self.table_url()))
            .query(&[("select", "*"), ("key", filter.as_str()), ("limit", "1")])
            .send()
            .await
            .map_err(|e| BlobStoreError::Transient(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::Transient(format!(
                "lookup failed ({status}): {body}"
            )));
        }

        let mut rows: Vec<BlobRecord> = resp
            .json()
            .await
            .map_err(|e| BlobStoreError::Transient(e.to_string()))?;

        Ok(rows.pop())
    }

    async fn insert(&self, record: &BlobRecord) -> Result<(), BlobStoreError> {
        let resp = self
            .request(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| BlobStoreError::Transient(e.to_string()))?;

        // Unique violation on `key`
        if resp.status() == StatusCode::CONFLICT {
            return Err(BlobStoreError::Duplicate(record.key.clone()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::Transient(format!(
                "insert failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::Utc;
    use std::collections::HashMap;

    const API_KEY: &str = "secret";

    fn record(key: &str) -> BlobRecord {
        BlobRecord {
            key: key.to_string(),
            data: "data:image/png;base64,AAEC".to_string(),
            mime_type: "image/png".to_string(),
            size: 3,
            related_product_id: None,
            created_at: Utc::now(),
        }
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("apikey").is_some_and(|v| v == API_KEY)
            && headers
                .get("authorization")
                .is_some_and(|v| v == format!("Bearer {API_KEY}").as_str())
    }

    // Row endpoint stand-in. Table `broken` always fails; `product-1.png`
    // already exists.
    async fn lookup(
        Path(table): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if table == "broken" {
            return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        if params.get("select").map(String::as_str) != Some("*")
            || params.get("limit").map(String::as_str) != Some("1")
        {
            return StatusCode::BAD_REQUEST.into_response();
        }

        match params.get("key").map(String::as_str) {
            Some("eq.product-1.png") => Json(vec![record("product-1.png")]).into_response(),
            Some("eq.odd key&x.png") => Json(vec![record("odd key&x.png")]).into_response(),
            _ => Json(Vec::<BlobRecord>::new()).into_response(),
        }
    }

    async fn insert(
        Path(table): Path<String>,
        headers: HeaderMap,
        Json(row): Json<BlobRecord>,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        match table.as_str() {
            "broken" => StatusCode::INTERNAL_SERVER_ERROR,
            _ if row.key == "product-1.png" => StatusCode::CONFLICT,
            _ => StatusCode::CREATED,
        }
    }

    async fn spawn_stub() -> String {
        let app = Router::new().route("/rest/v1/:table", get(lookup).post(insert));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_get_hit() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "asset_blobs").unwrap();

        let found = store.get("product-1.png").await.unwrap().unwrap();
        assert_eq!(found.key, "product-1.png");
        assert_eq!(found.decode().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_get_encodes_filter_value() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "asset_blobs").unwrap();

        let found = store.get("odd key&x.png").await.unwrap();
        assert_eq!(found.map(|r| r.key).as_deref(), Some("odd key&x.png"));
    }

    #[tokio::test]
    async fn test_get_empty_rows_is_miss() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "asset_blobs").unwrap();

        assert!(store.get("product-2.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_server_error_is_transient() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "broken").unwrap();

        assert!(matches!(
            store.get("product-1.png").await,
            Err(BlobStoreError::Transient(msg)) if msg.contains("500")
        ));
    }

    #[tokio::test]
    async fn test_insert() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "asset_blobs").unwrap();

        store.insert(&record("product-2.png")).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_conflict_is_duplicate() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "asset_blobs").unwrap();

        assert!(matches!(
            store.insert(&record("product-1.png")).await,
            Err(BlobStoreError::Duplicate(key)) if key == "product-1.png"
        ));
    }

    #[tokio::test]
    async fn test_insert_server_error_is_transient() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, API_KEY, "broken").unwrap();

        assert!(matches!(
            store.insert(&record("product-2.png")).await,
            Err(BlobStoreError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_transient() {
        let base = spawn_stub().await;
        let store = RestBlobStore::new(&base, "wrong", "asset_blobs").unwrap();

        assert!(matches!(
            store.get("product-1.png").await,
            Err(BlobStoreError::Transient(_))
        ));
    }
}
