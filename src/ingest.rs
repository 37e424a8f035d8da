//! Upload path: validate, write to local disk, mirror into the text tiers.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;

use crate::asset::encoding::encode_data_url;
use crate::asset::key::IMAGE_EXTENSIONS;
use crate::asset::AssetKey;
use crate::blob_store::{BlobStore, BlobStoreError};
use crate::mapping::{MappingEntry, MappingStore, UpsertOutcome};
use crate::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use crate::storage::models::BlobRecord;

/// Accepted upload content types and the extension minted for each.
pub const ACCEPTED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported content type {0:?}; expected JPEG, PNG, GIF or WebP")]
    InvalidContentType(String),
    /// `size` is the number of bytes seen before the upload was rejected.
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("Failed to store file: {0}")]
    WriteFailed(#[from] ObjectStoreError),
}

/// An upload as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
    pub related_product_id: Option<String>,
}

/// Result of one mirror write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Ok,
    Skipped,
    Failed(String),
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkOutcome::Ok => f.write_str("ok"),
            SinkOutcome::Skipped => f.write_str("skipped"),
            SinkOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-tier outcome of the fan-out. The disk write is implied: a report is
/// only produced once it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub mapping: SinkOutcome,
    pub blob_store: SinkOutcome,
}

#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub key: AssetKey,
    /// Indirection token handed to callers: `/asset/<key>`
    pub url: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    pub report: FanOutReport,
}

/// Mints `product-<epoch millis>.<ext>` keys, strictly increasing within the
/// process so two uploads in the same millisecond never share a key.
#[derive(Debug, Default)]
pub struct KeyMinter {
    last: AtomicI64,
}

impl KeyMinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, extension: &str) -> AssetKey {
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        let stamp = loop {
            let next = now.max(current + 1);
            match self
                .last
                .compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => break next,
                Err(actual) => current = actual,
            }
        };

        AssetKey::from_normalized(format!("product-{stamp}.{extension}"))
    }
}

pub struct WriteCoordinator {
    disk: LocalStore,
    mapping: Arc<MappingStore>,
    blob_store: Option<Arc<dyn BlobStore>>,
    max_upload_size: u64,
    minter: KeyMinter,
}

impl WriteCoordinator {
    /// `blob_store` is `None` when the durable tier is disabled or not
    /// mirrored on ingest.
    pub fn new(
        disk: LocalStore,
        mapping: Arc<MappingStore>,
        blob_store: Option<Arc<dyn BlobStore>>,
        max_upload_size: u64,
    ) -> Self {
        Self {
            disk,
            mapping,
            blob_store,
            max_upload_size,
            minter: KeyMinter::new(),
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    pub async fn ingest(&self, upload: Upload) -> Result<IngestReceipt, IngestError> {
        let mime_type =
            resolve_content_type(upload.content_type.as_deref(), upload.original_name.as_deref())?;

        let size = upload.data.len() as u64;
        if size > self.max_upload_size {
            return Err(IngestError::PayloadTooLarge {
                size,
                limit: self.max_upload_size,
            });
        }

        let extension = key_extension(upload.original_name.as_deref(), &mime_type);
        let key = self.minter.mint(extension);

        // Tier A: the only write whose failure reaches the caller
        self.disk.put(key.as_str(), upload.data.clone()).await?;

        let data_url = encode_data_url(&mime_type, &upload.data);
        let (mapping, blob_store) = tokio::join!(
            self.mirror_to_mapping(&key, &data_url, &mime_type, size),
            self.mirror_to_blob_store(&key, &data_url, &mime_type, size, upload.related_product_id),
        );
        let report = FanOutReport {
            mapping,
            blob_store,
        };

        tracing::info!(
            key = %key,
            size,
            mime_type = %mime_type,
            mapping = %report.mapping,
            blob_store = %report.blob_store,
            "Stored asset"
        );

        Ok(IngestReceipt {
            url: format!("/asset/{key}"),
            original_name: upload.original_name.unwrap_or_else(|| key.to_string()),
            key,
            size,
            mime_type,
            report,
        })
    }

    async fn mirror_to_mapping(
        &self,
        key: &AssetKey,
        data_url: &str,
        mime_type: &str,
        size: u64,
    ) -> SinkOutcome {
        let entry = MappingEntry {
            key: key.to_string(),
            data: data_url.to_string(),
            mime_type: mime_type.to_string(),
            size,
            uploaded_at: Some(Utc::now()),
        };

        match self.mapping.upsert(&entry).await {
            Ok(UpsertOutcome::Inserted) => SinkOutcome::Ok,
            Ok(UpsertOutcome::Existing) => SinkOutcome::Skipped,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Mapping mirror write failed");
                SinkOutcome::Failed(e.to_string())
            }
        }
    }

    async fn mirror_to_blob_store(
        &self,
        key: &AssetKey,
        data_url: &str,
        mime_type: &str,
        size: u64,
        related_product_id: Option<String>,
    ) -> SinkOutcome {
        let Some(store) = &self.blob_store else {
            return SinkOutcome::Skipped;
        };

        let record = BlobRecord {
            key: key.to_string(),
            data: data_url.to_string(),
            mime_type: mime_type.to_string(),
            size,
            related_product_id,
            created_at: Utc::now(),
        };

        match store.insert(&record).await {
            Ok(()) => SinkOutcome::Ok,
            Err(BlobStoreError::Duplicate(_)) => {
                tracing::debug!(key = %key, "Blob already stored");
                SinkOutcome::Skipped
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Blob store mirror write failed");
                SinkOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Declared content type, falling back to a guess from the filename when the
/// client sent nothing useful. Must be an accepted image type.
///
/// Only needs the part headers, so callers can reject a body before reading it.
pub fn resolve_content_type(
    content_type: Option<&str>,
    original_name: Option<&str>,
) -> Result<String, IngestError> {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let mime_type = declared
        .or_else(|| {
            original_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !ACCEPTED_CONTENT_TYPES.iter().any(|(ct, _)| *ct == mime_type) {
        return Err(IngestError::InvalidContentType(mime_type));
    }

    // Serve paths report `image/jpeg` for .jpg keys
    if mime_type == "image/jpg" {
        return Ok("image/jpeg".to_string());
    }
    Ok(mime_type)
}

/// Extension for a new key. The original filename's extension is kept only
/// when it maps back to `mime_type`, since the serve path derives the
/// content type from the key.
fn key_extension(original_name: Option<&str>, mime_type: &str) -> &'static str {
    let from_name = original_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| IMAGE_EXTENSIONS.iter().copied().find(|e| *e == ext))
        .filter(|ext| {
            mime_guess::from_ext(ext)
                .first()
                .is_some_and(|m| m.essence_str() == mime_type)
        });

    from_name
        .or_else(|| {
            ACCEPTED_CONTENT_TYPES
                .iter()
                .find(|(ct, _)| *ct == mime_type)
                .map(|(_, ext)| *ext)
        })
        .unwrap_or("jpg")
}
