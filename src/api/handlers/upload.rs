use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::ingest::{self, IngestError, Upload};
use crate::AppState;

/// Multipart field carrying the file. `image` is accepted for older clients.
const FILE_FIELDS: &[&str] = &["file", "image"];

/// Cap for small text fields such as `productId`.
const MAX_TEXT_FIELD: u64 = 1024;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Outcome of reading a field under a byte cap.
enum Capped {
    Complete(Bytes),
    /// Bytes seen when the cap was crossed.
    Exceeded(u64),
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_asset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let limit = state.coordinator.max_upload_size();
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut related_product_id: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            name if FILE_FIELDS.contains(&name) => {
                // First file field wins when a client sends both
                if file.is_some() {
                    continue;
                }
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());

                // Type is decided from the part headers, before any body is read
                ingest::resolve_content_type(content_type.as_deref(), file_name.as_deref())?;

                let data = match read_capped(&mut field, limit).await? {
                    Capped::Complete(data) => data,
                    Capped::Exceeded(size) => {
                        return Err(IngestError::PayloadTooLarge { size, limit }.into())
                    }
                };
                file = Some((data, content_type, file_name));
            }
            "productId" | "product_id" => {
                let text = match read_capped(&mut field, MAX_TEXT_FIELD).await? {
                    Capped::Complete(data) => String::from_utf8(data.to_vec())
                        .map_err(|_| ApiError::bad_request("Invalid productId: not UTF-8"))?,
                    Capped::Exceeded(_) => {
                        return Err(ApiError::bad_request("Invalid productId: too long"))
                    }
                };
                related_product_id = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (data, content_type, original_name) =
        file.ok_or_else(|| ApiError::bad_request("No file uploaded (expected field \"file\")"))?;

    let receipt = state
        .coordinator
        .ingest(Upload {
            data,
            content_type,
            original_name,
            related_product_id,
        })
        .await?;

    Ok(Json(UploadResponse {
        url: receipt.url,
        key: receipt.key.to_string(),
        original_name: receipt.original_name,
        size: receipt.size,
        mime_type: receipt.mime_type,
    }))
}

/// Read a field chunk by chunk, stopping as soon as it grows past `cap`.
async fn read_capped(field: &mut Field<'_>, cap: u64) -> Result<Capped, ApiError> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, cap))? {
        buf.extend_from_slice(&chunk);
        if buf.len() as u64 > cap {
            return Ok(Capped::Exceeded(buf.len() as u64));
        }
    }

    Ok(Capped::Complete(buf.freeze()))
}

fn multipart_error(e: MultipartError, limit: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large(format!(
            "File exceeds the maximum upload size of {limit} bytes"
        ));
    }
    ApiError::new(e.status(), format!("Invalid multipart data: {}", e.body_text()))
}
