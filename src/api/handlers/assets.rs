use axum::extract::{Path, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::asset::placeholder;
use crate::resolve::{ResolveError, ResolvedAsset, SHORT_CACHE};
use crate::AppState;

/// Which tier answered; `placeholder` marks a degraded response.
pub const ASSET_TIER_HEADER: HeaderName = HeaderName::from_static("x-asset-tier");

/// Serve an asset by key.
/// Route: GET /asset/*key
///
/// Never fails for a key that survives normalization: misses on every tier
/// come back as a 200 placeholder image.
pub async fn serve_asset(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Response {
    match state.resolver.resolve(&key).await {
        Ok(asset) => asset_response(asset),
        Err(ResolveError::MalformedKey(e)) => {
            tracing::debug!(error = %e, "Rejected asset request");
            malformed_key_response()
        }
    }
}

/// Route: GET /asset/
pub async fn serve_empty_key() -> Response {
    malformed_key_response()
}

fn asset_response(asset: ResolvedAsset) -> Response {
    let mut response = (StatusCode::OK, asset.bytes.clone()).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        asset
            .mime_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(asset.cache_control()),
    );
    headers.insert(
        ASSET_TIER_HEADER,
        HeaderValue::from_static(asset.tier.as_str()),
    );

    if let Ok(value) = format!("inline; filename=\"{}\"", asset.key).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

/// A client error that still carries an image body, so an `<img>` pointing
/// at a broken token renders something.
fn malformed_key_response() -> Response {
    let (svg, mime_type) = placeholder::render("");
    let mut response = (StatusCode::BAD_REQUEST, svg).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(SHORT_CACHE));
    headers.insert(ASSET_TIER_HEADER, HeaderValue::from_static("placeholder"));

    response
}
