//! # Asset Routes
//!
//! - `POST /v1/assets`: Upload from a URL or `data:` URL
//! - `POST /v1/assets/raw`: Upload the request body as-is
//! - `GET  /v1/assets/{hash}`: Look up a committed asset
//!
//! Upload handlers respond only once the asset is durable, which can take
//! up to one flush interval.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use gitcas_core::{AssetRecord, ContentDigest};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/assets", post(upload))
        .route("/v1/assets/raw", post(upload_raw))
        .route("/v1/assets/{hash}", get(get_asset))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// `http(s)://…`, `data:…` or `base64://…`.
    pub source: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawParams {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    pub hash: String,
    pub name: String,
    pub size: u64,
    pub branch: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl AssetResponse {
    fn new(record: &AssetRecord, url: String) -> Self {
        Self {
            hash: record.hash.to_hex(),
            name: record.name.to_string(),
            size: record.size,
            branch: record.branch.name(),
            url,
            created_at: record.created_at,
        }
    }
}

/// POST /v1/assets
async fn upload(
    State(state): State<AppState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let req = extract_json(body)?;
    let url = state.store.upload(&req.source, req.name.as_deref()).await?;
    Ok(Json(UploadResponse { url }))
}

/// POST /v1/assets/raw?name=…
async fn upload_raw(
    State(state): State<AppState>,
    Query(params): Query<RawParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let media_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let url = state
        .store
        .upload_typed(body.to_vec(), params.name.as_deref(), media_type)
        .await?;
    Ok(Json(UploadResponse { url }))
}

/// GET /v1/assets/{hash}
async fn get_asset(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<AssetResponse>, AppError> {
    let digest = ContentDigest::from_hex(&hash).map_err(|e| AppError::Validation(e.to_string()))?;
    let record = state
        .store
        .find(&digest)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("asset {digest} not found")))?;
    let url = state.store.url_for(&record);
    Ok(Json(AssetResponse::new(&record, url)))
}
