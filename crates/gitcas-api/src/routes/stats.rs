//! `GET /v1/stats`: aggregate count and size of committed assets.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use gitcas_core::AssetStats;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/stats", get(stats))
}

async fn stats(State(state): State<AppState>) -> Result<Json<AssetStats>, AppError> {
    Ok(Json(state.store.stats().await?))
}
