use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::models::{DanmuCandidate, DanmuSearchQuery, DownloadDanmuRequest, ForceAck};
use crate::state::AppState;

/// Search every enabled scraper for danmu matching a catalog item
#[utoipa::path(
    get,
    path = "/api/danmu/search",
    tag = "danmu",
    params(DanmuSearchQuery),
    responses(
        (status = 200, description = "Labelled candidates", body = Vec<DanmuCandidate>),
        (status = 400, description = "Neither item_id nor path given"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn search_danmu(
    State(state): State<AppState>,
    Query(query): Query<DanmuSearchQuery>,
) -> AppResult<Json<Vec<DanmuCandidate>>> {
    let candidates = state.danmu.search(&query).await?;
    Ok(Json(candidates))
}

/// Bind an item to a chosen candidate and download its danmu now
#[utoipa::path(
    post,
    path = "/api/danmu/download",
    tag = "danmu",
    request_body = DownloadDanmuRequest,
    responses(
        (status = 202, description = "Download triggered", body = ForceAck),
        (status = 400, description = "Unknown provider id"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn download_danmu(
    State(state): State<AppState>,
    Json(payload): Json<DownloadDanmuRequest>,
) -> AppResult<(StatusCode, Json<ForceAck>)> {
    tracing::info!(
        "Forced download requested: item={} {}={}",
        payload.item_id,
        payload.provider_id,
        payload.media_id
    );
    let ack = state.danmu.force(&payload).await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}
