use axum::Json;
use utoipa::OpenApi;

use crate::api::handlers;
use crate::catalog::{EmbyItem, EmbyWebhook};
use crate::models::{
    AssSettings, DanmuApiSettings, DanmuCandidate, DownloadDanmuRequest, DownloadSettings,
    ForceAck, ForceStatus, ScraperInfo, Settings, UpdateAssSettings, UpdateDanmuApiSettings,
    UpdateDownloadSettings, UpdateSettings,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Danmu API",
        version = "1.0.0"
    ),
    paths(
        handlers::webhook::library_webhook,
        handlers::danmu::search_danmu,
        handlers::danmu::download_danmu,
        handlers::scrapers::list_scrapers,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::reset_settings
    ),
    tags(
        (name = "webhook", description = "Catalog notifications"),
        (name = "danmu", description = "Manual danmu search and download"),
        (name = "settings", description = "Application settings endpoints")
    ),
    components(schemas(
        EmbyWebhook,
        EmbyItem,
        DanmuCandidate,
        DownloadDanmuRequest,
        ForceAck,
        ForceStatus,
        ScraperInfo,
        scraper::ScraperConfigItem,
        Settings,
        DownloadSettings,
        AssSettings,
        DanmuApiSettings,
        UpdateSettings,
        UpdateDownloadSettings,
        UpdateAssSettings,
        UpdateDanmuApiSettings
    ))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
