use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::{Settings, UpdateSettings};
use crate::state::AppState;

/// Scraper list as shown to the user: pruned and completed against the
/// registered scrapers.
fn normalized(state: &AppState, mut settings: Settings) -> Settings {
    settings.scrapers = state.scrapers.normalize_configs(&settings.scrapers);
    settings
}

/// Get application settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Application settings", body = Settings)
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    let settings = state.settings.get();
    Json(normalized(&state, settings))
}

/// Update application settings
#[utoipa::path(
    patch,
    path = "/api/settings",
    tag = "settings",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated successfully", body = Settings),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettings>,
) -> AppResult<Json<Settings>> {
    let settings = state.settings.update(payload).await?;
    state.apply_danmu_api_options(&settings);
    Ok(Json(normalized(&state, settings)))
}

/// Reset settings to defaults
#[utoipa::path(
    delete,
    path = "/api/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Settings reset successfully", body = Settings),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reset_settings(State(state): State<AppState>) -> AppResult<Json<Settings>> {
    let settings = state.settings.reset().await?;
    state.apply_danmu_api_options(&settings);
    Ok(Json(normalized(&state, settings)))
}
