use axum::{extract::State, Json};

use crate::models::ScraperInfo;
use crate::state::AppState;

/// List registered scrapers with their effective enable flag
#[utoipa::path(
    get,
    path = "/api/scrapers",
    tag = "danmu",
    responses(
        (status = 200, description = "Registered scrapers in configured order", body = Vec<ScraperInfo>)
    )
)]
pub async fn list_scrapers(State(state): State<AppState>) -> Json<Vec<ScraperInfo>> {
    let configs = state.scrapers.normalize_configs(&state.settings.get().scrapers);
    let scrapers = configs
        .into_iter()
        .filter_map(|config| {
            let scraper = state.scrapers.find_by_name(&config.name)?;
            Some(ScraperInfo {
                name: config.name,
                provider_id: scraper.provider_id().to_string(),
                enable: config.enable,
            })
        })
        .collect();
    Json(scrapers)
}
