use axum::Router;

use crate::api::handlers;
use crate::openapi::openapi_json;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        // Catalog notifications
        .route("/api/webhook/library", post(handlers::library_webhook))
        // Manual search and forced download
        .route("/api/danmu/search", get(handlers::search_danmu))
        .route("/api/danmu/download", post(handlers::download_danmu))
        .route("/api/scrapers", get(handlers::list_scrapers))
        // Settings endpoints
        .route(
            "/api/settings",
            get(handlers::get_settings)
                .patch(handlers::update_settings)
                .delete(handlers::reset_settings),
        )
        .route("/api/openapi.json", get(openapi_json))
        .with_state(state)
}
