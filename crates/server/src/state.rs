use std::sync::Arc;
use std::time::Duration;

use danmu_api::{DanmuApiClient, DanmuApiOptions, DanmuApiScraper, SharedOptions};
use file_cache::FileCache;
use parking_lot::RwLock;
use reqwest::Client;
use scraper::{Scraper, ScraperManager};

use crate::catalog::{Catalog, EmbyCatalog};
use crate::config::Config;
use crate::models::Settings;
use crate::services::{
    start_library_events, AssRenderer, DanmuService, EngineOptions, LibraryEventsHandle,
    SettingsService, DEFAULT_FORCE_WAIT,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: Arc<SettingsService>,
    pub scrapers: Arc<ScraperManager>,
    /// Scraper response cache, flushed on shutdown
    pub cache: Arc<FileCache<serde_json::Value>>,
    pub danmu_api_options: SharedOptions,
    pub events: LibraryEventsHandle,
    pub danmu: Arc<DanmuService>,
}

impl AppState {
    /// Wire every service together. Must be called from within a tokio runtime.
    pub fn new(config: Config, settings: SettingsService) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let settings = Arc::new(settings);
        let startup_settings = settings.get();

        // Shared response cache for every scraper
        let cache = Arc::new(FileCache::open(config.cache_path()));

        // Scrapers
        let danmu_api_options: SharedOptions = Arc::new(RwLock::new(DanmuApiOptions::from(
            &startup_settings.danmu_api,
        )));
        let danmu_api = Arc::new(DanmuApiClient::new(
            http_client.clone(),
            Arc::clone(&danmu_api_options),
        ));
        let registered: Vec<Arc<dyn Scraper>> =
            vec![Arc::new(DanmuApiScraper::new(danmu_api, Arc::clone(&cache)))];
        let scrapers = Arc::new(ScraperManager::new(registered));

        // Catalog
        let catalog: Arc<dyn Catalog> = Arc::new(EmbyCatalog::new(
            http_client,
            config.emby_url.clone(),
            config.emby_api_key.clone(),
        ));

        // Reconciliation engine
        let events = start_library_events(
            Arc::clone(&catalog),
            Arc::clone(&scrapers),
            settings.clone(),
            Arc::new(AssRenderer::new()),
            EngineOptions::default(),
        );

        let danmu = Arc::new(DanmuService::new(
            catalog,
            Arc::clone(&scrapers),
            settings.clone(),
            events.clone(),
            DEFAULT_FORCE_WAIT,
        ));

        Ok(Self {
            config: Arc::new(config),
            settings,
            scrapers,
            cache,
            danmu_api_options,
            events,
            danmu,
        })
    }

    /// Push edited danmu API settings to the running scraper.
    pub fn apply_danmu_api_options(&self, settings: &Settings) {
        *self.danmu_api_options.write() = DanmuApiOptions::from(&settings.danmu_api);
        tracing::debug!("Danmu API options refreshed");
    }
}
