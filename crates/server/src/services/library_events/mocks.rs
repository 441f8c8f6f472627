//! Mock implementations for testing the reconciliation engine.
//!
//! Every mock keeps its state behind `Arc<Mutex<..>>`, so a test can hold
//! one copy for assertions while the engine owns another.
//!
//! # Example
//!
//! ```ignore
//! let catalog = MockCatalog::new();
//! catalog.insert(movie("m1", "Your Name"));
//!
//! let scraper = Arc::new(MockScraper::new("mock", "MockID"));
//! scraper.add_search("Your Name", "100");
//!
//! let reconciler = test_reconciler(&catalog, vec![scraper.clone()], Settings::default());
//! reconciler.process_batch(events).await;
//! assert_eq!(catalog.item("m1").unwrap().provider_id("MockID"), Some("100"));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{ItemKind, MediaItem};
use file_cache::ManualClock;
use scraper::{
    Danmaku, DanmakuComment, EpisodeInfo, MediaInfo, Scraper, ScraperError, ScraperManager,
    SearchInfo,
};

use crate::catalog::{Catalog, CatalogError, LibraryOptions};
use crate::models::Settings;

use super::traits::{AssOptions, DanmuRenderer, SettingsProvider};
use super::{DownloadError, EngineOptions, Reconciler};

// ============================================================================
// Mock Catalog
// ============================================================================

#[derive(Clone, Default)]
pub struct MockCatalog {
    items: Arc<Mutex<HashMap<String, MediaItem>>>,
    disabled: Arc<Mutex<HashSet<String>>>,
    updates: Arc<Mutex<Vec<MediaItem>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: MediaItem) {
        self.items.lock().unwrap().insert(item.id.clone(), item);
    }

    /// Current state of an item (for verification).
    pub fn item(&self, id: &str) -> Option<MediaItem> {
        self.items.lock().unwrap().get(id).cloned()
    }

    /// Turn the danmu fetcher off for the library holding `id`.
    pub fn disable_library_for(&self, id: &str) {
        self.disabled.lock().unwrap().insert(id.to_string());
    }

    /// Every item passed to `update_metadata`, in call order.
    pub fn updates(&self) -> Vec<MediaItem> {
        self.updates.lock().unwrap().clone()
    }

    fn children(&self, kind: ItemKind, parent: impl Fn(&MediaItem) -> bool) -> Vec<MediaItem> {
        let mut children: Vec<MediaItem> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.kind == kind && parent(item))
            .cloned()
            .collect();
        children.sort_by_key(|item| item.index_number);
        children
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn get_item_by_id(&self, id: &str) -> Result<Option<MediaItem>, CatalogError> {
        Ok(self.item(id))
    }

    async fn get_items_by_path(&self, path: &str) -> Result<Vec<MediaItem>, CatalogError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.path.as_deref() == Some(path))
            .cloned()
            .collect())
    }

    async fn get_library_options(&self, item: &MediaItem) -> Result<LibraryOptions, CatalogError> {
        let disabled = self.disabled.lock().unwrap().contains(&item.id);
        Ok(LibraryOptions {
            disabled_subtitle_fetchers: if disabled {
                vec!["Danmu".to_string()]
            } else {
                Vec::new()
            },
        })
    }

    async fn update_metadata(&self, item: &MediaItem) -> Result<(), CatalogError> {
        self.updates.lock().unwrap().push(item.clone());
        if let Some(stored) = self.items.lock().unwrap().get_mut(&item.id) {
            stored.provider_ids = item.provider_ids.clone();
        }
        Ok(())
    }

    async fn get_seasons(&self, series: &MediaItem) -> Result<Vec<MediaItem>, CatalogError> {
        Ok(self.children(ItemKind::Season, |s| {
            s.series_id.as_deref() == Some(series.id.as_str())
        }))
    }

    async fn get_episodes(&self, season: &MediaItem) -> Result<Vec<MediaItem>, CatalogError> {
        Ok(self.children(ItemKind::Episode, |e| {
            e.season_id.as_deref() == Some(season.id.as_str())
        }))
    }
}

// ============================================================================
// Mock Scraper
// ============================================================================

#[derive(Default)]
pub struct MockScraper {
    name: &'static str,
    provider_id: &'static str,
    stale_payloads: bool,
    rate_limited: AtomicBool,
    search_results: Mutex<HashMap<String, String>>,
    media: Mutex<HashMap<String, MediaInfo>>,
    episodes: Mutex<HashMap<String, EpisodeInfo>>,
    danmaku: Mutex<HashMap<String, Danmaku>>,
    search_calls: AtomicUsize,
    media_calls: AtomicUsize,
    episode_calls: AtomicUsize,
    danmu_calls: AtomicUsize,
}

impl MockScraper {
    pub fn new(name: &'static str, provider_id: &'static str) -> Self {
        Self {
            name,
            provider_id,
            ..Default::default()
        }
    }

    pub fn with_stale_payloads(mut self) -> Self {
        self.stale_payloads = true;
        self
    }

    /// Every call fails with `RateLimited` while set.
    pub fn set_rate_limited(&self, rate_limited: bool) {
        self.rate_limited.store(rate_limited, Ordering::SeqCst);
    }

    /// `search_media_id` for an item whose search name is `name`.
    pub fn add_search(&self, name: &str, media_id: &str) {
        self.search_results
            .lock()
            .unwrap()
            .insert(name.to_string(), media_id.to_string());
    }

    pub fn add_media(&self, media: MediaInfo) {
        for episode in &media.episodes {
            self.add_episode(episode.clone());
        }
        self.media.lock().unwrap().insert(media.id.clone(), media);
    }

    pub fn add_episode(&self, episode: EpisodeInfo) {
        self.episodes
            .lock()
            .unwrap()
            .insert(episode.id.clone(), episode);
    }

    pub fn add_danmaku(&self, comment_id: &str, danmaku: Danmaku) {
        self.danmaku
            .lock()
            .unwrap()
            .insert(comment_id.to_string(), danmaku);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }

    pub fn episode_calls(&self) -> usize {
        self.episode_calls.load(Ordering::SeqCst)
    }

    pub fn danmu_calls(&self) -> usize {
        self.danmu_calls.load(Ordering::SeqCst)
    }

    fn check_rate_limit(&self) -> Result<(), ScraperError> {
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ScraperError::RateLimited {
                scraper: self.name,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Scraper for MockScraper {
    fn name(&self) -> &'static str {
        self.name
    }

    fn provider_id(&self) -> &'static str {
        self.provider_id
    }

    fn may_return_stale_payload(&self) -> bool {
        self.stale_payloads
    }

    async fn search(&self, item: &MediaItem) -> Result<Vec<SearchInfo>, ScraperError> {
        self.check_rate_limit()?;
        let media_id = self.search_results.lock().unwrap().get(item.search_name()).cloned();
        let media = self.media.lock().unwrap();
        Ok(media_id
            .and_then(|id| media.get(&id))
            .map(|m| SearchInfo {
                id: m.id.clone(),
                name: m.name.clone(),
                category: "TV动画".to_string(),
                year: m.year,
                episode_size: m.episode_count(),
            })
            .into_iter()
            .collect())
    }

    async fn search_media_id(&self, item: &MediaItem) -> Result<Option<String>, ScraperError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_rate_limit()?;
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(item.search_name())
            .cloned())
    }

    async fn get_media(
        &self,
        _item: &MediaItem,
        id: &str,
    ) -> Result<Option<MediaInfo>, ScraperError> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        self.check_rate_limit()?;
        Ok(self.media.lock().unwrap().get(id).cloned())
    }

    async fn get_media_episode(
        &self,
        _item: &MediaItem,
        id: &str,
    ) -> Result<Option<EpisodeInfo>, ScraperError> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        self.check_rate_limit()?;
        if let Some(episode) = self.episodes.lock().unwrap().get(id) {
            return Ok(Some(episode.clone()));
        }
        // Movies are addressed by their media id
        Ok(self.media.lock().unwrap().get(id).map(|m| EpisodeInfo {
            id: m.id.clone(),
            comment_id: m.comment_id.clone(),
            number: Some(1),
            title: m.name.clone(),
        }))
    }

    async fn get_danmu_content(
        &self,
        _item: &MediaItem,
        comment_id: &str,
    ) -> Result<Option<Danmaku>, ScraperError> {
        self.danmu_calls.fetch_add(1, Ordering::SeqCst);
        self.check_rate_limit()?;
        Ok(self.danmaku.lock().unwrap().get(comment_id).cloned())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

#[derive(Clone, Default)]
pub struct MockRenderer {
    titles: Arc<Mutex<Vec<String>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Titles of every rendered script (for verification).
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

impl DanmuRenderer for MockRenderer {
    fn render(&self, danmaku: &Danmaku, options: &AssOptions) -> Result<String, DownloadError> {
        self.titles.lock().unwrap().push(options.title.clone());
        Ok(format!("[Script Info]\nTitle: {}\n; {} comments\n", options.title, danmaku.items.len()))
    }
}

// ============================================================================
// Mock Settings Provider
// ============================================================================

#[derive(Clone, Default)]
pub struct MockSettingsProvider {
    settings: Arc<Mutex<Settings>>,
}

impl MockSettingsProvider {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
        }
    }
}

impl SettingsProvider for MockSettingsProvider {
    fn settings(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A track with `count` comments.
pub fn danmaku_with(count: usize) -> Danmaku {
    let mut danmaku = Danmaku::new("chat");
    danmaku.items = (0..count)
        .map(|i| DanmakuComment {
            progress_ms: i as i64 * 1000,
            mode: 1,
            font_size: 25,
            color: 16777215,
            id: i as i64,
            content: format!("comment {}", i),
            ..Default::default()
        })
        .collect();
    danmaku
}

/// Remote media `id` with `count` episodes, comment ids `{id}-c{n}`.
pub fn media_with_episodes(id: &str, count: usize) -> MediaInfo {
    MediaInfo {
        id: id.to_string(),
        comment_id: format!("{}-c", id),
        name: format!("media {}", id),
        year: Some(2023),
        episodes: (1..=count)
            .map(|n| EpisodeInfo {
                id: format!("{}-e{}", id, n),
                comment_id: format!("{}-c{}", id, n),
                number: Some(n as i32),
                title: format!("episode {}", n),
            })
            .collect(),
    }
}

/// A reconciler over mocks, with time driven by `clock`.
pub fn test_reconciler_with_clock(
    catalog: &MockCatalog,
    scrapers: Vec<Arc<MockScraper>>,
    settings: Settings,
    clock: &ManualClock,
) -> Reconciler {
    let scrapers: Vec<Arc<dyn Scraper>> = scrapers
        .into_iter()
        .map(|s| s as Arc<dyn Scraper>)
        .collect();
    let options = EngineOptions {
        clock: Arc::new(clock.clone()),
        ..Default::default()
    };
    Reconciler::new(
        Arc::new(catalog.clone()),
        Arc::new(ScraperManager::new(scrapers)),
        Arc::new(MockSettingsProvider::new(settings)),
        Arc::new(MockRenderer::new()),
        &options,
    )
}

pub fn test_reconciler(
    catalog: &MockCatalog,
    scrapers: Vec<Arc<MockScraper>>,
    settings: Settings,
) -> Reconciler {
    test_reconciler_with_clock(catalog, scrapers, settings, &ManualClock::default())
}
