//! Manual search and forced download, the "pick a danmu source" flow.

use std::sync::Arc;
use std::time::Duration;

use domain::{EventType, ItemKind, MediaItem};
use file_cache::MemoryCache;
use futures::future::join_all;
use scraper::{Scraper, ScraperManager, SearchInfo};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::models::{DanmuCandidate, DanmuSearchQuery, DownloadDanmuRequest, ForceAck};

use super::library_events::{LibraryEventsHandle, SettingsProvider, FETCHER_NAME};

/// How long the same forced download is acknowledged without re-running
const FORCE_REPEAT_TTL: Duration = Duration::from_secs(30);

/// Default bound on how long a forced download is awaited
pub const DEFAULT_FORCE_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DanmuServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub struct DanmuService {
    catalog: Arc<dyn Catalog>,
    scrapers: Arc<ScraperManager>,
    settings: Arc<dyn SettingsProvider>,
    events: LibraryEventsHandle,
    recent_forces: MemoryCache<bool>,
    force_wait: Duration,
}

impl DanmuService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        scrapers: Arc<ScraperManager>,
        settings: Arc<dyn SettingsProvider>,
        events: LibraryEventsHandle,
        force_wait: Duration,
    ) -> Self {
        Self {
            catalog,
            scrapers,
            settings,
            events,
            recent_forces: MemoryCache::new(FORCE_REPEAT_TTL),
            force_wait,
        }
    }

    /// Search every enabled scraper for the item, concurrently.
    ///
    /// A scraper that fails contributes no candidates.
    pub async fn search(
        &self,
        query: &DanmuSearchQuery,
    ) -> Result<Vec<DanmuCandidate>, DanmuServiceError> {
        let item = self.resolve(query).await?;

        let options = self.catalog.get_library_options(&item).await?;
        if options.is_fetcher_disabled(FETCHER_NAME) {
            tracing::info!("Danmu is disabled for the library of {}, no search", item.name);
            return Ok(Vec::new());
        }

        let scrapers = self.scrapers.all(&self.settings.settings().scrapers);
        let results = join_all(scrapers.iter().map(|scraper| {
            let item = &item;
            async move {
                match scraper.search(item).await {
                    Ok(results) => results
                        .into_iter()
                        .map(|info| candidate(scraper.as_ref(), item, info))
                        .collect(),
                    Err(e) if e.is_rate_limited() => {
                        tracing::warn!("[{}] Rate limited while searching {}", scraper.name(), item.name);
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::error!("[{}] Search for {} failed: {}", scraper.name(), item.name, e);
                        Vec::new()
                    }
                }
            }
        }))
        .await;

        Ok(results.into_iter().flatten().collect())
    }

    /// Bind the item to the chosen remote media and download now.
    ///
    /// Waits at most `force_wait` for the download; past that it keeps
    /// running in the background and the acknowledgement says so.
    pub async fn force(&self, request: &DownloadDanmuRequest) -> Result<ForceAck, DanmuServiceError> {
        let key = format!("{}_{}_{}", request.item_id, request.provider_id, request.media_id);
        if self.recent_forces.contains_key(&key) {
            return Ok(ForceAck::already_triggered(
                "已经触发下载了，无需重试",
            ));
        }

        let item = self
            .catalog
            .get_item_by_id(&request.item_id)
            .await?
            .ok_or_else(|| DanmuServiceError::NotFound(format!("Item {} not found", request.item_id)))?;

        let settings = self.settings.settings();
        let known = self
            .scrapers
            .all(&settings.scrapers)
            .iter()
            .any(|s| s.provider_id() == request.provider_id);
        if !known {
            return Err(DanmuServiceError::BadRequest(format!(
                "No enabled scraper with provider id {}",
                request.provider_id
            )));
        }

        // Only the chosen id travels with the event, the stored item is untouched
        let mut temp = MediaItem::new(item.id.clone(), item.kind, item.name.clone());
        temp.set_provider_id(&request.provider_id, request.media_id.as_str());

        self.recent_forces.set(&key, true, None);

        let events = self.events.clone();
        let task = tokio::spawn(async move { events.enqueue(temp, EventType::Force).await });
        match tokio::time::timeout(self.force_wait, task).await {
            Ok(Ok(())) => Ok(ForceAck::accepted(format!("'{}' 的弹幕已下载", item.name))),
            Ok(Err(e)) => {
                tracing::error!("Forced download task of {} failed: {}", item.name, e);
                Ok(ForceAck::accepted(format!("'{}' 的弹幕下载失败，请查看日志", item.name)))
            }
            Err(_) => Ok(ForceAck::accepted(format!(
                "'{}' 的弹幕任务已在后台开始下载，请稍后查看",
                item.name
            ))),
        }
    }

    async fn resolve(&self, query: &DanmuSearchQuery) -> Result<MediaItem, DanmuServiceError> {
        if let Some(id) = query.item_id.as_deref().filter(|id| !id.is_empty()) {
            return self
                .catalog
                .get_item_by_id(id)
                .await?
                .ok_or_else(|| DanmuServiceError::NotFound(format!("Item {} not found", id)));
        }

        if let Some(path) = query.path.as_deref().filter(|p| !p.is_empty()) {
            return self
                .catalog
                .get_items_by_path(path)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| DanmuServiceError::NotFound(format!("No item at {}", path)));
        }

        Err(DanmuServiceError::BadRequest(
            "Either item_id or path is required".to_string(),
        ))
    }
}

/// `[category] name (year)【共N集】 - 来源：scraper 弹幕`
fn candidate(scraper: &dyn Scraper, item: &MediaItem, info: SearchInfo) -> DanmuCandidate {
    let mut label = if info.category.is_empty() {
        info.name.clone()
    } else {
        format!("[{}] {}", info.category, info.name)
    };
    if let Some(year) = info.year.filter(|y| *y > 1970) {
        label.push_str(&format!(" ({})", year));
    }
    if item.kind == ItemKind::Episode && info.episode_size > 0 {
        label.push_str(&format!("【共{}集】", info.episode_size));
    }
    label.push_str(&format!(" - 来源：{} 弹幕", scraper.name()));

    DanmuCandidate {
        item_id: item.id.clone(),
        scraper: scraper.name().to_string(),
        provider_id: scraper.provider_id().to_string(),
        media_id: info.id,
        label,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use domain::{ItemKind, MediaItem};
    use scraper::{Scraper, ScraperManager};

    use super::*;
    use crate::models::{ForceStatus, Settings};
    use crate::services::library_events::mocks::*;
    use crate::services::library_events::{start_library_events, EngineOptions};

    fn service(catalog: &MockCatalog, scrapers: Vec<Arc<MockScraper>>) -> DanmuService {
        let scrapers: Vec<Arc<dyn Scraper>> = scrapers
            .into_iter()
            .map(|s| s as Arc<dyn Scraper>)
            .collect();
        let scrapers = Arc::new(ScraperManager::new(scrapers));
        let settings = Arc::new(MockSettingsProvider::new(Settings::default()));
        let catalog: Arc<dyn Catalog> = Arc::new(catalog.clone());
        let events = start_library_events(
            Arc::clone(&catalog),
            Arc::clone(&scrapers),
            settings.clone(),
            Arc::new(MockRenderer::new()),
            EngineOptions::default(),
        );
        DanmuService::new(catalog, scrapers, settings, events, Duration::from_secs(5))
    }

    fn episode() -> MediaItem {
        let mut item = MediaItem::new("e1", ItemKind::Episode, "Episode 1");
        item.series_name = Some("葬送的芙莉莲".to_string());
        item.path = Some("/media/Frieren/S01E01.mkv".to_string());
        item
    }

    #[tokio::test]
    async fn test_search_labels_candidates_from_every_scraper() {
        let catalog = MockCatalog::new();
        catalog.insert(episode());
        let first = Arc::new(MockScraper::new("first", "FirstID"));
        first.add_search("葬送的芙莉莲", "100");
        first.add_media(media_with_episodes("100", 28));
        let second = Arc::new(MockScraper::new("second", "SecondID"));
        second.set_rate_limited(true);
        let service = service(&catalog, vec![first, second]);

        let query = DanmuSearchQuery {
            item_id: None,
            path: Some("/media/Frieren/S01E01.mkv".to_string()),
        };
        let candidates = service.search(&query).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].provider_id, "FirstID");
        assert_eq!(candidates[0].media_id, "100");
        assert_eq!(
            candidates[0].label,
            "[TV动画] media 100 (2023)【共28集】 - 来源：first 弹幕"
        );
    }

    #[tokio::test]
    async fn test_search_respects_library_opt_out() {
        let catalog = MockCatalog::new();
        catalog.insert(episode());
        catalog.disable_library_for("e1");
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_search("葬送的芙莉莲", "100");
        let service = service(&catalog, vec![scraper.clone()]);

        let query = DanmuSearchQuery {
            item_id: Some("e1".to_string()),
            path: None,
        };

        assert!(service.search(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_needs_an_item() {
        let service = service(&MockCatalog::new(), vec![]);

        let missing = DanmuSearchQuery {
            item_id: Some("nope".to_string()),
            path: None,
        };
        assert!(matches!(
            service.search(&missing).await,
            Err(DanmuServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.search(&DanmuSearchQuery::default()).await,
            Err(DanmuServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_repeated_force_is_acknowledged_once() {
        let catalog = MockCatalog::new();
        catalog.insert(MediaItem::new("m1", ItemKind::Movie, "Your Name"));
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_media(media_with_episodes("100", 1));
        let service = service(&catalog, vec![scraper.clone()]);
        let request = DownloadDanmuRequest {
            item_id: "m1".to_string(),
            provider_id: "MockID".to_string(),
            media_id: "100".to_string(),
        };

        let first = service.force(&request).await.unwrap();
        let second = service.force(&request).await.unwrap();

        assert_eq!(first.status, ForceStatus::Accepted);
        assert_eq!(second.status, ForceStatus::AlreadyTriggered);
        assert_eq!(scraper.media_calls(), 1);
        assert_eq!(catalog.item("m1").unwrap().provider_id("MockID"), Some("100"));
    }

    #[tokio::test]
    async fn test_force_with_unknown_provider_is_rejected() {
        let catalog = MockCatalog::new();
        catalog.insert(MediaItem::new("m1", ItemKind::Movie, "Your Name"));
        let service = service(&catalog, vec![Arc::new(MockScraper::new("mock", "MockID"))]);
        let request = DownloadDanmuRequest {
            item_id: "m1".to_string(),
            provider_id: "OtherID".to_string(),
            media_id: "1".to_string(),
        };

        assert!(matches!(
            service.force(&request).await,
            Err(DanmuServiceError::BadRequest(_))
        ));
    }
}
