use std::future::Future;
use std::sync::Arc;

use domain::{EventType, ItemKind, LibraryEvent, MediaItem};
use file_cache::MemoryCache;
use futures::stream::{self, StreamExt};
use scraper::{EpisodeInfo, MediaInfo, Scraper, ScraperManager};

use crate::catalog::{Catalog, CatalogError};
use crate::models::Settings;

use super::download::{describe, DanmuDownloader, DownloadError, DownloadOutcome};
use super::traits::{AssOptions, DanmuRenderer, SettingsProvider};
use super::{EngineOptions, ReconcileError};

/// Settings and scraper order captured once per bucket
pub(super) struct Pass {
    pub settings: Settings,
    pub scrapers: Vec<Arc<dyn Scraper>>,
}

impl Pass {
    fn ass_options(&self, item: &MediaItem) -> Option<AssOptions> {
        self.settings
            .ass
            .to_ass
            .then(|| AssOptions::from_settings(&self.settings.ass, item.name.clone()))
    }

    fn episode_count_same(&self) -> bool {
        self.settings.download.enable_episode_count_same
    }
}

/// Matches catalog items against scrapers and downloads their danmaku.
pub struct Reconciler {
    pub(super) catalog: Arc<dyn Catalog>,
    pub(super) scrapers: Arc<ScraperManager>,
    settings: Arc<dyn SettingsProvider>,
    downloader: DanmuDownloader,
    pub(super) pending_adds: MemoryCache<MediaItem>,
    concurrency: usize,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        scrapers: Arc<ScraperManager>,
        settings: Arc<dyn SettingsProvider>,
        renderer: Arc<dyn DanmuRenderer>,
        options: &EngineOptions,
    ) -> Self {
        Self {
            catalog,
            scrapers,
            settings,
            downloader: DanmuDownloader::new(renderer, options.download_ttl, options.clock.clone()),
            pending_adds: MemoryCache::with_clock(options.pending_add_ttl, options.clock.clone()),
            concurrency: options.concurrency.max(1),
        }
    }

    pub(super) fn pass(&self) -> Pass {
        let settings = self.settings.settings();
        let scrapers = self.scrapers.all(&settings.scrapers);
        Pass { settings, scrapers }
    }

    /// Process one debounced batch.
    ///
    /// Returns events to queue again: the seasons of updated series.
    pub async fn process_batch(&self, events: Vec<LibraryEvent>) -> Vec<LibraryEvent> {
        self.purge_expired();
        let mut buckets = self.classify(events).await;
        let forced = std::mem::take(&mut buckets.force);
        let mut follow_ups = Vec::new();

        for (kind, event_type, items) in buckets.into_ordered() {
            if items.is_empty() {
                continue;
            }
            tracing::debug!(
                "Processing {} {} items with event type {:?}",
                items.len(),
                kind,
                event_type
            );
            follow_ups.extend(self.process_bucket(kind, event_type, items).await);
        }

        for item in forced {
            if let Err(e) = self.force(item).await {
                tracing::error!("Forced download failed: {}", e);
            }
        }

        follow_ups
    }

    /// Drop Adds never followed by an Update and expired download memos.
    fn purge_expired(&self) {
        let adds = self.pending_adds.purge_expired();
        let downloads = self.downloader.purge_expired();
        if adds + downloads > 0 {
            tracing::debug!("Purged {} stale adds and {} download memos", adds, downloads);
        }
    }

    async fn process_bucket(
        &self,
        kind: ItemKind,
        event_type: EventType,
        items: Vec<MediaItem>,
    ) -> Vec<LibraryEvent> {
        let pass = self.pass();
        let pass = &pass;

        match (kind, event_type) {
            (ItemKind::Movie, EventType::Add) => {
                let updates = self.each(items, move |item| self.movie_add(pass, item)).await;
                self.apply_metadata(updates).await;
            }
            (ItemKind::Movie, EventType::Update) => {
                self.each(items, move |item| self.movie_update(pass, item)).await;
            }
            (ItemKind::Series, EventType::Add) => {
                for item in items {
                    tracing::info!("Series {} added, waiting for its seasons", item.name);
                }
            }
            (ItemKind::Series, EventType::Update) => {
                let mut follow_ups = Vec::new();
                for item in items {
                    follow_ups.extend(self.series_update(&item).await);
                }
                return follow_ups;
            }
            (ItemKind::Season, EventType::Add) => {
                let matched = self.each(items, move |item| self.season_add(pass, item)).await;
                self.apply_metadata(matched.clone()).await;
                let updates = self
                    .each(matched, move |season| self.season_update(pass, season))
                    .await;
                self.apply_metadata(updates).await;
            }
            (ItemKind::Season, EventType::Update) => {
                let updates = self
                    .each(items, move |season| self.season_update(pass, season))
                    .await;
                self.apply_metadata(updates).await;
            }
            (ItemKind::Episode, EventType::Add | EventType::Update) => {
                let updates = self.each(items, move |item| self.episode_update(pass, item)).await;
                self.apply_metadata(updates).await;
            }
            (kind, event_type) => {
                tracing::warn!("No handler for {} {:?} events", kind, event_type);
            }
        }

        Vec::new()
    }

    /// Run `handler` over `items` with bounded concurrency, collecting the
    /// items whose provider ids changed.
    async fn each<F, Fut>(&self, items: Vec<MediaItem>, handler: F) -> Vec<MediaItem>
    where
        F: Fn(MediaItem) -> Fut,
        Fut: Future<Output = Vec<MediaItem>>,
    {
        stream::iter(items)
            .map(handler)
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    // ------------------------------------------------------------------
    // Movies
    // ------------------------------------------------------------------

    async fn movie_add(&self, pass: &Pass, mut item: MediaItem) -> Vec<MediaItem> {
        for scraper in &pass.scrapers {
            match self.match_movie(scraper.as_ref(), &item).await {
                Ok(Some(media)) => {
                    tracing::info!(
                        "[{}] Matched {} -> {}={}",
                        scraper.name(),
                        item.name,
                        scraper.provider_id(),
                        media.id
                    );
                    item.set_provider_id(scraper.provider_id(), media.id.as_str());
                    if let Err(e) = self
                        .download(pass, scraper.as_ref(), &item, &media.comment_id, false)
                        .await
                    {
                        log_download_error(scraper.as_ref(), &item, &e);
                    }
                    return vec![item];
                }
                Ok(None) => continue,
                Err(e) => {
                    if stop_on(scraper.as_ref(), &item, &e) {
                        break;
                    }
                }
            }
        }
        Vec::new()
    }

    async fn match_movie(
        &self,
        scraper: &dyn Scraper,
        item: &MediaItem,
    ) -> Result<Option<MediaInfo>, ReconcileError> {
        // The event snapshot may predate the metadata scan, so read the year fresh
        let current = self
            .catalog
            .get_item_by_id(&item.id)
            .await?
            .unwrap_or_else(|| item.clone());

        let Some(media_id) = scraper.search_media_id(&current).await? else {
            tracing::info!(
                "[{}] No match for {} ({:?})",
                scraper.name(),
                current.name,
                current.production_year
            );
            return Ok(None);
        };

        let media = scraper.get_media(&current, &media_id).await?;
        if media.is_none() {
            tracing::info!(
                "[{}] Matched {} but got no media info for id {}",
                scraper.name(),
                current.name,
                media_id
            );
        }
        Ok(media)
    }

    async fn movie_update(&self, pass: &Pass, item: MediaItem) -> Vec<MediaItem> {
        self.refresh_own_id(pass, &item).await;
        Vec::new()
    }

    /// Re-download through the first scraper whose id the item carries.
    async fn refresh_own_id(&self, pass: &Pass, item: &MediaItem) {
        let Some((scraper, id)) = pass.scrapers.iter().find_map(|s| {
            item.provider_id(s.provider_id())
                .map(|id| (s.as_ref(), id.to_string()))
        }) else {
            tracing::debug!("{} carries no danmu provider id, nothing to refresh", describe(item));
            return;
        };

        let result: Result<(), ReconcileError> = async {
            match scraper.get_media_episode(item, &id).await? {
                Some(episode) => {
                    self.download(pass, scraper, item, &episode.comment_id, false)
                        .await?;
                }
                None => tracing::info!(
                    "[{}] No episode info for {} (id={})",
                    scraper.name(),
                    describe(item),
                    id
                ),
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            stop_on(scraper, item, &e);
        }
    }

    // ------------------------------------------------------------------
    // Series and seasons
    // ------------------------------------------------------------------

    /// Season edits emit no event of their own, so a series update is
    /// turned into an update of each of its seasons.
    async fn series_update(&self, series: &MediaItem) -> Vec<LibraryEvent> {
        match self.catalog.get_seasons(series).await {
            Ok(seasons) => seasons
                .into_iter()
                .map(|season| LibraryEvent::new(season, EventType::Update))
                .collect(),
            Err(e) => {
                tracing::error!("Failed to list seasons of {}: {}", series.name, e);
                Vec::new()
            }
        }
    }

    async fn season_add(&self, pass: &Pass, mut season: MediaItem) -> Vec<MediaItem> {
        if season.index_number == Some(0) {
            tracing::info!("Skipping specials folder {}", season.name);
            return Vec::new();
        }

        // Season names are unreliable, search with the series name and the
        // freshly scanned year
        let mut search_item = season.clone();
        match self.catalog.get_item_by_id(&season.id).await {
            Ok(Some(current)) => {
                search_item.production_year = current.production_year;
                if search_item.series_name.is_none() {
                    search_item.series_name = current.series_name;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to reload season {}: {}", season.name, e),
        }
        if let Some(series_name) = search_item.series_name.clone().filter(|n| !n.is_empty()) {
            search_item.name = series_name;
        }

        for scraper in &pass.scrapers {
            match self.match_season(scraper.as_ref(), &search_item).await {
                Ok(Some(media_id)) => {
                    tracing::info!(
                        "[{}] Matched {}-{} season_number={:?} -> {}={}",
                        scraper.name(),
                        search_item.name,
                        season.name,
                        season.index_number,
                        scraper.provider_id(),
                        media_id
                    );
                    season.set_provider_id(scraper.provider_id(), media_id);
                    return vec![season];
                }
                Ok(None) => continue,
                Err(e) => {
                    if stop_on(scraper.as_ref(), &season, &e) {
                        break;
                    }
                }
            }
        }
        Vec::new()
    }

    async fn match_season(
        &self,
        scraper: &dyn Scraper,
        search_item: &MediaItem,
    ) -> Result<Option<String>, ReconcileError> {
        let Some(media_id) = scraper.search_media_id(search_item).await? else {
            tracing::info!(
                "[{}] No match for {} ({:?})",
                scraper.name(),
                search_item.name,
                search_item.production_year
            );
            return Ok(None);
        };

        if scraper.get_media(search_item, &media_id).await?.is_none() {
            tracing::info!(
                "[{}] Matched {} but got no media info for id {}",
                scraper.name(),
                search_item.name,
                media_id
            );
            return Ok(None);
        }
        Ok(Some(media_id))
    }

    /// Bind every local episode of a matched season and download its danmaku.
    async fn season_update(&self, pass: &Pass, season: MediaItem) -> Vec<MediaItem> {
        let episodes = match self.existing_episodes(&season).await {
            Ok(episodes) => episodes,
            Err(e) => {
                tracing::error!("Failed to list episodes of {}: {}", season.name, e);
                return Vec::new();
            }
        };
        if episodes.is_empty() {
            tracing::debug!("Season {} has no local episodes yet", season.name);
            return Vec::new();
        }

        for scraper in &pass.scrapers {
            let Some(media_id) = season.provider_id(scraper.provider_id()) else {
                continue;
            };
            match self
                .bind_season(pass, scraper.as_ref(), &season, media_id, &episodes)
                .await
            {
                Ok(updates) => return updates,
                Err(e) => {
                    if stop_on(scraper.as_ref(), &season, &e) {
                        break;
                    }
                }
            }
        }
        Vec::new()
    }

    async fn bind_season(
        &self,
        pass: &Pass,
        scraper: &dyn Scraper,
        season: &MediaItem,
        media_id: &str,
        episodes: &[MediaItem],
    ) -> Result<Vec<MediaItem>, ReconcileError> {
        let Some(media) = scraper.get_media(season, media_id).await? else {
            tracing::info!("[{}] No media info for {} (id={})", scraper.name(), season.name, media_id);
            return Ok(Vec::new());
        };

        if !episode_count_matches(pass, scraper, season, &media, episodes.len()) {
            return Ok(Vec::new());
        }

        let mut updates = Vec::new();
        for episode in episodes {
            let Some(remote) = remote_episode(scraper, season, &media, episode) else {
                continue;
            };
            match self.bind_episode(pass, scraper, episode, remote).await {
                Ok(Some(updated)) => updates.push(updated),
                Ok(None) => {}
                Err(e) => {
                    // Keep what was bound so far
                    log_download_error(scraper, episode, &e);
                    break;
                }
            }
        }
        Ok(updates)
    }

    /// Local episodes of a season: no placeholders, no specials or extras
    /// (season number 0 or missing).
    pub(super) async fn existing_episodes(
        &self,
        season: &MediaItem,
    ) -> Result<Vec<MediaItem>, CatalogError> {
        let episodes: Vec<MediaItem> = self
            .catalog
            .get_episodes(season)
            .await?
            .into_iter()
            .filter(|e| !e.is_virtual)
            .collect();

        let total = episodes.len();
        let episodes: Vec<MediaItem> = episodes
            .into_iter()
            .filter(|e| e.parent_index_number.is_some_and(|n| n > 0))
            .collect();
        if episodes.len() != total {
            tracing::info!(
                "Season {} has {} specials or extras, ignored",
                season.name,
                total - episodes.len()
            );
        }
        Ok(episodes)
    }

    // ------------------------------------------------------------------
    // Episodes
    // ------------------------------------------------------------------

    async fn episode_update(&self, pass: &Pass, item: MediaItem) -> Vec<MediaItem> {
        let has_own_id = pass
            .scrapers
            .iter()
            .any(|s| item.has_provider_id(s.provider_id()));

        // Episodes added after their season was matched have no id yet
        if !has_own_id && item.index_number.is_some() {
            match self.bind_through_season(pass, &item).await {
                Ok(Some(updates)) => return updates,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to bind {} through its season: {}", describe(&item), e);
                    return Vec::new();
                }
            }
        }

        self.refresh_own_id(pass, &item).await;
        Vec::new()
    }

    /// `Ok(None)` when the season gives nothing to bind with, so the caller
    /// falls back to the episode's own id.
    async fn bind_through_season(
        &self,
        pass: &Pass,
        item: &MediaItem,
    ) -> Result<Option<Vec<MediaItem>>, ReconcileError> {
        let Some(season_id) = item.season_id.as_deref() else {
            return Ok(None);
        };
        let Some(season) = self.catalog.get_item_by_id(season_id).await? else {
            return Ok(None);
        };
        let Some((scraper, media_id)) = pass.scrapers.iter().find_map(|s| {
            season
                .provider_id(s.provider_id())
                .map(|id| (s.as_ref(), id.to_string()))
        }) else {
            return Ok(None);
        };

        let Some(media) = scraper.get_media(&season, &media_id).await? else {
            return Ok(None);
        };

        let Some(remote) = remote_episode(scraper, &season, &media, item) else {
            return Ok(Some(Vec::new()));
        };

        let episodes = self.existing_episodes(&season).await?;
        if !episode_count_matches(pass, scraper, &season, &media, episodes.len()) {
            return Ok(Some(Vec::new()));
        }

        let updated = self.bind_episode(pass, scraper, item, remote).await?;
        Ok(Some(updated.into_iter().collect()))
    }

    /// Store the remote episode id on `episode` and download its track.
    ///
    /// Returns the episode when its id changed. Download failures other than
    /// rate limiting are logged here.
    async fn bind_episode(
        &self,
        pass: &Pass,
        scraper: &dyn Scraper,
        episode: &MediaItem,
        remote: &EpisodeInfo,
    ) -> Result<Option<MediaItem>, DownloadError> {
        tracing::info!(
            "[{}] Matched {} -> episode_id={} comment_id={}",
            scraper.name(),
            describe(episode),
            remote.id,
            remote.comment_id
        );

        let mut episode = episode.clone();
        let changed =
            !remote.id.is_empty() && episode.set_provider_id(scraper.provider_id(), remote.id.as_str());

        match self
            .download(pass, scraper, &episode, &remote.comment_id, false)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => log_download_error(scraper, &episode, &e),
        }

        Ok(changed.then_some(episode))
    }

    // ------------------------------------------------------------------
    // Shared
    // ------------------------------------------------------------------

    pub(super) async fn download(
        &self,
        pass: &Pass,
        scraper: &dyn Scraper,
        item: &MediaItem,
        comment_id: &str,
        force: bool,
    ) -> Result<DownloadOutcome, DownloadError> {
        let ass = pass.ass_options(item);
        self.downloader
            .download(scraper, item, comment_id, ass.as_ref(), force)
            .await
    }

    /// Write queued provider ids back to the catalog.
    ///
    /// Runs once per bucket: saving while a season is still being walked
    /// makes the catalog report a partial episode list.
    async fn apply_metadata(&self, queue: Vec<MediaItem>) {
        if queue.is_empty() {
            return;
        }

        let total = queue.len();
        let mut saved = 0;
        for queued in queue {
            let mut current = match self.catalog.get_item_by_id(&queued.id).await {
                Ok(Some(current)) => current,
                Ok(None) => {
                    tracing::warn!("{} disappeared from the catalog, ids not saved", queued.name);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Failed to reload {}: {}", queued.name, e);
                    continue;
                }
            };

            for (provider, id) in &queued.provider_ids {
                if !id.is_empty() {
                    current.provider_ids.insert(provider.clone(), id.clone());
                }
            }

            match self.catalog.update_metadata(&current).await {
                Ok(()) => saved += 1,
                Err(e) => tracing::error!("Failed to save provider ids of {}: {}", current.name, e),
            }
        }
        tracing::info!("Saved provider ids of {}/{} items", saved, total);
    }
}

/// Log a scraper failure; true when the caller must stop trying scrapers
/// for this item.
fn stop_on(scraper: &dyn Scraper, item: &MediaItem, error: &ReconcileError) -> bool {
    if error.is_rate_limited() {
        tracing::warn!(
            "[{}] Rate limited by remote source, stop processing {}. Try again later",
            scraper.name(),
            describe(item)
        );
        return true;
    }
    tracing::error!("[{}] Failed to process {}: {}", scraper.name(), describe(item), error);
    false
}

fn log_download_error(scraper: &dyn Scraper, item: &MediaItem, error: &DownloadError) {
    if error.is_rate_limited() {
        tracing::warn!(
            "[{}] Rate limited while downloading danmu of {}",
            scraper.name(),
            describe(item)
        );
    } else {
        tracing::error!(
            "[{}] Failed to download danmu of {}: {}",
            scraper.name(),
            describe(item),
            error
        );
    }
}

fn episode_count_matches(
    pass: &Pass,
    scraper: &dyn Scraper,
    season: &MediaItem,
    media: &MediaInfo,
    local: usize,
) -> bool {
    if pass.episode_count_same() && media.episode_count() != local {
        tracing::info!(
            "[{}] Episode count mismatch for {}: {} remote, {} local. Season skipped",
            scraper.name(),
            season.name,
            media.episode_count(),
            local
        );
        return false;
    }
    true
}

/// Remote episode bound to a local one by episode number.
fn remote_episode<'a>(
    scraper: &dyn Scraper,
    season: &MediaItem,
    media: &'a MediaInfo,
    episode: &MediaItem,
) -> Option<&'a EpisodeInfo> {
    let index = episode.index_number.unwrap_or(0);
    if index <= 0 {
        tracing::info!(
            "[{}] {} in {} has no episode number",
            scraper.name(),
            episode.name,
            season.name
        );
        return None;
    }
    let remote = media.episode_at(index);
    if remote.is_none() {
        tracing::info!(
            "[{}] Episode {} of {} exceeds the {} remote episodes",
            scraper.name(),
            index,
            season.name,
            media.episode_count()
        );
    }
    remote
}
