use std::sync::Arc;

use domain::{ItemKind, MediaItem};
use scraper::Scraper;

use super::download::describe;
use super::processor::Pass;
use super::{ReconcileError, Reconciler};

impl Reconciler {
    /// Bind an item to the remote id carried by `temp` and redownload now.
    ///
    /// `temp` holds the item id and a single provider id. No search and no
    /// episode count check: the caller picked the remote media. Ids of every
    /// other scraper are dropped from the item.
    pub async fn force(&self, temp: MediaItem) -> Result<(), ReconcileError> {
        let pass = self.pass();
        let Some((scraper, media_id)) = pass.scrapers.iter().find_map(|s| {
            temp.provider_id(s.provider_id())
                .map(|id| (Arc::clone(s), id.to_string()))
        }) else {
            tracing::warn!("No enabled scraper matches the ids given for {}", temp.id);
            return Ok(());
        };

        let Some(item) = self.catalog.get_item_by_id(&temp.id).await? else {
            tracing::warn!("Item {} not found in the catalog", temp.id);
            return Ok(());
        };

        match item.kind {
            ItemKind::Movie => self.force_movie(&pass, scraper.as_ref(), item, &media_id).await,
            ItemKind::Season | ItemKind::Episode => {
                self.force_season(&pass, scraper.as_ref(), item, &media_id)
                    .await
            }
            ItemKind::Series => {
                tracing::info!("Forced download needs a season or an episode, got series {}", item.name);
                Ok(())
            }
        }
    }

    async fn force_movie(
        &self,
        pass: &Pass,
        scraper: &dyn Scraper,
        item: MediaItem,
        media_id: &str,
    ) -> Result<(), ReconcileError> {
        let Some(media) = scraper.get_media(&item, media_id).await? else {
            tracing::info!("[{}] No media info for id {}", scraper.name(), media_id);
            return Ok(());
        };

        let item = self.force_save(item, scraper, &media.id).await?;

        let Some(episode) = scraper.get_media_episode(&item, &media.id).await? else {
            tracing::info!("[{}] No episode info for {} (id={})", scraper.name(), item.name, media.id);
            return Ok(());
        };
        let outcome = self
            .download(pass, scraper, &item, &episode.comment_id, true)
            .await?;
        tracing::info!("[{}] Forced download of {}: {:?}", scraper.name(), item.name, outcome);
        Ok(())
    }

    async fn force_season(
        &self,
        pass: &Pass,
        scraper: &dyn Scraper,
        item: MediaItem,
        media_id: &str,
    ) -> Result<(), ReconcileError> {
        let season = match item.kind {
            ItemKind::Season => item,
            _ => {
                let Some(season_id) = item.season_id.as_deref() else {
                    tracing::warn!("{} has no season, forced download skipped", describe(&item));
                    return Ok(());
                };
                let Some(season) = self.catalog.get_item_by_id(season_id).await? else {
                    tracing::warn!("Season {} of {} not found", season_id, describe(&item));
                    return Ok(());
                };
                season
            }
        };

        let Some(media) = scraper.get_media(&season, media_id).await? else {
            tracing::info!("[{}] No media info for id {}", scraper.name(), media_id);
            return Ok(());
        };

        let season = self.force_save(season, scraper, media_id).await?;

        let count = media.episode_count();
        for episode in self.catalog.get_episodes(&season).await? {
            let index = episode.index_number.unwrap_or(0);
            if index < 1 || index as usize > count {
                continue;
            }
            if !episode.parent_index_number.is_some_and(|n| n > 0) {
                continue;
            }
            let Some(remote) = media.episode_at(index) else {
                continue;
            };

            self.download(pass, scraper, &episode, &remote.comment_id, true)
                .await?;
            self.force_save(episode, scraper, &remote.id).await?;
        }

        tracing::info!("[{}] Forced download of {} done", scraper.name(), season.name);
        Ok(())
    }

    /// Replace every scraper id on `item` with `id` and save immediately.
    async fn force_save(
        &self,
        mut item: MediaItem,
        scraper: &dyn Scraper,
        id: &str,
    ) -> Result<MediaItem, ReconcileError> {
        for known in self.scrapers.all_with_disabled() {
            item.remove_provider_id(known.provider_id());
        }
        item.set_provider_id(scraper.provider_id(), id);

        self.catalog.update_metadata(&item).await?;
        tracing::info!(
            "[{}] Saved {}={} on {}",
            scraper.name(),
            scraper.provider_id(),
            id,
            describe(&item)
        );
        Ok(item)
    }
}
