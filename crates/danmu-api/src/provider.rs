//! `Scraper` implementation backed by a danmu API server

use std::sync::Arc;

use async_trait::async_trait;
use domain::{ItemKind, MediaItem};
use file_cache::FileCache;
use scraper::{
    Danmaku, DanmakuComment, EpisodeInfo, MediaInfo, Scraper, ScraperError, SearchInfo,
};

use crate::client::DanmuApiClient;
use crate::error::DanmuApiError;
use crate::models::{Anime, Bangumi, Comment, Episode};

const NAME: &str = "danmu_api";
const PROVIDER_ID: &str = "DanmuApiID";

pub struct DanmuApiScraper {
    client: Arc<DanmuApiClient>,
    cache: Arc<FileCache<serde_json::Value>>,
}

impl DanmuApiScraper {
    pub fn new(client: Arc<DanmuApiClient>, cache: Arc<FileCache<serde_json::Value>>) -> Self {
        Self { client, cache }
    }

    async fn search_animes(&self, item: &MediaItem) -> Result<Vec<Anime>, ScraperError> {
        if !self.client.is_configured() {
            tracing::debug!("[{}] Server URL not configured, skipping search", NAME);
            return Ok(Vec::new());
        }

        let keyword = item.search_name();
        let response = self.client.search_anime(keyword).await.map_err(into_scraper_error)?;
        if !response.success {
            tracing::info!(
                "[{}] Search '{}' failed: {}",
                NAME,
                keyword,
                response.error_message.unwrap_or_default()
            );
            return Ok(Vec::new());
        }

        let allowed_sources = self.client.options().allowed_sources;
        Ok(response
            .animes
            .into_iter()
            .filter(|anime| source_allowed(anime, &allowed_sources))
            .collect())
    }

    /// Anime detail, memoised in the shared file cache.
    async fn bangumi(&self, anime_id: &str) -> Result<Option<Bangumi>, ScraperError> {
        let key = format!("{}_bangumi_{}", NAME, anime_id);
        if let Some(value) = self.cache.get(&key) {
            match serde_json::from_value::<Bangumi>(value) {
                Ok(bangumi) => return Ok(Some(bangumi)),
                Err(e) => tracing::warn!("[{}] Dropping unreadable cache entry {}: {}", NAME, key, e),
            }
        }

        let response = self.client.get_bangumi(anime_id).await.map_err(into_scraper_error)?;
        let bangumi = match response.bangumi {
            Some(bangumi) if response.success => bangumi,
            _ => {
                tracing::info!(
                    "[{}] No bangumi for id={}: {}",
                    NAME,
                    anime_id,
                    response.error_message.unwrap_or_default()
                );
                return Ok(None);
            }
        };

        match serde_json::to_value(&bangumi) {
            Ok(value) => self.cache.set(&key, value, None),
            Err(e) => tracing::warn!("[{}] Failed to cache bangumi {}: {}", NAME, anime_id, e),
        }
        Ok(Some(bangumi))
    }
}

#[async_trait]
impl Scraper for DanmuApiScraper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn default_order(&self) -> i32 {
        1
    }

    // Tracks removed upstream come back as a near-empty placeholder document
    fn may_return_stale_payload(&self) -> bool {
        true
    }

    async fn search(&self, item: &MediaItem) -> Result<Vec<SearchInfo>, ScraperError> {
        let animes = self.search_animes(item).await?;
        Ok(animes
            .into_iter()
            .map(|anime| SearchInfo {
                id: anime.anime_id.to_string(),
                year: anime.year(),
                category: anime.category().to_string(),
                episode_size: anime.episode_count,
                name: anime.anime_title,
            })
            .collect())
    }

    async fn search_media_id(&self, item: &MediaItem) -> Result<Option<String>, ScraperError> {
        let animes = self.search_animes(item).await?;
        let best = pick_best_match(&animes, item.production_year);
        if let Some(anime) = best {
            tracing::info!(
                "[{}] Matched '{}' -> {} ({})",
                NAME,
                item.search_name(),
                anime.anime_title,
                anime.anime_id
            );
        }
        Ok(best.map(|anime| anime.anime_id.to_string()))
    }

    async fn get_media(
        &self,
        _item: &MediaItem,
        id: &str,
    ) -> Result<Option<MediaInfo>, ScraperError> {
        if id.trim().is_empty() || !self.client.is_configured() {
            return Ok(None);
        }

        let Some(bangumi) = self.bangumi(id).await? else {
            return Ok(None);
        };

        let allowed_platforms = self.client.options().allowed_platforms;
        let episodes: Vec<EpisodeInfo> = bangumi
            .filtered_episodes(&allowed_platforms)
            .into_iter()
            .map(to_episode_info)
            .collect();
        if episodes.is_empty() {
            tracing::info!("[{}] No episodes left for id={} after platform filter", NAME, id);
            return Ok(None);
        }

        Ok(Some(MediaInfo {
            id: id.to_string(),
            comment_id: episodes[0].comment_id.clone(),
            name: bangumi.anime_title,
            year: None,
            episodes,
        }))
    }

    async fn get_media_episode(
        &self,
        item: &MediaItem,
        id: &str,
    ) -> Result<Option<EpisodeInfo>, ScraperError> {
        if id.trim().is_empty() {
            return Ok(None);
        }

        // Movies carry the anime id, their only episode holds the comments
        if item.kind == ItemKind::Movie {
            let media = self.get_media(item, id).await?;
            return Ok(media.and_then(|m| m.episodes.into_iter().next()));
        }

        Ok(Some(EpisodeInfo {
            id: id.to_string(),
            comment_id: id.to_string(),
            number: item.index_number,
            title: item.name.clone(),
        }))
    }

    async fn get_danmu_content(
        &self,
        _item: &MediaItem,
        comment_id: &str,
    ) -> Result<Option<Danmaku>, ScraperError> {
        if comment_id.trim().is_empty() || !self.client.is_configured() {
            return Ok(None);
        }

        let response = self
            .client
            .get_comments(comment_id)
            .await
            .map_err(into_scraper_error)?;

        let mut danmaku = Danmaku::new(comment_id);
        danmaku.items = response.comments.iter().map(to_danmaku_comment).collect();
        Ok(Some(danmaku))
    }
}

fn source_allowed(anime: &Anime, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    anime
        .source()
        .is_some_and(|source| allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(source)))
}

/// First result whose year matches `year`, falling back to the first result.
fn pick_best_match(animes: &[Anime], year: Option<i32>) -> Option<&Anime> {
    if let Some(year) = year {
        if let Some(anime) = animes.iter().find(|a| a.year() == Some(year)) {
            return Some(anime);
        }
    }
    animes.first()
}

fn to_episode_info(episode: &Episode) -> EpisodeInfo {
    EpisodeInfo {
        id: episode.episode_id.clone(),
        comment_id: episode.episode_id.clone(),
        number: episode.number(),
        title: episode.episode_title.clone(),
    }
}

fn to_danmaku_comment(comment: &Comment) -> DanmakuComment {
    DanmakuComment {
        progress_ms: comment.progress_ms(),
        mode: comment.mode(),
        font_size: 25,
        color: comment.color(),
        ctime: 0,
        pool: 0,
        mid_hash: comment.user().to_string(),
        id: comment.cid,
        content: comment.m.clone(),
    }
}

fn into_scraper_error(error: DanmuApiError) -> ScraperError {
    match error {
        DanmuApiError::RateLimited => ScraperError::RateLimited { scraper: NAME },
        DanmuApiError::Json { .. } => ScraperError::InvalidResponse {
            scraper: NAME,
            message: error.to_string(),
        },
        other => ScraperError::Request {
            scraper: NAME,
            message: other.to_string(),
        },
    }
}
