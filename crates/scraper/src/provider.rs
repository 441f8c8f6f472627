//! Scraper trait definition

use async_trait::async_trait;
use domain::MediaItem;

use crate::{Danmaku, EpisodeInfo, MediaInfo, ScraperError, SearchInfo};

/// Adapter contract for one external danmu source
///
/// `Ok(None)` and empty results are soft misses. Errors are reserved for
/// transport and protocol failures, with [`ScraperError::RateLimited`]
/// telling the caller to stop for the current item.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Display name, also the key in the user's scraper list
    fn name(&self) -> &'static str;

    /// Key under which matched ids are stored in an item's provider ids
    fn provider_id(&self) -> &'static str;

    /// Position among registered scrapers when the user has no preference
    fn default_order(&self) -> i32 {
        999
    }

    /// Whether the scraper runs when absent from the user's scraper list
    fn default_enable(&self) -> bool {
        true
    }

    /// Sources that answer with a near-empty placeholder instead of an error
    /// when a track is unavailable. Tiny payloads from them are discarded.
    fn may_return_stale_payload(&self) -> bool {
        false
    }

    /// Candidates for manual selection
    async fn search(&self, item: &MediaItem) -> Result<Vec<SearchInfo>, ScraperError>;

    /// Best matching remote media id for `item`
    async fn search_media_id(&self, item: &MediaItem) -> Result<Option<String>, ScraperError>;

    /// Media descriptor (with its episode list) for a remote media id
    async fn get_media(
        &self,
        item: &MediaItem,
        id: &str,
    ) -> Result<Option<MediaInfo>, ScraperError>;

    /// Episode descriptor for a remote id. For movies `id` is the media id.
    async fn get_media_episode(
        &self,
        item: &MediaItem,
        id: &str,
    ) -> Result<Option<EpisodeInfo>, ScraperError>;

    /// Danmaku track for a comment id
    async fn get_danmu_content(
        &self,
        item: &MediaItem,
        comment_id: &str,
    ) -> Result<Option<Danmaku>, ScraperError>;
}
