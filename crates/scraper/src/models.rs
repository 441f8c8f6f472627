//! Data returned by scrapers

use serde::{Deserialize, Serialize};
#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A remote media record (movie, or one season of a show)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Remote media id, the value stored in the item's provider ids
    pub id: String,
    /// Comment track id of the media itself (movies)
    pub comment_id: String,
    pub name: String,
    pub year: Option<i32>,
    /// Ordered episode list, episode N of the local season binds to index N-1
    pub episodes: Vec<EpisodeInfo>,
}

impl MediaInfo {
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Remote episode bound to local (1-based) episode `index`.
    pub fn episode_at(&self, index: i32) -> Option<&EpisodeInfo> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.episodes.get(position)
    }
}

/// A remote episode record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Remote episode id, the value stored in the episode's provider ids
    pub id: String,
    /// Comment track id used to fetch the danmaku
    pub comment_id: String,
    pub number: Option<i32>,
    pub title: String,
}

/// A candidate shown to the user when searching manually
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SearchInfo {
    /// Remote media or episode id, fed back to a forced download
    pub id: String,
    pub name: String,
    /// Source category, e.g. "TV" or "Movie"
    pub category: String,
    pub year: Option<i32>,
    pub episode_size: usize,
}

/// One entry of the user's scraper order/enable list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ScraperConfigItem {
    /// Scraper name
    pub name: String,
    pub enable: bool,
}

impl ScraperConfigItem {
    pub fn new(name: impl Into<String>, enable: bool) -> Self {
        Self {
            name: name.into(),
            enable,
        }
    }
}
