//! Media catalog abstraction.
//!
//! The reconciliation engine only talks to the catalog through [`Catalog`],
//! so tests can swap in an in-memory implementation. [`EmbyCatalog`] talks to
//! an Emby server over its REST API.

mod emby;
mod error;
mod models;

use async_trait::async_trait;
use domain::MediaItem;

pub use emby::EmbyCatalog;
pub use error::CatalogError;
pub use models::{EmbyItem, EmbyWebhook};

/// Per-library options relevant to danmu fetching
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryOptions {
    /// Subtitle fetchers switched off for the library
    pub disabled_subtitle_fetchers: Vec<String>,
}

impl LibraryOptions {
    pub fn is_fetcher_disabled(&self, fetcher: &str) -> bool {
        self.disabled_subtitle_fetchers
            .iter()
            .any(|f| f.eq_ignore_ascii_case(fetcher))
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_item_by_id(&self, id: &str) -> Result<Option<MediaItem>, CatalogError>;

    /// Items whose file or folder path equals `path`
    async fn get_items_by_path(&self, path: &str) -> Result<Vec<MediaItem>, CatalogError>;

    /// Options of the library containing `item`
    async fn get_library_options(&self, item: &MediaItem) -> Result<LibraryOptions, CatalogError>;

    /// Persist the item's provider ids
    async fn update_metadata(&self, item: &MediaItem) -> Result<(), CatalogError>;

    async fn get_seasons(&self, series: &MediaItem) -> Result<Vec<MediaItem>, CatalogError>;

    /// Every episode of a season, virtual ones included
    async fn get_episodes(&self, season: &MediaItem) -> Result<Vec<MediaItem>, CatalogError>;
}
