//! Danmu scraper abstraction layer
//!
//! Every external danmu source is wrapped in a [`Scraper`]. The
//! [`ScraperManager`] owns the registered scrapers and decides, from the
//! user's configuration, which of them run and in what order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ScraperManager                │
//! │  all(&configs) -> enabled, configured order  │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                 Scraper trait                │
//! │  search_media_id -> get_media -> get_danmu   │
//! └──────────────────────────────────────────────┘
//!              △                    △
//!              │                    │
//!     ┌────────┴────────┐   ┌───────┴───────┐
//!     │ DanmuApiScraper │   │      ...      │
//!     └─────────────────┘   └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use scraper::{ScraperManager, ScraperConfigItem};
//!
//! let manager = ScraperManager::new(vec![Arc::new(danmu_api)]);
//! for scraper in manager.all(&settings.scrapers) {
//!     if let Some(id) = scraper.search_media_id(&item).await? {
//!         // ...
//!     }
//! }
//! ```

mod danmaku;
mod error;
mod manager;
mod models;
mod provider;

pub use danmaku::{Danmaku, DanmakuComment};
pub use error::ScraperError;
pub use manager::ScraperManager;
pub use models::{EpisodeInfo, MediaInfo, ScraperConfigItem, SearchInfo};
pub use provider::Scraper;
