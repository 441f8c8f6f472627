//! Client and scraper for dandanplay-compatible danmu API servers.
//!
//! The server base URL and filters live in [`SharedOptions`] so settings
//! edits take effect without rebuilding the client.

mod bangumi;
mod client;
mod comment;
mod error;
pub mod models;
mod provider;
mod search;

pub use client::{DanmuApiClient, DanmuApiOptions, SharedOptions};
pub use error::DanmuApiError;
pub use models::{
    Anime, Bangumi, BangumiResponse, Comment, CommentResponse, Episode, EpisodeGroup,
    SearchAnimeResponse,
};
pub use provider::DanmuApiScraper;

pub type Result<T> = std::result::Result<T, DanmuApiError>;
