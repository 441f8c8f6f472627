use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use domain::MediaItem;
use file_cache::{Clock, MemoryCache};
use scraper::{Scraper, ScraperError};
use thiserror::Error;

use super::traits::{AssOptions, DanmuRenderer};

/// Payloads below this size from a scraper flagged with
/// `may_return_stale_payload` are placeholders for removed tracks.
const STALE_PAYLOAD_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render ASS: {0}")]
    Render(String),
}

impl DownloadError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DownloadError::Scraper(e) if e.is_rate_limited())
    }
}

/// What a download attempt ended with
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// Same item and track fetched moments ago
    Recent,
    /// Scraper has no track for the comment id
    Missing,
    /// Track exists but holds no comments
    Empty,
    /// Tiny payload from a source known to serve placeholders
    Stale { bytes: usize },
    /// Item has no file to put the track next to
    NoTarget,
    Saved { paths: Vec<PathBuf> },
}

/// Fetches danmaku tracks and writes them next to the media file.
///
/// Every `(item, comment id)` pair is remembered for a short while so the
/// bursts of update events a catalog emits do not refetch the same track.
pub struct DanmuDownloader {
    recent: MemoryCache<bool>,
    renderer: Arc<dyn DanmuRenderer>,
}

impl DanmuDownloader {
    pub fn new(renderer: Arc<dyn DanmuRenderer>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            recent: MemoryCache::with_clock(ttl, clock),
            renderer,
        }
    }

    /// Download the track `comment_id` for `item`.
    ///
    /// `force` bypasses the recent-download check. `ass` requests an
    /// additional `.danmu.ass` rendering.
    pub async fn download(
        &self,
        scraper: &dyn Scraper,
        item: &MediaItem,
        comment_id: &str,
        ass: Option<&AssOptions>,
        force: bool,
    ) -> Result<DownloadOutcome, DownloadError> {
        let key = format!("{}_{}", item.id, comment_id);

        if force {
            self.recent.set(&key, true, None);
        } else if !self.recent.set_if_absent(&key, true, None) {
            tracing::info!(
                "[{}] Danmu of {} was downloaded within the last minutes, skipping",
                scraper.name(),
                describe(item)
            );
            return Ok(DownloadOutcome::Recent);
        }

        match self.fetch_and_save(scraper, item, comment_id, ass).await {
            Ok(DownloadOutcome::Missing) => {
                self.recent.remove(&key);
                Ok(DownloadOutcome::Missing)
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.recent.remove(&key);
                Err(e)
            }
        }
    }

    /// Forget pairs whose memo expired, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.recent.purge_expired()
    }

    async fn fetch_and_save(
        &self,
        scraper: &dyn Scraper,
        item: &MediaItem,
        comment_id: &str,
        ass: Option<&AssOptions>,
    ) -> Result<DownloadOutcome, DownloadError> {
        let Some(danmaku) = scraper.get_danmu_content(item, comment_id).await? else {
            tracing::info!(
                "[{}] No danmu found for {} (comment_id={})",
                scraper.name(),
                describe(item),
                comment_id
            );
            return Ok(DownloadOutcome::Missing);
        };

        if danmaku.is_empty() {
            tracing::info!("[{}] Danmu of {} is empty, skipping", scraper.name(), describe(item));
            return Ok(DownloadOutcome::Empty);
        }

        let xml = danmaku.to_xml()?;
        if scraper.may_return_stale_payload() && xml.len() < STALE_PAYLOAD_BYTES {
            tracing::info!(
                "[{}] Danmu of {} is only {} bytes, probably a removed video, skipping",
                scraper.name(),
                describe(item),
                xml.len()
            );
            return Ok(DownloadOutcome::Stale { bytes: xml.len() });
        }

        let Some(xml_path) = item.danmu_xml_path() else {
            tracing::warn!("[{}] {} has no media path, nothing written", scraper.name(), describe(item));
            return Ok(DownloadOutcome::NoTarget);
        };

        write_file(&xml_path, &xml).await?;
        let mut paths = vec![xml_path];

        if let (Some(options), Some(ass_path)) = (ass, item.danmu_ass_path()) {
            let script = self.renderer.render(&danmaku, options)?;
            write_file(&ass_path, script.as_bytes()).await?;
            paths.push(ass_path);
        }

        tracing::info!(
            "[{}] Danmu downloaded: {} comment_id={} ({} comments) -> {}",
            scraper.name(),
            describe(item),
            comment_id,
            danmaku.items.len(),
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(DownloadOutcome::Saved { paths })
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| DownloadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// `3.Episode name` for episodes, the plain name otherwise.
pub(crate) fn describe(item: &MediaItem) -> String {
    match item.index_number {
        Some(index) if item.kind == domain::ItemKind::Episode => format!("{}.{}", index, item.name),
        _ => item.name.clone(),
    }
}
