//! Debounced reconciliation of catalog events against danmu scrapers.
//!
//! Events enter through [`LibraryEventsHandle::enqueue`]. Add/Update events
//! are coalesced by an actor task and processed in one batch once no new
//! event has arrived for the debounce delay. Force events skip the queue
//! and run on the caller's task.
//!
//! ```text
//! enqueue ─► actor (pending, deadline) ─► Reconciler::process_batch
//!    │                                        │ classify ─► buckets
//!    └── Force ─► Reconciler::force           ▼
//!                                  scrapers ─► DanmuDownloader ─► disk
//!                                          └─► Catalog::update_metadata
//! ```

mod actor;
mod classify;
mod download;
mod force;
mod handle;
mod processor;
mod traits;

#[cfg(test)]
pub(crate) mod mocks;

use std::sync::Arc;
use std::time::Duration;

use file_cache::{Clock, SystemClock};
use scraper::{ScraperError, ScraperManager};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::catalog::{Catalog, CatalogError};

pub use download::{DanmuDownloader, DownloadError, DownloadOutcome};
pub use handle::LibraryEventsHandle;
pub use processor::Reconciler;
pub use traits::{AssOptions, DanmuRenderer, SettingsProvider};

use actor::LibraryEventsActor;

/// Name under which libraries list this fetcher in `DisabledSubtitleFetchers`.
pub const FETCHER_NAME: &str = "Danmu";

/// Timing and concurrency knobs of the engine
#[derive(Clone)]
pub struct EngineOptions {
    /// Quiet period before a batch is processed
    pub debounce: Duration,
    /// How long an Add waits for the Update that follows a metadata scan
    pub pending_add_ttl: Duration,
    /// Window during which the same track is not downloaded twice
    pub download_ttl: Duration,
    /// Items processed at once within a bucket
    pub concurrency: usize,
    pub clock: Arc<dyn Clock>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(10),
            pending_add_ttl: Duration::from_secs(30 * 60),
            download_ttl: Duration::from_secs(5 * 60),
            concurrency: 4,
            clock: Arc::new(SystemClock),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl ReconcileError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ReconcileError::Scraper(e) => e.is_rate_limited(),
            ReconcileError::Download(e) => e.is_rate_limited(),
            ReconcileError::Catalog(_) => false,
        }
    }
}

/// Build the reconciler and start the debounce actor.
///
/// Must be called from within a tokio runtime.
pub fn start_library_events(
    catalog: Arc<dyn Catalog>,
    scrapers: Arc<ScraperManager>,
    settings: Arc<dyn SettingsProvider>,
    renderer: Arc<dyn DanmuRenderer>,
    options: EngineOptions,
) -> LibraryEventsHandle {
    let reconciler = Arc::new(Reconciler::new(catalog, scrapers, settings, renderer, &options));
    let (sender, receiver) = mpsc::unbounded_channel();

    let actor = LibraryEventsActor::new(receiver, Arc::clone(&reconciler), options.debounce);
    tokio::spawn(actor.run());

    LibraryEventsHandle::new(sender, reconciler)
}
