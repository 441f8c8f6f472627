use std::sync::Arc;
use std::time::Duration;

use domain::LibraryEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::Reconciler;

pub(super) enum LibraryEventsMessage {
    Enqueue(LibraryEvent),
}

/// Owns the pending event list and the debounce deadline.
///
/// Batches are processed on their own task so the actor keeps accepting
/// events meanwhile. Events produced by a batch (seasons of an updated
/// series) come back through `requeue`.
pub(super) struct LibraryEventsActor {
    receiver: mpsc::UnboundedReceiver<LibraryEventsMessage>,
    reconciler: Arc<Reconciler>,
    debounce: Duration,
    pending: Vec<LibraryEvent>,
    deadline: Option<Instant>,
    requeue_tx: mpsc::UnboundedSender<Vec<LibraryEvent>>,
    requeue_rx: mpsc::UnboundedReceiver<Vec<LibraryEvent>>,
}

impl LibraryEventsActor {
    pub(super) fn new(
        receiver: mpsc::UnboundedReceiver<LibraryEventsMessage>,
        reconciler: Arc<Reconciler>,
        debounce: Duration,
    ) -> Self {
        let (requeue_tx, requeue_rx) = mpsc::unbounded_channel();
        Self {
            receiver,
            reconciler,
            debounce,
            pending: Vec::new(),
            deadline: None,
            requeue_tx,
            requeue_rx,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::debug!("Library events actor started");

        loop {
            tokio::select! {
                message = self.receiver.recv() => {
                    match message {
                        Some(LibraryEventsMessage::Enqueue(event)) => self.push(event),
                        None => break,
                    }
                }
                Some(events) = self.requeue_rx.recv() => {
                    for event in events {
                        self.push(event);
                    }
                }
                _ = wait_until(self.deadline) => {
                    self.deadline = None;
                    self.flush();
                }
            }
        }

        tracing::debug!("Library events actor stopped");
    }

    fn push(&mut self, event: LibraryEvent) {
        if self.pending.contains(&event) {
            tracing::debug!(
                "Event already queued, ignoring: {} ({:?})",
                event.item.name,
                event.event_type
            );
            return;
        }

        self.pending.push(event);
        self.deadline = Some(Instant::now() + self.debounce);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            tracing::debug!("No pending events, timer stopped");
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        tracing::debug!("Processing {} queued events", batch.len());

        let reconciler = Arc::clone(&self.reconciler);
        let requeue = self.requeue_tx.clone();
        tokio::spawn(async move {
            let follow_ups = reconciler.process_batch(batch).await;
            if !follow_ups.is_empty() {
                let _ = requeue.send(follow_ups);
            }
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use domain::{EventType, ItemKind, MediaItem};
    use scraper::{Scraper, ScraperManager};

    use crate::models::Settings;
    use crate::services::library_events::mocks::*;
    use crate::services::library_events::{start_library_events, EngineOptions};

    fn movie_with_id(id: &str) -> MediaItem {
        let mut item = MediaItem::new(id, ItemKind::Movie, "Your Name");
        item.set_provider_id("MockID", "100");
        item
    }

    fn start(catalog: &MockCatalog, scraper: &Arc<MockScraper>) -> crate::services::LibraryEventsHandle {
        let scrapers: Vec<Arc<dyn Scraper>> = vec![scraper.clone()];
        start_library_events(
            Arc::new(catalog.clone()),
            Arc::new(ScraperManager::new(scrapers)),
            Arc::new(MockSettingsProvider::new(Settings::default())),
            Arc::new(MockRenderer::new()),
            EngineOptions::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_events_processed_once() {
        let catalog = MockCatalog::new();
        catalog.insert(movie_with_id("m1"));
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_media(media_with_episodes("100", 1));
        let handle = start(&catalog, &scraper);

        handle.enqueue(movie_with_id("m1"), EventType::Update).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.enqueue(movie_with_id("m1"), EventType::Update).await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(scraper.episode_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_events_push_the_deadline_back() {
        let catalog = MockCatalog::new();
        catalog.insert(movie_with_id("m1"));
        catalog.insert(movie_with_id("m2"));
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_media(media_with_episodes("100", 1));
        let handle = start(&catalog, &scraper);

        handle.enqueue(movie_with_id("m1"), EventType::Update).await;
        tokio::time::sleep(Duration::from_secs(8)).await;
        handle.enqueue(movie_with_id("m2"), EventType::Update).await;
        tokio::time::sleep(Duration::from_secs(8)).await;

        // 16s after the first event, 8s after the second
        assert_eq!(scraper.episode_calls(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(scraper.episode_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_series_update_requeues_its_seasons() {
        let catalog = MockCatalog::new();
        let series = MediaItem::new("s", ItemKind::Series, "Frieren");
        let mut season = MediaItem::new("s1", ItemKind::Season, "Season 1");
        season.series_id = Some("s".to_string());
        season.index_number = Some(1);
        season.set_provider_id("MockID", "200");
        let mut episode = MediaItem::new("e1", ItemKind::Episode, "Episode 1");
        episode.season_id = Some("s1".to_string());
        episode.index_number = Some(1);
        episode.parent_index_number = Some(1);
        catalog.insert(series.clone());
        catalog.insert(season);
        catalog.insert(episode);
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_media(media_with_episodes("200", 1));
        let handle = start(&catalog, &scraper);

        handle.enqueue(series, EventType::Update).await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        // The season went back into the queue with a fresh deadline
        assert_eq!(scraper.media_calls(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(scraper.media_calls(), 1);
        assert_eq!(catalog.item("e1").unwrap().provider_id("MockID"), Some("200-e1"));
    }

    #[tokio::test]
    async fn test_force_runs_before_returning() {
        let catalog = MockCatalog::new();
        let mut stored = MediaItem::new("m1", ItemKind::Movie, "Your Name");
        stored.set_provider_id("OtherID", "x");
        catalog.insert(stored);
        let scraper = Arc::new(MockScraper::new("mock", "MockID"));
        scraper.add_media(media_with_episodes("100", 1));
        let handle = start(&catalog, &scraper);

        handle.enqueue(movie_with_id("m1"), EventType::Force).await;

        assert_eq!(scraper.media_calls(), 1);
        assert_eq!(catalog.item("m1").unwrap().provider_id("MockID"), Some("100"));
    }
}
