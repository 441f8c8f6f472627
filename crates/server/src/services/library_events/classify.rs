use domain::{EventType, ItemKind, LibraryEvent, MediaItem};

use super::{Reconciler, FETCHER_NAME};

/// One batch split by item kind and event type.
///
/// Add buckets only hold items whose Add was followed by an Update: the
/// catalog emits the Add before metadata is scanned, and the scan ends with
/// an Update that carries the final name and year.
#[derive(Debug, Default)]
pub(super) struct Buckets {
    pub movie_add: Vec<MediaItem>,
    pub movie_update: Vec<MediaItem>,
    pub series_add: Vec<MediaItem>,
    pub season_add: Vec<MediaItem>,
    pub episode_add: Vec<MediaItem>,
    pub series_update: Vec<MediaItem>,
    pub season_update: Vec<MediaItem>,
    pub episode_update: Vec<MediaItem>,
    pub force: Vec<MediaItem>,
}

impl Buckets {
    /// Buckets in processing order.
    pub fn into_ordered(self) -> Vec<(ItemKind, EventType, Vec<MediaItem>)> {
        vec![
            (ItemKind::Movie, EventType::Add, self.movie_add),
            (ItemKind::Movie, EventType::Update, self.movie_update),
            (ItemKind::Series, EventType::Add, self.series_add),
            (ItemKind::Season, EventType::Add, self.season_add),
            (ItemKind::Episode, EventType::Add, self.episode_add),
            (ItemKind::Series, EventType::Update, self.series_update),
            (ItemKind::Season, EventType::Update, self.season_update),
            (ItemKind::Episode, EventType::Update, self.episode_update),
        ]
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.movie_add.is_empty()
            && self.movie_update.is_empty()
            && self.series_add.is_empty()
            && self.season_add.is_empty()
            && self.episode_add.is_empty()
            && self.series_update.is_empty()
            && self.season_update.is_empty()
            && self.episode_update.is_empty()
            && self.force.is_empty()
    }
}

impl Reconciler {
    pub(super) async fn classify(&self, events: Vec<LibraryEvent>) -> Buckets {
        let mut buckets = Buckets::default();

        for event in events {
            if event.item.name.is_empty() || self.is_library_disabled(&event.item).await {
                continue;
            }

            let LibraryEvent { item, event_type } = event;
            match (item.kind, event_type) {
                (ItemKind::Series, EventType::Add) => {
                    tracing::info!("Series add: {}", item.name);
                    buckets.series_add.push(item);
                }
                (ItemKind::Series, EventType::Update) => {
                    tracing::info!("Series update: {}", item.name);
                    buckets.series_update.push(item);
                }
                (kind, EventType::Add) => {
                    tracing::info!("{} add: {}", kind, item.name);
                    let id = item.id.clone();
                    self.pending_adds.set(&id, item, None);
                }
                (kind, EventType::Update) => {
                    tracing::info!("{} update: {}", kind, item.name);
                    let was_pending = self.pending_adds.get(&item.id).is_some();
                    if was_pending {
                        self.pending_adds.remove(&item.id);
                    }
                    let bucket = match (kind, was_pending) {
                        (ItemKind::Movie, true) => &mut buckets.movie_add,
                        (ItemKind::Movie, false) => &mut buckets.movie_update,
                        (ItemKind::Season, true) => &mut buckets.season_add,
                        (ItemKind::Season, false) => &mut buckets.season_update,
                        (_, true) => &mut buckets.episode_add,
                        (_, false) => &mut buckets.episode_update,
                    };
                    if !bucket.iter().any(|queued| queued.id == item.id) {
                        bucket.push(item);
                    }
                }
                (kind, EventType::Force) => {
                    tracing::info!("{} force: {}", kind, item.name);
                    buckets.force.push(item);
                }
            }
        }

        buckets
    }

    /// Whether the library holding `item` switched this fetcher off.
    pub(super) async fn is_library_disabled(&self, item: &MediaItem) -> bool {
        match self.catalog.get_library_options(item).await {
            Ok(options) if options.is_fetcher_disabled(FETCHER_NAME) => {
                tracing::info!("Danmu is disabled for the library of {}, ignoring", item.name);
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!("Failed to read library options of {}: {}", item.name, e);
                false
            }
        }
    }
}
