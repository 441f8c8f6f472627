use std::sync::Arc;

use domain::{EventType, LibraryEvent, MediaItem};
use tokio::sync::mpsc;

use super::actor::LibraryEventsMessage;
use super::download::describe;
use super::Reconciler;

/// Entry point of the reconciliation engine.
///
/// Cheap to clone. Add and Update events are handed to the debounce actor
/// and return immediately; Force events are processed before returning.
#[derive(Clone)]
pub struct LibraryEventsHandle {
    sender: mpsc::UnboundedSender<LibraryEventsMessage>,
    reconciler: Arc<Reconciler>,
}

impl LibraryEventsHandle {
    pub(super) fn new(
        sender: mpsc::UnboundedSender<LibraryEventsMessage>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self { sender, reconciler }
    }

    pub async fn enqueue(&self, item: MediaItem, event_type: EventType) {
        if event_type == EventType::Force {
            tracing::info!("Processing forced download of {} ({})", describe(&item), item.id);
            match self.reconciler.force(item).await {
                Ok(()) => {}
                Err(e) => tracing::error!("Forced download failed: {}", e),
            }
            return;
        }

        let event = LibraryEvent::new(item, event_type);
        if self.sender.send(LibraryEventsMessage::Enqueue(event)).is_err() {
            tracing::error!("Library events actor has stopped, event dropped");
        }
    }
}
