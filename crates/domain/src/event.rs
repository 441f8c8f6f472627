//! Catalog change notifications.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::item::MediaItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EventType {
    /// Item newly added to the catalog
    Add,
    /// Item metadata edited
    Update,
    /// Explicit user request to bind a given remote id right now
    Force,
}

/// A change notification for one catalog item.
///
/// Two events are equal when they concern the same item id with the same
/// event type. The item snapshot itself is not compared.
#[derive(Debug, Clone)]
pub struct LibraryEvent {
    pub item: MediaItem,
    pub event_type: EventType,
}

impl LibraryEvent {
    pub fn new(item: MediaItem, event_type: EventType) -> Self {
        Self { item, event_type }
    }

    pub fn item_id(&self) -> &str {
        &self.item.id
    }
}

impl PartialEq for LibraryEvent {
    fn eq(&self, other: &Self) -> bool {
        self.item.id == other.item.id && self.event_type == other.event_type
    }
}

impl Eq for LibraryEvent {}

impl Hash for LibraryEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.id.hash(state);
        self.event_type.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn test_equality_ignores_item_snapshot() {
        let before = MediaItem::new("42", ItemKind::Episode, "Episode 1");
        let mut after = before.clone();
        after.name = "The Journey's End".to_string();

        assert_eq!(
            LibraryEvent::new(before.clone(), EventType::Update),
            LibraryEvent::new(after, EventType::Update)
        );
        assert_ne!(
            LibraryEvent::new(before.clone(), EventType::Add),
            LibraryEvent::new(before, EventType::Update)
        );
    }
}
