//! Domain model for the danmu reconciliation service.
//!
//! Everything here is plain data shared by the scrapers, the reconciliation
//! engine and the HTTP layer:
//!
//! - **Item**: a catalog entry (movie, series, season or episode) together
//!   with the provider ids bound to it
//! - **Event**: a change notification coming from the catalog
//!
//! This crate has no I/O and should not depend on infrastructure crates.

pub mod event;
pub mod item;

pub use event::{EventType, LibraryEvent};
pub use item::{ItemKind, MediaItem, ParseItemKindError, ProviderIds};
