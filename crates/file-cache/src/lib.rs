//! Key/value cache with per-entry expiration.
//!
//! This crate provides:
//! 1. [`MemoryCache`], a case-insensitive in-process map whose entries expire
//!    after a time-to-live
//! 2. [`FileCache`], the same map mirrored to a JSON file on disk. Mutations
//!    arm a debounced flush so bursts of writes cost a single file write.
//!
//! # Example
//!
//! ```ignore
//! use file_cache::FileCache;
//!
//! let cache: FileCache<String> = FileCache::open(data_dir.join("danmu.cache.json"));
//! cache.set("bangumi_123", body, None);
//!
//! if let Some(body) = cache.get("BANGUMI_123") {
//!     // keys are case-insensitive
//! }
//!
//! // Final synchronous flush before exit
//! cache.shutdown();
//! ```

mod clock;
mod entry;
mod error;
mod file;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use file::{CacheOptions, FileCache, DEFAULT_SAVE_DELAY};
pub use memory::{MemoryCache, DEFAULT_TTL};
