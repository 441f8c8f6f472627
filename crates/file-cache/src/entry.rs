use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached value and the instant it stops being visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry<V> {
    pub value: V,
    pub expiration: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, expiration: DateTime<Utc>) -> Self {
        Self { value, expiration }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }
}
