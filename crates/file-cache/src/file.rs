use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::memory::{MemoryCache, DEFAULT_TTL};

/// Delay between the first unsaved mutation and the file write.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CacheOptions {
    pub default_ttl: Duration,
    pub save_delay: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            save_delay: DEFAULT_SAVE_DELAY,
            clock: Arc::new(SystemClock),
        }
    }
}

enum FlushCommand {
    /// Rearm the debounce timer
    Schedule,
    /// Persist now and acknowledge
    Flush(oneshot::Sender<()>),
}

struct Shared<V> {
    memory: MemoryCache<V>,
    path: PathBuf,
    closed: AtomicBool,
}

impl<V> Shared<V>
where
    V: Clone + Serialize,
{
    /// Write live entries to a temp file next to the target, then rename over it.
    fn persist(&self) -> Result<usize, CacheError> {
        self.memory.purge_expired();
        let snapshot = self.memory.snapshot();
        let json = serde_json::to_vec(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CacheError::io("Failed to create directory", parent, e))?;
            }
        }

        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json).map_err(|e| CacheError::io("Failed to write", &tmp, e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| CacheError::io("Failed to rename", &self.path, e))?;

        Ok(snapshot.len())
    }

    fn persist_logged(&self) {
        match self.persist() {
            Ok(count) => {
                tracing::debug!("[file_cache] Saved {} entries to {}", count, self.path.display())
            }
            Err(e) => tracing::error!("[file_cache] Failed to save cache: {}", e),
        }
    }
}

/// A [`MemoryCache`] mirrored to a JSON file.
///
/// The file is read once when the cache is opened. Every mutation pushes the
/// pending save back to `save_delay` from now, so a burst of writes ends in a
/// single save. [`FileCache::shutdown`] performs a final synchronous save.
///
/// Must be created from within a tokio runtime, since the debounced flusher
/// runs as a spawned task.
pub struct FileCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    shared: Arc<Shared<V>>,
    sender: mpsc::UnboundedSender<FlushCommand>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl<V> FileCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CacheOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: CacheOptions) -> Self {
        let path = path.into();
        let memory = MemoryCache::with_clock(options.default_ttl, options.clock);

        match read_entries::<V>(&path) {
            Ok(Some(entries)) => {
                let loaded = memory.load(entries);
                tracing::info!("[file_cache] Loaded {} entries from {}", loaded, path.display());
            }
            Ok(None) => {
                tracing::debug!("[file_cache] No cache file at {}, starting empty", path.display())
            }
            Err(e) => {
                tracing::warn!("[file_cache] Ignoring unreadable cache file: {}", e)
            }
        }

        let shared = Arc::new(Shared {
            memory,
            path,
            closed: AtomicBool::new(false),
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let flusher = tokio::spawn(run_flusher(shared.clone(), receiver, options.save_delay));

        Self {
            shared,
            sender,
            flusher: Mutex::new(Some(flusher)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Look up a live entry. An expired hit is purged and schedules a save.
    pub fn get(&self, key: &str) -> Option<V> {
        let (value, purged) = self.shared.memory.lookup(key);
        if purged {
            self.schedule_save();
        }
        value
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        self.shared.memory.set(key, value, ttl);
        self.schedule_save();
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.shared.memory.remove(key);
        if removed {
            self.schedule_save();
        }
        removed
    }

    pub fn clear(&self) {
        self.shared.memory.clear();
        self.schedule_save();
    }

    pub fn count(&self) -> usize {
        self.shared.memory.count()
    }

    /// Save immediately, without waiting for the debounce timer.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(FlushCommand::Flush(tx)).is_err() || rx.await.is_err() {
            // Flusher already gone, save inline
            self.shared.persist_logged();
        }
    }

    /// Stop the flusher and write the current contents synchronously.
    ///
    /// Calling it more than once is harmless.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.flusher.lock().take() {
            handle.abort();
        }
        self.shared.persist_logged();
        tracing::info!("[file_cache] Cache at {} shut down", self.shared.path.display());
    }

    fn schedule_save(&self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.sender.send(FlushCommand::Schedule);
    }
}

impl<V> Drop for FileCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_flusher<V>(
    shared: Arc<Shared<V>>,
    mut receiver: mpsc::UnboundedReceiver<FlushCommand>,
    save_delay: Duration,
) where
    V: Clone + Serialize + Send + Sync + 'static,
{
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = receiver.recv() => {
                match command {
                    Some(FlushCommand::Schedule) => {
                        deadline = Some(Instant::now() + save_delay);
                    }
                    Some(FlushCommand::Flush(ack)) => {
                        deadline = None;
                        shared.persist_logged();
                        let _ = ack.send(());
                    }
                    None => break,
                }
            }
            _ = wait_until(deadline) => {
                deadline = None;
                shared.persist_logged();
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn read_entries<V: DeserializeOwned>(
    path: &Path,
) -> Result<Option<HashMap<String, CacheEntry<V>>>, CacheError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io("Failed to read", path, e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use tempfile::TempDir;

    fn entries_on_disk(path: &Path) -> HashMap<String, CacheEntry<String>> {
        read_entries(path).unwrap().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let cache: FileCache<String> = FileCache::open(dir.path().join("cache.json"));

        assert_eq!(cache.count(), 0);
        assert_eq!(cache.get("anything"), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let cache: FileCache<String> = FileCache::open(&path);

        assert_eq!(cache.count(), 0);
        cache.set("k", "v".to_string(), None);
        assert_eq!(cache.get("K"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_flush_then_reopen_keeps_live_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        {
            let cache: FileCache<String> = FileCache::open(&path);
            cache.set("Bangumi_1", "one".to_string(), None);
            cache.set("bangumi_2", "two".to_string(), None);
            cache.flush().await;
        }

        let cache: FileCache<String> = FileCache::open(&path);
        assert_eq!(cache.count(), 2);
        assert_eq!(cache.get("BANGUMI_1"), Some("one".to_string()));
    }

    #[tokio::test]
    async fn test_expired_entries_discarded_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let clock = ManualClock::default();
        let options = CacheOptions {
            clock: Arc::new(clock.clone()),
            ..Default::default()
        };

        {
            let cache: FileCache<String> = FileCache::with_options(&path, options.clone());
            cache.set("short", "1".to_string(), Some(Duration::from_secs(1)));
            cache.set("long", "2".to_string(), Some(Duration::from_secs(3600)));
            cache.shutdown();
        }

        clock.advance(Duration::from_secs(2));

        let cache: FileCache<String> = FileCache::with_options(&path, options);
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_expired_hit_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::default();
        let cache: FileCache<String> = FileCache::with_options(
            dir.path().join("cache.json"),
            CacheOptions {
                clock: Arc::new(clock.clone()),
                ..Default::default()
            },
        );

        cache.set("k", "v".to_string(), Some(Duration::from_secs(1)));
        clock.advance(Duration::from_millis(1100));

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_are_debounced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache: FileCache<String> = FileCache::open(&path);

        cache.set("a", "1".to_string(), None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        cache.set("b", "2".to_string(), None);
        tokio::time::sleep(Duration::from_secs(3)).await;

        // The second write pushed the save back to the 13 second mark
        assert!(!path.exists());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_secs(3)).await;

        // One save covers both writes
        let on_disk = entries_on_disk(&path);
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.contains_key("a"));
        assert!(on_disk.contains_key("b"));
    }

    #[tokio::test]
    async fn test_shutdown_persists_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let cache: FileCache<String> = FileCache::open(&path);

        cache.set("k", "v".to_string(), None);
        cache.shutdown();
        cache.shutdown();

        let on_disk = entries_on_disk(&path);
        assert_eq!(on_disk.get("k").map(|e| e.value.as_str()), Some("v"));
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let dir = TempDir::new().unwrap();
        let cache: FileCache<String> = FileCache::open(dir.path().join("cache.json"));

        cache.set("k", "v".to_string(), None);

        assert!(cache.remove("K"));
        assert!(!cache.remove("k"));
    }

    #[tokio::test]
    async fn test_clear_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache: FileCache<String> = FileCache::open(&path);

        cache.set("k", "v".to_string(), None);
        cache.flush().await;
        cache.clear();
        cache.flush().await;

        assert!(entries_on_disk(&path).is_empty());
    }
}
