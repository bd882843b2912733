//! # courier-store
//!
//! In-memory content store backed by six debounced JSON documents on disk:
//! standalone items, batch-scoped items, batches, usage statistics,
//! subscriptions and user profiles. The crate exposes a [`ContentStore`]
//! handle that wraps the tables in a `Mutex` and provides typed operations
//! for every domain concern; all reads hand out clones.
//!
//! Persistence is debounced per document: a mutation marks its documents
//! dirty, and a later [`ContentStore::flush_due`] writes any dirty document
//! whose flush interval has elapsed. A crash may lose up to one interval of
//! writes per document, which is the accepted trade-off.

pub mod cache;

mod error;
mod persist;
mod search;
mod stats;
mod store;
mod subscriptions;

pub use error::{Result, StoreError};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use courier_types::{Batch, StoredItem, UsageStats, UserId, UserProfile};

use crate::cache::TtlCache;

/// Default minimum interval between two flushes of the same document.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default time-to-live of the derived-view cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Store configuration. The intervals are overridable for tests only;
/// production wiring uses the defaults.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub flush_interval: Duration,
    pub cache_ttl: Duration,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_dir: data_dir.into(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// The six logical documents, each with its own debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Doc {
    Items,
    BatchItems,
    Batches,
    Stats,
    Subscriptions,
    Profiles,
}

impl Doc {
    pub(crate) const ALL: [Doc; 6] = [
        Doc::Items,
        Doc::BatchItems,
        Doc::Batches,
        Doc::Stats,
        Doc::Subscriptions,
        Doc::Profiles,
    ];

    pub(crate) fn file_name(self) -> &'static str {
        match self {
            Doc::Items => "items.json",
            Doc::BatchItems => "batch_items.json",
            Doc::Batches => "batches.json",
            Doc::Stats => "stats.json",
            Doc::Subscriptions => "subscriptions.json",
            Doc::Profiles => "profiles.json",
        }
    }
}

pub(crate) struct StoreInner {
    pub(crate) items: HashMap<String, StoredItem>,
    pub(crate) batch_items: HashMap<String, StoredItem>,
    pub(crate) batches: HashMap<String, Batch>,
    pub(crate) stats: UsageStats,
    pub(crate) subscriptions: HashMap<String, HashMap<UserId, DateTime<Utc>>>,
    pub(crate) profiles: HashMap<UserId, UserProfile>,
    dirty: HashSet<Doc>,
    last_flush: HashMap<Doc, Instant>,
}

impl StoreInner {
    pub(crate) fn mark_dirty(&mut self, doc: Doc) {
        self.dirty.insert(doc);
    }

    fn serialize_doc(&self, doc: Doc) -> serde_json::Result<String> {
        match doc {
            Doc::Items => serde_json::to_string_pretty(&self.items),
            Doc::BatchItems => serde_json::to_string_pretty(&self.batch_items),
            Doc::Batches => serde_json::to_string_pretty(&self.batches),
            Doc::Stats => serde_json::to_string_pretty(&self.stats),
            Doc::Subscriptions => serde_json::to_string_pretty(&self.subscriptions),
            Doc::Profiles => serde_json::to_string_pretty(&self.profiles),
        }
    }
}

/// Owning handle over all stored state. Cheap to share via `Arc`; every
/// handler receives the same instance.
pub struct ContentStore {
    config: StoreConfig,
    key_seq: AtomicU64,
    inner: Mutex<StoreInner>,
    view_cache: Mutex<TtlCache<String>>,
}

impl ContentStore {
    /// Load all six documents synchronously. The only blocking disk read in
    /// the store's lifetime; everything after goes through debounced writes.
    pub fn open(config: StoreConfig) -> Self {
        let dir = &config.data_dir;
        let inner = StoreInner {
            items: persist::load_document(&dir.join(Doc::Items.file_name())),
            batch_items: persist::load_document(&dir.join(Doc::BatchItems.file_name())),
            batches: persist::load_document(&dir.join(Doc::Batches.file_name())),
            stats: persist::load_document(&dir.join(Doc::Stats.file_name())),
            subscriptions: persist::load_document(&dir.join(Doc::Subscriptions.file_name())),
            profiles: persist::load_document(&dir.join(Doc::Profiles.file_name())),
            dirty: HashSet::new(),
            last_flush: HashMap::new(),
        };
        tracing::info!(
            data_dir = %dir.display(),
            items = inner.items.len(),
            batches = inner.batches.len(),
            "content store opened"
        );
        let view_cache = Mutex::new(TtlCache::new(config.cache_ttl));
        ContentStore {
            config,
            key_seq: AtomicU64::new(0),
            inner: Mutex::new(inner),
            view_cache,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    /// Flush every dirty document whose debounce interval has elapsed.
    pub fn flush_due(&self) {
        self.flush(false);
    }

    /// Flush every dirty document regardless of debounce. Shutdown path.
    pub fn flush_all(&self) {
        self.flush(true);
    }

    /// Run a debounced flush off the caller's critical path.
    pub fn spawn_flush(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.flush_due());
    }

    // Serialization and writes both run under the lock: two flushes of the
    // same document can never reorder on disk, so the last write always
    // carries the newest state. Flushes run on blocking threads, never on
    // the async runtime.
    fn flush(&self, force: bool) {
        let mut inner = self.lock();
        let now = Instant::now();
        for doc in Doc::ALL {
            if !inner.dirty.contains(&doc) {
                continue;
            }
            let due = force
                || inner
                    .last_flush
                    .get(&doc)
                    .is_none_or(|at| now.duration_since(*at) >= self.config.flush_interval);
            if !due {
                continue;
            }
            match inner.serialize_doc(doc) {
                Ok(json) => {
                    let path = self.config.data_dir.join(doc.file_name());
                    // A failed write leaves the document dirty for the
                    // next attempt.
                    if persist::write_document(&path, &json) {
                        inner.dirty.remove(&doc);
                        inner.last_flush.insert(doc, now);
                    }
                }
                Err(e) => {
                    tracing::error!(doc = doc.file_name(), error = %e, "failed to serialize document");
                }
            }
        }
    }

    /// Next unique item key: microsecond timestamp plus a process-wide
    /// sequence number, so two items in the same time unit never collide.
    pub(crate) fn next_key(&self) -> String {
        let micros = Utc::now().timestamp_micros();
        let seq = self
            .key_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("msg-{micros}-{seq}")
    }

    // -- Derived-view cache --

    pub fn cached_view(&self, key: &str) -> Option<String> {
        self.view_cache
            .lock()
            .expect("view cache mutex poisoned")
            .get(key)
            .cloned()
    }

    pub fn store_view(&self, key: impl Into<String>, view: String) {
        self.view_cache
            .lock()
            .expect("view cache mutex poisoned")
            .put(key, view);
    }

    // -- Snapshots --

    pub fn stats(&self) -> UsageStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Store on a fresh temp dir with a zero flush interval, so every
    /// `flush_due` writes immediately.
    pub(crate) fn eager_store() -> (ContentStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.flush_interval = Duration::ZERO;
        (ContentStore::open(config), dir)
    }
}

#[cfg(test)]
mod tests {
    use courier_types::ItemContent;

    use super::*;

    fn text(text: &str) -> ItemContent {
        ItemContent::Text { text: text.into() }
    }

    #[test]
    fn keys_are_unique_within_a_burst() {
        let (store, _dir) = testutil::eager_store();
        let mut keys = HashSet::new();
        for i in 0..100 {
            let item = store.record_item(1, "Ada", text(&format!("line {i}")));
            assert!(keys.insert(item.key));
        }
    }

    #[test]
    fn debounce_buffers_second_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.flush_interval = Duration::from_secs(3600);
        let store = ContentStore::open(config);

        // First write: never flushed before, so it is due immediately.
        store.record_item(1, "Ada", text("one"));
        store.flush_due();
        let path = dir.path().join("items.json");
        let first: HashMap<String, StoredItem> = persist::load_document(&path);
        assert_eq!(first.len(), 1);

        // Second write inside the interval stays buffered in memory.
        store.record_item(1, "Ada", text("two"));
        store.flush_due();
        let second: HashMap<String, StoredItem> = persist::load_document(&path);
        assert_eq!(second.len(), 1);

        // Shutdown flush ignores the debounce.
        store.flush_all();
        let all: HashMap<String, StoredItem> = persist::load_document(&path);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn interleaved_flushes_keep_the_latest_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.flush_interval = Duration::ZERO;
        let store = Arc::new(ContentStore::open(config));

        // Mutations and flushes racing from several threads; the document
        // on disk after the final flush must hold every item.
        let mut handles = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    store.record_item(1, "Ada", text(&format!("t{t} line {i}")));
                    store.flush_due();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        store.flush_all();

        let on_disk: HashMap<String, StoredItem> =
            persist::load_document(&dir.path().join("items.json"));
        assert_eq!(on_disk.len(), 100);
    }

    #[test]
    fn reopen_sees_flushed_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.flush_interval = Duration::ZERO;

        {
            let store = ContentStore::open(config.clone());
            store
                .create_batch("Math101", "Smith", "algebra", 1)
                .unwrap();
            store
                .record_batch_item("math101", 1, "Ada", text("Chapter 1"))
                .unwrap();
            store.flush_all();
        }

        let store = ContentStore::open(config);
        let batch = store.get_batch("MATH101").unwrap();
        assert_eq!(batch.name, "Math101");
        assert_eq!(batch.item_keys.len(), 1);
        let item = store.get_item(&batch.item_keys[0]).unwrap();
        assert_eq!(item.batch.as_deref(), Some("Math101"));
    }

    #[test]
    fn view_cache_round_trip() {
        let (store, _dir) = testutil::eager_store();
        assert!(store.cached_view("k").is_none());
        store.store_view("k", "rendered".into());
        assert_eq!(store.cached_view("k").as_deref(), Some("rendered"));
    }
}
