//! Two-tier response cache plus image-byte cache.
//!
//! Each store is LRU-bounded with a per-entry TTL; entries are pure derived
//! data, so overwrite races are harmless and nothing is ever invalidated by
//! writes elsewhere — expiry and LRU pressure are the only eviction paths
//! besides the admin clear. Nothing survives a restart.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::ids::ItemKind;
use crate::plex::{MatchResponse, MetadataResponse};

/// Maximum entries per bounded store.
pub const CACHE_MAX_ENTRIES: usize = 500;

/// TTL for match/search results.
pub const MATCH_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for single-item metadata and image bytes.
pub const METADATA_TTL: Duration = Duration::from_secs(30 * 60);

// ---------------------------------------------------------------------------
// TtlCache
// ---------------------------------------------------------------------------

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// An LRU cache whose entries additionally expire after a fixed TTL.
///
/// Safe for concurrent use; reads refresh LRU recency, writes overwrite
/// unconditionally (last write wins).
pub struct TtlCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
    max: Option<usize>,
}

impl<V: Clone> TtlCache<V> {
    /// A cache holding at most `max` entries.
    pub fn bounded(max: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
            max: Some(max),
        }
    }

    /// A cache with no entry cap; TTL expiry is the only eviction.
    pub fn unbounded(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            ttl,
            max: None,
        }
    }

    /// Fetch a live entry; expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Insert or overwrite, stamping a fresh TTL.
    pub fn insert(&self, key: String, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            size: self.len(),
            max: self.max,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider cache bundle
// ---------------------------------------------------------------------------

/// Cached upstream image bytes with their content type.
#[derive(Clone)]
pub struct CachedImage {
    pub content_type: String,
    pub bytes: Bytes,
}

/// Aggregate stats for one store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    pub ttl_secs: u64,
}

/// Aggregate stats across all stores.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub matches: StoreStats,
    pub metadata: StoreStats,
    pub images: StoreStats,
}

/// The three stores shared by every provider operation.
pub struct ProviderCache {
    pub matches: TtlCache<MatchResponse>,
    pub metadata: TtlCache<MetadataResponse>,
    pub images: TtlCache<CachedImage>,
}

impl Default for ProviderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCache {
    pub fn new() -> Self {
        Self {
            matches: TtlCache::bounded(CACHE_MAX_ENTRIES, MATCH_TTL),
            metadata: TtlCache::bounded(CACHE_MAX_ENTRIES, METADATA_TTL),
            images: TtlCache::unbounded(METADATA_TTL),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            matches: self.matches.stats(),
            metadata: self.metadata.stats(),
            images: self.images.stats(),
        }
    }

    pub fn clear(&self) {
        self.matches.clear();
        self.metadata.clear();
        self.images.clear();
    }
}

// ---------------------------------------------------------------------------
// Key construction
// ---------------------------------------------------------------------------

/// Key for a match lookup; collision-resistant across stashes and kinds.
pub fn match_key(stash_id: &str, title: &str, year: Option<i32>, kind: ItemKind) -> String {
    let year = year.map(|y| y.to_string()).unwrap_or_default();
    format!(
        "match:{stash_id}:{}:{year}:{kind}",
        title.trim().to_lowercase()
    )
}

/// Key for a single-item metadata lookup.
pub fn metadata_key(stash_id: &str, item_id: &str) -> String {
    format!("metadata:{stash_id}:{item_id}")
}

/// Key for proxied image bytes.
pub fn image_key(stash_id: &str, target_url: &str) -> String {
    format!("img:{stash_id}:{target_url}")
}
