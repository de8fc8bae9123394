//! LRU cache for raw tile bytes.
//!
//! Tiles are cached by source, directory and tile coordinate, so repeated
//! requests for the same tile skip the range read. The cache is bounded
//! both by entry count and by total bytes.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

/// Default number of cached tiles
pub const DEFAULT_TILE_CACHE_ENTRIES: usize = 256;

/// Default byte budget: 64MB
pub const DEFAULT_TILE_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Cache key for one tile of one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    /// Source identifier (path or s3 URL)
    pub source: Arc<str>,

    /// IFD index
    pub directory: usize,

    pub x: u32,
    pub y: u32,
}

impl TileCacheKey {
    pub fn new(source: impl Into<Arc<str>>, directory: usize, x: u32, y: u32) -> Self {
        Self {
            source: source.into(),
            directory,
            x,
            y,
        }
    }
}

struct Inner {
    entries: LruCache<TileCacheKey, Bytes>,
    size: usize,
}

/// Tile cache shared between tasks.
pub struct TileCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
}

impl TileCache {
    /// Cache holding at most `max_entries` tiles and `max_bytes` bytes.
    pub fn new(max_entries: NonZeroUsize, max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                size: 0,
            }),
            max_bytes,
        }
    }

    /// Get a tile, marking it as recently used.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.entries.get(key).cloned()
    }

    /// Store a tile, evicting least-recently-used tiles while over budget.
    ///
    /// Tiles larger than the whole byte budget are not cached.
    pub async fn put(&self, key: TileCacheKey, data: Bytes) {
        if data.len() > self.max_bytes {
            return;
        }

        let mut inner = self.inner.lock().await;
        let added = data.len();
        if let Some((_, displaced)) = inner.entries.push(key, data) {
            // Either the old value for this key or an entry evicted for space
            inner.size = inner.size.saturating_sub(displaced.len());
        }
        inner.size += added;

        while inner.size > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.size = inner.size.saturating_sub(evicted.len()),
                None => break,
            }
        }
    }

    /// Number of cached tiles.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Total bytes of cached tiles.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.size
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.size = 0;
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(
            NonZeroUsize::new(DEFAULT_TILE_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            DEFAULT_TILE_CACHE_BYTES,
        )
    }
}
