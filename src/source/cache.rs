//! Per-document memoization of page text and page images.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use super::PageSource;
use crate::error::Result;
use crate::model::PageImage;

/// A memo table keyed by page index plus rendering parameters.
///
/// There is no eviction: a cache lives for one document and is bounded by
/// its page count. Failed computations are not stored.
#[derive(Debug)]
pub struct PageCache<K, V> {
    entries: HashMap<K, V>,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash, V> PageCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once per key until [`clear`](Self::clear).
    /// Its error is returned as-is and nothing is stored.
    pub fn get_or_compute<E, F>(&mut self, key: K, compute: F) -> std::result::Result<&V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(slot) => {
                self.hits += 1;
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                let value = compute()?;
                self.misses += 1;
                Ok(slot.insert(value))
            }
        }
    }

    /// Whether `key` is cached.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached artifact. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

impl<K: Eq + Hash, V> Default for PageCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl std::ops::Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
        }
    }
}

/// One open-document session: a page source plus its caches.
///
/// Text is keyed by page index, images by `(page index, dpi)`. Dropping the
/// session, or calling [`into_inner`](Self::into_inner), discards both
/// caches; nothing is shared across documents.
pub struct CachedPageSource<S> {
    source: S,
    text: PageCache<u32, String>,
    images: PageCache<(u32, u32), PageImage>,
}

impl<S: PageSource> CachedPageSource<S> {
    /// Start a session over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            text: PageCache::new(),
            images: PageCache::new(),
        }
    }

    /// Total number of pages.
    pub fn page_count(&self) -> u32 {
        self.source.page_count()
    }

    /// Text of page `index` (0-based).
    pub fn page_text(&mut self, index: u32) -> Result<&str> {
        if self.text.contains(&index) {
            log::debug!("Page {} text served from cache", index + 1);
        }
        let source = &self.source;
        let text = self.text.get_or_compute(index, || source.page_text(index))?;
        Ok(text.as_str())
    }

    /// Image of page `index` (0-based) at `dpi`.
    pub fn page_image(&mut self, index: u32, dpi: u32) -> Result<&PageImage> {
        if self.images.contains(&(index, dpi)) {
            log::debug!("Page {} image at {} dpi served from cache", index + 1, dpi);
        }
        let source = &self.source;
        self.images
            .get_or_compute((index, dpi), || source.page_image(index, dpi))
    }

    /// Drop all cached artifacts, e.g. after the underlying file changed.
    pub fn clear(&mut self) {
        log::debug!(
            "Clearing page cache ({} texts, {} images)",
            self.text.len(),
            self.images.len()
        );
        self.text.clear();
        self.images.clear();
    }

    /// Combined counters of the text and image caches.
    pub fn stats(&self) -> CacheStats {
        self.text.stats() + self.images.stats()
    }

    /// Borrow the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// End the session and return the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }
}
