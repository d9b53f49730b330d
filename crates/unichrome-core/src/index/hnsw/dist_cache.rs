//! Construction-time distance cache.
//!
//! Caches node-pair cosine distances during graph construction. Keying is
//! order-insensitive; pairs are canonicalised to `(min, max)`. Capacity is
//! advisory: once the entry count reaches it, further results are returned
//! but not retained. The cache never persists; a graph loaded from disk
//! starts with a zero-capacity cache.

use rustc_hash::FxHashMap;

/// Symmetric bounded cache of pair distances.
#[derive(Debug)]
pub struct DistanceCache {
    entries: FxHashMap<(i32, i32), f32>,
    capacity: usize,
    hits: u64,
    lookups: u64,
}

impl DistanceCache {
    /// Creates a cache with the given advisory capacity, in entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            capacity,
            hits: 0,
            lookups: 0,
        }
    }

    /// Returns the cached distance for `(i, j)`, computing and inserting it
    /// on a miss.
    pub fn get_or_compute(&mut self, i: i32, j: i32, compute: impl FnOnce() -> f32) -> f32 {
        let key = if i <= j { (i, j) } else { (j, i) };
        self.lookups += 1;

        if let Some(&d) = self.entries.get(&key) {
            self.hits += 1;
            return d;
        }

        let d = compute();
        if self.entries.len() < self.capacity {
            self.entries.insert(key, d);
        }
        d
    }

    /// Changes the advisory capacity.
    ///
    /// When `preserve` is false, existing entries are dropped; hit and
    /// lookup counters survive either way.
    pub fn resize(&mut self, capacity: usize, preserve: bool) {
        if !preserve {
            self.entries.clear();
        }
        self.capacity = capacity;
    }

    /// Fraction of lookups served from the cache, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Number of lookups served from the cache.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Total number of lookups.
    #[must_use]
    pub const fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current advisory capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
