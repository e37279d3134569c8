//! Draw-without-replacement candidate pool.
//!
//! The pool is a single shared structure behind a mutex. A draw removes its
//! element while holding the lock, so the removal is visible to every other
//! request before any slow downstream work starts. Replacement swaps the
//! whole entry (paths, expiry and generation) under the same lock.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Identifies one pool between two replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path removed from the pool by [`SamplingCache::draw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub generation: Generation,
}

/// Point-in-time view of the cache entry, for logging and health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub remaining: usize,
    pub generation: Generation,
    pub expired: bool,
}

struct CacheEntry {
    pool: Vec<PathBuf>,
    expires_at: Instant,
    generation: Generation,
}

/// Shared sampling cache. Clone the surrounding `Arc`, never the pool.
pub struct SamplingCache {
    entry: Mutex<CacheEntry>,
    ttl: Duration,
}

impl fmt::Debug for SamplingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.entry.lock();
        f.debug_struct("SamplingCache")
            .field("remaining", &entry.pool.len())
            .field("generation", &entry.generation)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SamplingCache {
    /// Create a cache holding `paths` as generation 0.
    ///
    /// Duplicate paths are collapsed so a path can never be drawn twice
    /// from the same generation.
    pub fn new(paths: Vec<PathBuf>, ttl: Duration) -> Self {
        let pool = dedup(paths);
        info!(items = pool.len(), ttl_secs = ttl.as_secs(), "constructed sampling cache");
        Self {
            entry: Mutex::new(CacheEntry {
                pool,
                expires_at: Instant::now() + ttl,
                generation: Generation(0),
            }),
            ttl,
        }
    }

    /// Remove and return a uniformly random candidate.
    ///
    /// Returns `None` without touching the pool when it is empty.
    pub fn draw(&self) -> Option<Candidate> {
        let mut entry = self.entry.lock();
        if entry.pool.is_empty() {
            warn!(generation = %entry.generation, "cache is empty");
            return None;
        }

        let index = rand::rng().random_range(0..entry.pool.len());
        // Order is irrelevant, so swap_remove keeps the draw O(1).
        let path = entry.pool.swap_remove(index);
        debug!(
            path = %path.display(),
            remaining = entry.pool.len(),
            generation = %entry.generation,
            "popped item"
        );

        Some(Candidate {
            path,
            generation: entry.generation,
        })
    }

    /// Number of candidates not yet drawn from the current generation.
    pub fn remaining(&self) -> usize {
        self.entry.lock().pool.len()
    }

    /// Atomically substitute the entire pool, resetting TTL and bumping the
    /// generation. Returns the new generation.
    pub fn replace(&self, paths: Vec<PathBuf>) -> Generation {
        let pool = dedup(paths);
        let mut entry = self.entry.lock();
        let previous = entry.generation;
        let discarded = entry.pool.len();

        entry.pool = pool;
        entry.expires_at = Instant::now() + self.ttl;
        entry.generation = Generation(previous.0 + 1);

        info!(
            items = entry.pool.len(),
            discarded,
            generation = %entry.generation,
            "replaced sampling cache pool"
        );
        entry.generation
    }

    /// Current generation marker.
    pub fn generation(&self) -> Generation {
        self.entry.lock().generation
    }

    /// Whether the entry has outlived its TTL. An expired pool still serves
    /// draws until it is replaced.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.entry.lock().expires_at
    }

    /// Consistent snapshot of size, generation and expiry.
    pub fn stats(&self) -> PoolStats {
        let entry = self.entry.lock();
        PoolStats {
            remaining: entry.pool.len(),
            generation: entry.generation,
            expired: Instant::now() >= entry.expires_at,
        }
    }
}

fn dedup(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_unstable();
    paths.dedup();
    paths
}
