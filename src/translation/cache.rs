/*!
 * Translation caching functionality.
 *
 * Results are cached per fingerprint for the duration of one translate
 * scope, so repeated content is sent to the provider only once. The cache is
 * never persisted.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;

use crate::model::RunText;
use crate::translation::items::Fingerprint;

/// Fingerprint-keyed cache of translated runs
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    /// Internal cache storage
    cache: Arc<RwLock<HashMap<Fingerprint, Vec<RunText>>>>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the translated runs stored for a fingerprint
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<RunText>> {
        match self.cache.read().get(fingerprint) {
            Some(runs) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", fingerprint);
                Some(runs.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store translated runs. Concurrent stores of the same fingerprint
    /// carry equivalent values, so the last one wins.
    pub fn store(&self, fingerprint: Fingerprint, runs: Vec<RunText>) {
        debug!("Cached translation for {}", fingerprint);
        self.cache.write().insert(fingerprint, runs);
    }

    /// Hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
