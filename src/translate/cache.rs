//! In-memory translation cache with insertion-order bulk eviction.
//! Key: blake3 hash of (service_id | target_lang | source_text).
//! When a new key arrives at capacity, the oldest half is dropped in one pass.

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

type CacheKey = [u8; 32];

pub struct TranslationCache {
    /// Unbounded on its own; capacity is enforced here so eviction can be
    /// done in bulk. Only `peek*` is used on reads, which keeps the list in
    /// insertion order rather than recency order.
    inner: Mutex<LruCache<CacheKey, String>>,
    capacity: usize,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(2),
        }
    }

    /// Compute the cache key from translation parameters.
    pub fn compute_key(service_id: &str, target_lang: &str, text: &str) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(service_id.as_bytes());
        hasher.update(b"|");
        hasher.update(target_lang.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    pub fn get(&self, service_id: &str, target_lang: &str, text: &str) -> Option<String> {
        let key = Self::compute_key(service_id, target_lang, text);
        self.inner.lock().peek(&key).cloned()
    }

    pub fn put(&self, service_id: &str, target_lang: &str, text: &str, translation: String) {
        let key = Self::compute_key(service_id, target_lang, text);
        let mut cache = self.inner.lock();

        // Re-inserting an existing key keeps its original position.
        if let Some(slot) = cache.peek_mut(&key) {
            *slot = translation;
            return;
        }

        if cache.len() >= self.capacity {
            let evict = self.capacity / 2;
            for _ in 0..evict {
                if cache.pop_lru().is_none() {
                    break;
                }
            }
            debug!(evicted = evict, capacity = self.capacity, "translation cache bulk eviction");
        }
        cache.put(key, translation);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
