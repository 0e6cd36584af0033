//! In-memory LRU caches for extraction results and explanations
//!
//! Users re-upload the same bill and re-ask the same question while
//! iterating; extraction of a scanned multi-page bill and a language model
//! round trip are by far the slowest steps, so identical inputs are served
//! once.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::dispatch::DocumentText;

/// Bounded LRU cache of successful results; `capacity` 0 disables it
pub struct ResultCache<V> {
    entries: Option<Mutex<LruCache<String, V>>>,
}

/// Extracted bill text keyed by [`upload_key`]
pub type ExtractionCache = ResultCache<DocumentText>;

/// Explanations and follow-up answers keyed by [`request_key`]
pub type ExplanationCache = ResultCache<String>;

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.as_ref()?.lock().ok()?;
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        let Some(entries) = &self.entries else {
            return;
        };
        // A poisoned lock only means another request panicked mid-insert; skip caching
        if let Ok(mut entries) = entries.lock() {
            entries.put(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|entries| entries.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for an upload: content hash plus declared extension
pub fn upload_key(bytes: &[u8], extension: &str) -> String {
    format!("{:x}.{}", Sha256::digest(bytes), extension)
}

/// Cache key for a request made of several text fields.
///
/// Each field is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn request_key(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
