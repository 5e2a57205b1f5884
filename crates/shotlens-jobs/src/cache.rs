//! In-memory memo of finished analyses keyed by image id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use shotlens_core::ProcessedResult;

/// Hit/miss counters plus the current entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Image id to its latest [`ProcessedResult`].
///
/// Inserting replaces the previous result for the id; results are never
/// merged. Lookups take a read lock, so concurrent readers never block
/// each other.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<String, Arc<ProcessedResult>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, image_id: &str) -> bool {
        self.entries.read().await.contains_key(image_id)
    }

    /// Cached result for `image_id`, counting a hit or a miss.
    pub async fn get(&self, image_id: &str) -> Option<Arc<ProcessedResult>> {
        let found = self.entries.read().await.get(image_id).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `result` under its image id, returning the one it replaced.
    pub async fn insert(&self, result: Arc<ProcessedResult>) -> Option<Arc<ProcessedResult>> {
        let image_id = result.image_id.clone();
        let previous = self.entries.write().await.insert(image_id, result);
        if previous.is_some() {
            debug!("Replaced cached analysis");
        }
        previous
    }

    pub async fn invalidate(&self, image_id: &str) -> Option<Arc<ProcessedResult>> {
        self.entries.write().await.remove(image_id)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(image_id: &str, raw_text: &str) -> Arc<ProcessedResult> {
        let mut result = ProcessedResult::empty(image_id);
        result.raw_text = raw_text.to_string();
        Arc::new(result)
    }

    #[tokio::test]
    async fn test_get_counts_hits_and_misses() {
        let cache = AnalysisCache::new();
        assert!(cache.get("a").await.is_none());
        cache.insert(result("a", "hello")).await;
        assert_eq!(cache.get("a").await.unwrap().raw_text, "hello");

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let cache = AnalysisCache::new();
        assert!(cache.insert(result("a", "first")).await.is_none());
        let previous = cache.insert(result("a", "second")).await.unwrap();
        assert_eq!(previous.raw_text, "first");
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("a").await.unwrap().raw_text, "second");
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = AnalysisCache::new();
        cache.insert(result("a", "")).await;
        cache.insert(result("b", "")).await;
        assert!(cache.invalidate("a").await.is_some());
        assert!(!cache.contains("a").await);
        assert!(cache.contains("b").await);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
