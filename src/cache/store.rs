//! In-memory caches for rendered output.
//!
//! One bounded map holds both rendered articles (keyed by source key) and
//! generic rendered bodies such as paginated listing HTML (keyed by synthetic
//! strings like `/?p=2`). The RSS feed and the archive index each have their
//! own slot: the feed carries a build stamp for its freshness window, and the
//! archive is a single atomic value — present or absent, never partial.
//!
//! Eviction is strictly oldest-inserted-first, one entry at a time, only when
//! an insert pushes the map over capacity. Reads never promote. Two requests
//! that miss the same key concurrently will both compute and the last insert
//! wins; the store makes no at-most-once-derivation promise.

use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::counter;
use tokio::sync::RwLock;

use crate::{
    application::error::AppError,
    domain::articles::{DayGroup, RenderedArticle},
};

#[derive(Clone)]
enum CachedPayload {
    Article(Arc<RenderedArticle>),
    Body(Arc<String>),
}

struct CacheEntry {
    inserted_at: Instant,
    sequence: u64,
    payload: CachedPayload,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

impl Entries {
    fn insert(&mut self, key: String, payload: CachedPayload, capacity: usize) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.map.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                sequence,
                payload,
            },
        );

        if self.map.len() > capacity {
            // Linear scan; the sequence breaks timestamp ties so exactly one
            // deterministic entry goes.
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, entry)| (entry.inserted_at, entry.sequence))
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                self.map.remove(&key);
                counter!("brezza_cache_evict_total").increment(1);
            }
        }
    }
}

struct RenderedFeed {
    built_at: Instant,
    xml: Arc<String>,
}

pub struct CacheStore {
    capacity: usize,
    entries: RwLock<Entries>,
    feed: RwLock<Option<RenderedFeed>>,
    archive: RwLock<Option<Arc<Vec<DayGroup>>>>,
}

impl CacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(Entries::default()),
            feed: RwLock::new(None),
            archive: RwLock::new(None),
        }
    }

    /// Look up a rendered article. No read promotion.
    pub async fn article(&self, key: &str) -> Option<Arc<RenderedArticle>> {
        let guard = self.entries.read().await;
        match guard.map.get(key).map(|entry| &entry.payload) {
            Some(CachedPayload::Article(article)) => {
                counter!("brezza_article_cache_hit_total").increment(1);
                Some(article.clone())
            }
            _ => {
                counter!("brezza_article_cache_miss_total").increment(1);
                None
            }
        }
    }

    pub async fn insert_article(&self, key: &str, article: Arc<RenderedArticle>) {
        let mut guard = self.entries.write().await;
        guard.insert(key.to_string(), CachedPayload::Article(article), self.capacity);
    }

    /// Look up a generic rendered body under a synthetic key.
    pub async fn body(&self, key: &str) -> Option<Arc<String>> {
        let guard = self.entries.read().await;
        match guard.map.get(key).map(|entry| &entry.payload) {
            Some(CachedPayload::Body(body)) => {
                counter!("brezza_listing_cache_hit_total").increment(1);
                Some(body.clone())
            }
            _ => {
                counter!("brezza_listing_cache_miss_total").increment(1);
                None
            }
        }
    }

    pub async fn insert_body(&self, key: &str, body: String) -> Arc<String> {
        let body = Arc::new(body);
        let mut guard = self.entries.write().await;
        guard.insert(key.to_string(), CachedPayload::Body(body.clone()), self.capacity);
        body
    }

    /// Memoize-and-cache entry point for listing bodies: return the cached
    /// body for `key` or compute, store, and return it. The await between
    /// miss and insert means concurrent misses both compute; last write wins.
    pub async fn body_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<Arc<String>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        if let Some(body) = self.body(key).await {
            return Ok(body);
        }
        let computed = compute().await?;
        Ok(self.insert_body(key, computed).await)
    }

    /// The memoized archive index, if one has been built since the last
    /// flush.
    pub async fn archive(&self) -> Option<Arc<Vec<DayGroup>>> {
        self.archive.read().await.clone()
    }

    pub async fn store_archive(&self, days: Vec<DayGroup>) -> Arc<Vec<DayGroup>> {
        let days = Arc::new(days);
        *self.archive.write().await = Some(days.clone());
        days
    }

    /// The cached RSS document, provided it is younger than `max_age`.
    pub async fn feed(&self, max_age: Duration) -> Option<Arc<String>> {
        let guard = self.feed.read().await;
        guard
            .as_ref()
            .filter(|feed| feed.built_at.elapsed() <= max_age)
            .map(|feed| feed.xml.clone())
    }

    pub async fn store_feed(&self, xml: String) -> Arc<String> {
        let xml = Arc::new(xml);
        *self.feed.write().await = Some(RenderedFeed {
            built_at: Instant::now(),
            xml: xml.clone(),
        });
        xml
    }

    /// Wholesale flush: articles, listing bodies, feed, and archive memo go
    /// together. All write locks are taken before anything is cleared, so no
    /// request observes a partially-flushed store.
    pub async fn flush_all(&self) {
        let mut entries = self.entries.write().await;
        let mut feed = self.feed.write().await;
        let mut archive = self.archive.write().await;
        entries.map.clear();
        *feed = None;
        *archive = None;
        counter!("brezza_cache_flush_total").increment(1);
    }

    /// Current number of keyed entries (articles plus bodies).
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.map.len()
    }
}
