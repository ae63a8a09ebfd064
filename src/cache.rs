//! # Freshness cache
//! Time-boxed cache per data category (jobs, news).
//!
//! Each process keeps a memory layer in front of the shared blob storage, so
//! workers see each other's refreshes once their own copy expires. The cache
//! is pure acceleration: unreadable or corrupt storage is a miss and a failed
//! write only logs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::BlobStore;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Jobs,
    News,
}

impl Category {
    /// Storage key; matches the on-disk `<key>.json` file name.
    pub fn key(self) -> &'static str {
        match self {
            Category::Jobs => "jobs_cache",
            Category::News => "news_cache",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Category::Jobs => "jobs",
            Category::News => "news",
        }
    }
}

/// Persisted shape: retrieval time in unix seconds plus the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheBlob {
    ts: f64,
    data: serde_json::Value,
}

/// A cache hit.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub payload: T,
    pub age: Duration,
    pub stored_at: DateTime<Utc>,
}

pub struct FreshnessCache {
    store: Arc<dyn BlobStore>,
    ttl: Duration,
    memory: Mutex<HashMap<Category, CacheBlob>>,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn BlobStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, category: Category) -> Option<Cached<T>> {
        self.get_at(category, Utc::now())
    }

    /// Look up `category` as of `now`. Valid iff `now - ts < ttl`.
    pub fn get_at<T: DeserializeOwned>(
        &self,
        category: Category,
        now: DateTime<Utc>,
    ) -> Option<Cached<T>> {
        let blob = match self.memory_hit(category, now) {
            Some(b) => Some(b),
            None => self.storage_hit(category, now),
        };

        let Some(blob) = blob else {
            counter!("cache_misses_total", "category" => category.label()).increment(1);
            return None;
        };

        let age = age_of(blob.ts, now)?;
        match serde_json::from_value::<T>(blob.data) {
            Ok(payload) => {
                counter!("cache_hits_total", "category" => category.label()).increment(1);
                Some(Cached {
                    payload,
                    age,
                    stored_at: from_unix_f64(blob.ts),
                })
            }
            Err(e) => {
                warn!(target: "cache", category = category.label(), error = %e, "cached payload has unexpected shape");
                counter!("cache_misses_total", "category" => category.label()).increment(1);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, category: Category, payload: &T) {
        self.put_at(category, payload, Utc::now())
    }

    /// Best-effort: the memory layer is always updated, storage failures only log.
    pub fn put_at<T: Serialize>(&self, category: Category, payload: &T, now: DateTime<Utc>) {
        let data = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "cache", category = category.label(), error = %e, "cache payload not serializable");
                return;
            }
        };
        let blob = CacheBlob {
            ts: unix_f64(now),
            data,
        };

        match serde_json::to_vec(&blob) {
            Ok(bytes) => {
                if let Err(e) = self.store.write_atomic(category.key(), &bytes) {
                    warn!(target: "cache", category = category.label(), error = %e, "cache write failed");
                }
            }
            Err(e) => {
                warn!(target: "cache", category = category.label(), error = %e, "cache encode failed");
            }
        }

        let mut mem = self.memory.lock().unwrap_or_else(|p| p.into_inner());
        mem.insert(category, blob);
    }

    fn is_fresh(&self, ts: f64, now: DateTime<Utc>) -> bool {
        match age_of(ts, now) {
            Some(age) => age < self.ttl,
            None => false,
        }
    }

    fn memory_hit(&self, category: Category, now: DateTime<Utc>) -> Option<CacheBlob> {
        let mem = self.memory.lock().unwrap_or_else(|p| p.into_inner());
        mem.get(&category)
            .filter(|b| self.is_fresh(b.ts, now))
            .cloned()
    }

    fn storage_hit(&self, category: Category, now: DateTime<Utc>) -> Option<CacheBlob> {
        let bytes = match self.store.read(category.key()) {
            Ok(Some(b)) => b,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "cache", category = category.label(), error = %e, "cache read failed");
                return None;
            }
        };
        let blob: CacheBlob = match serde_json::from_slice(&bytes) {
            Ok(b) => b,
            Err(e) => {
                debug!(target: "cache", category = category.label(), error = %e, "corrupt cache blob treated as miss");
                return None;
            }
        };
        if !self.is_fresh(blob.ts, now) {
            return None;
        }

        let mut mem = self.memory.lock().unwrap_or_else(|p| p.into_inner());
        mem.insert(category, blob.clone());
        Some(blob)
    }
}

fn unix_f64(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

fn unix_millis(ts: f64) -> i64 {
    (ts * 1000.0).round() as i64
}

fn from_unix_f64(ts: f64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(unix_millis(ts))
        .single()
        .unwrap_or_default()
}

/// Clock skew (a timestamp slightly in the future) counts as age zero.
fn age_of(ts: f64, now: DateTime<Utc>) -> Option<Duration> {
    if !ts.is_finite() {
        return None;
    }
    let ms = now.timestamp_millis().saturating_sub(unix_millis(ts)).max(0);
    Some(Duration::from_millis(ms as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, FreshnessCache) {
        let store = Arc::new(MemoryStore::new());
        let c = FreshnessCache::new(store.clone(), DEFAULT_CACHE_TTL);
        (store, c)
    }

    #[test]
    fn put_then_get_within_ttl() {
        let (_s, c) = cache();
        let t0 = Utc::now();
        c.put_at(Category::Jobs, &vec!["a".to_string()], t0);

        let hit: Cached<Vec<String>> = c
            .get_at(Category::Jobs, t0 + chrono::Duration::seconds(60))
            .expect("fresh");
        assert_eq!(hit.payload, vec!["a".to_string()]);
        assert_eq!(hit.age.as_secs(), 60);
    }

    #[test]
    fn expires_at_ttl_boundary() {
        let (_s, c) = cache();
        let t0 = Utc::now();
        c.put_at(Category::News, &1u32, t0);

        let just_before = t0 + chrono::Duration::seconds(1799);
        assert!(c.get_at::<u32>(Category::News, just_before).is_some());

        let at_ttl = t0 + chrono::Duration::seconds(1800);
        assert!(c.get_at::<u32>(Category::News, at_ttl).is_none());
    }

    #[test]
    fn categories_are_independent() {
        let (_s, c) = cache();
        c.put(Category::Jobs, &1u32);
        assert!(c.get::<u32>(Category::News).is_none());
    }

    #[test]
    fn corrupt_storage_is_a_miss() {
        let (store, c) = cache();
        store.insert(Category::Jobs.key(), "not json at all");
        assert!(c.get::<Vec<String>>(Category::Jobs).is_none());
    }

    #[test]
    fn other_process_write_is_visible_through_storage() {
        let store = Arc::new(MemoryStore::new());
        let writer = FreshnessCache::new(store.clone(), DEFAULT_CACHE_TTL);
        let reader = FreshnessCache::new(store, DEFAULT_CACHE_TTL);

        writer.put(Category::Jobs, &vec![1, 2, 3]);
        let hit: Cached<Vec<i32>> = reader.get(Category::Jobs).expect("shared storage hit");
        assert_eq!(hit.payload, vec![1, 2, 3]);
    }

    #[test]
    fn shape_mismatch_is_a_miss() {
        let (_s, c) = cache();
        c.put(Category::Jobs, &"a string");
        assert!(c.get::<Vec<u32>>(Category::Jobs).is_none());
    }
}
