// src/news.rs
//! Technology news: RSS/Atom aggregation behind the freshness cache.
//! Unlike jobs there is no pushed snapshot tier.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{Category, FreshnessCache};
use crate::dashboard::format_ts;
use crate::ingest::fetch_news;
use crate::ingest::types::{NewsItem, NewsProvider};

pub const MAX_NEWS_SHOWN: usize = 30;
const DEDUP_PREFIX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResponse {
    pub news: Vec<NewsItem>,
    /// Unique items found, including those beyond the shown window.
    pub total: usize,
    pub sources: Vec<String>,
    pub fetched_at: String,
    pub ts: f64,
    pub from_cache: bool,
}

pub struct NewsService {
    cache: Arc<FreshnessCache>,
    providers: Vec<Box<dyn NewsProvider>>,
}

impl NewsService {
    pub fn new(cache: Arc<FreshnessCache>, providers: Vec<Box<dyn NewsProvider>>) -> Self {
        Self { cache, providers }
    }

    pub async fn get_news(&self, force: bool) -> NewsResponse {
        self.get_news_at(force, Utc::now()).await
    }

    pub async fn get_news_at(&self, force: bool, now: DateTime<Utc>) -> NewsResponse {
        if !force {
            if let Some(hit) = self.cache.get_at::<NewsResponse>(Category::News, now) {
                let mut resp = hit.payload;
                resp.from_cache = true;
                return resp;
            }
        }

        let (items, _reports) = fetch_news(&self.providers).await;
        let unique = dedup_by_title(items);
        info!(target: "ingest", unique = unique.len(), "live news fetch finished");

        let resp = NewsResponse {
            total: unique.len(),
            news: unique.into_iter().take(MAX_NEWS_SHOWN).collect(),
            sources: self.providers.iter().map(|p| p.name().to_string()).collect(),
            fetched_at: format_ts(now),
            ts: now.timestamp_millis() as f64 / 1000.0,
            from_cache: false,
        };
        if resp.total > 0 {
            self.cache.put_at(Category::News, &resp, now);
        }
        resp
    }
}

/// First occurrence wins; items are keyed by a lowercased 50-char title prefix.
pub fn dedup_by_title(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|it| {
            let key: String = it
                .title
                .chars()
                .take(DEDUP_PREFIX_CHARS)
                .collect::<String>()
                .to_lowercase();
            seen.insert(key)
        })
        .collect()
}
