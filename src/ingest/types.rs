// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Canonical job record served by `/jobs` and stored in the jobs snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRecord {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: String, // free text, never parsed
    #[serde(default, rename = "type")]
    pub employment_type: String,
    #[serde(default)]
    pub posted: String, // opaque upstream timestamp
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub snippet: String,
}

impl JobRecord {
    /// Lowercased haystack used by free-text search.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.company,
            self.tags.join(" "),
            self.snippet
        )
        .to_lowercase()
    }

    pub fn is_remote(&self) -> bool {
        self.employment_type.to_lowercase().contains("remote")
            || self.location.to_lowercase().contains("remote")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub published: String,
    pub source: String,
    pub snippet: String,
}

/// Result of asking one upstream for its records.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    Fetched { source: String, records: Vec<T> },
    Failed { source: String, reason: String },
}

/// Per-source summary of one fetch cycle.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub count: usize,
    pub error: Option<String>,
}

#[async_trait::async_trait]
pub trait JobProvider: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>>;
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &str;
}
