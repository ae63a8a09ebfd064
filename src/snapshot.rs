//! # Job source resolution
//! Decides which job list `/jobs` serves, in strict priority order:
//!
//! 1. the externally pushed `jobs_snapshot`, when it has jobs and is at most
//!    `snapshot_max_age` old;
//! 2. the local [`FreshnessCache`] entry for jobs;
//! 3. a live fetch across every [`JobProvider`], which refills the cache.
//!
//! `force` skips straight to the live fetch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{Category, FreshnessCache};
use crate::dashboard::{format_ts, parse_ts, DocumentStore};
use crate::ingest::fetch_jobs;
use crate::ingest::normalize::{normalize_all, SNAPSHOT_FIELDS};
use crate::ingest::types::{JobProvider, JobRecord, SourceReport};

pub const DEFAULT_SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    ExternalSnapshot,
    LocalCache,
    LiveFetch,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::ExternalSnapshot => "external_snapshot",
            Provenance::LocalCache => "local_cache",
            Provenance::LiveFetch => "live_fetch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedJobs {
    pub jobs: Vec<JobRecord>,
    pub provenance: Provenance,
    pub fetched_at: String,
    /// Per-upstream results; empty unless this call did a live fetch.
    pub reports: Vec<SourceReport>,
}

pub struct SnapshotResolver {
    documents: DocumentStore,
    cache: Arc<FreshnessCache>,
    providers: Vec<Box<dyn JobProvider>>,
    snapshot_max_age: Duration,
}

impl SnapshotResolver {
    pub fn new(
        documents: DocumentStore,
        cache: Arc<FreshnessCache>,
        providers: Vec<Box<dyn JobProvider>>,
    ) -> Self {
        Self {
            documents,
            cache,
            providers,
            snapshot_max_age: DEFAULT_SNAPSHOT_MAX_AGE,
        }
    }

    pub fn with_snapshot_max_age(mut self, max_age: Duration) -> Self {
        self.snapshot_max_age = max_age;
        self
    }

    pub async fn resolve_jobs(&self, force: bool) -> ResolvedJobs {
        self.resolve_jobs_at(force, Utc::now()).await
    }

    pub async fn resolve_jobs_at(&self, force: bool, now: DateTime<Utc>) -> ResolvedJobs {
        let resolved = match self.without_fetch(force, now) {
            Some(r) => r,
            None => self.live(now).await,
        };
        counter!("jobs_resolved_total", "provenance" => resolved.provenance.as_str()).increment(1);
        debug!(
            target: "ingest",
            provenance = resolved.provenance.as_str(),
            count = resolved.jobs.len(),
            "jobs resolved"
        );
        resolved
    }

    fn without_fetch(&self, force: bool, now: DateTime<Utc>) -> Option<ResolvedJobs> {
        if force {
            return None;
        }
        if let Some(r) = self.fresh_snapshot(now) {
            return Some(r);
        }
        let hit = self.cache.get_at::<Vec<JobRecord>>(Category::Jobs, now)?;
        Some(ResolvedJobs {
            jobs: hit.payload,
            provenance: Provenance::LocalCache,
            fetched_at: format_ts(hit.stored_at),
            reports: Vec::new(),
        })
    }

    fn fresh_snapshot(&self, now: DateTime<Utc>) -> Option<ResolvedJobs> {
        let doc = match self.documents.read() {
            Ok(doc) => doc?,
            Err(e) => {
                warn!(target: "ingest", error = %e, "dashboard document unreadable; skipping snapshot tier");
                return None;
            }
        };
        let snap = doc.jobs_snapshot?;
        if snap.jobs.is_empty() {
            return None;
        }

        // Unparseable `updated_at` counts as stale.
        let updated = parse_ts(snap.updated_at.as_deref()?)?;
        let max_age = chrono::Duration::from_std(self.snapshot_max_age).ok()?;
        if now - updated > max_age {
            debug!(target: "ingest", updated_at = %updated, "jobs snapshot stale");
            return None;
        }

        let jobs = normalize_all(&snap.jobs, &SNAPSHOT_FIELDS);
        if jobs.is_empty() {
            return None;
        }
        Some(ResolvedJobs {
            jobs,
            provenance: Provenance::ExternalSnapshot,
            fetched_at: snap.fetched_at.unwrap_or_else(|| format_ts(updated)),
            reports: Vec::new(),
        })
    }

    async fn live(&self, now: DateTime<Utc>) -> ResolvedJobs {
        let (jobs, reports) = fetch_jobs(&self.providers).await;
        info!(target: "ingest", count = jobs.len(), "live job fetch finished");
        if !jobs.is_empty() {
            self.cache.put_at(Category::Jobs, &jobs, now);
        }
        ResolvedJobs {
            jobs,
            provenance: Provenance::LiveFetch,
            fetched_at: format_ts(now),
            reports,
        }
    }
}
