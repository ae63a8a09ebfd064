// src/listing.rs
//! User-facing filters, pagination and aggregate stats for `/jobs`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::ingest::types::JobRecord;

pub const PAGE_SIZE: usize = 20;
pub const TOP_TAGS: usize = 12;

/// Free-text, location and employment-type filters. An empty value disables
/// a filter; `all` also disables location and type.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub query: String,
    pub location: String,
    pub job_type: String,
}

impl JobFilter {
    pub fn new(query: &str, location: &str, job_type: &str) -> Self {
        let norm = |s: &str| s.trim().to_lowercase();
        let norm_or_all = |s: &str| {
            let s = norm(s);
            if s == "all" {
                String::new()
            } else {
                s
            }
        };
        Self {
            query: norm(query),
            location: norm_or_all(location),
            job_type: norm_or_all(job_type),
        }
    }

    pub fn matches(&self, job: &JobRecord) -> bool {
        let text = job.search_text();
        if !self.query.is_empty() && !text.contains(&self.query) {
            return false;
        }
        if !self.location.is_empty()
            && !job.location.to_lowercase().contains(&self.location)
            && !text.contains(&self.location)
        {
            return false;
        }
        match self.job_type.as_str() {
            "" => true,
            "remote" => job.is_remote(),
            t => job.employment_type.to_lowercase().contains(t),
        }
    }

    pub fn apply(&self, jobs: Vec<JobRecord>) -> Vec<JobRecord> {
        jobs.into_iter().filter(|j| self.matches(j)).collect()
    }
}

/// Page numbers are 1-based; anything below 1 or unparsable is page 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&p| p >= 1)
        .map_or(1, |p| p as usize)
}

pub fn total_pages(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE)
}

/// The `page`-th slice of `jobs`; empty past the end.
pub fn paginate(jobs: &[JobRecord], page: usize) -> &[JobRecord] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    if start >= jobs.len() {
        return &[];
    }
    let end = (start + PAGE_SIZE).min(jobs.len());
    &jobs[start..end]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub source_counts: BTreeMap<String, usize>,
    pub remote_count: usize,
    pub onsite_count: usize,
    pub top_tags: Vec<String>,
}

impl JobStats {
    /// Aggregates over the whole filtered set, not one page.
    pub fn from_jobs(jobs: &[JobRecord]) -> Self {
        let mut source_counts = BTreeMap::new();
        let mut remote_count = 0;
        // tag -> (count, first seen)
        let mut tags: HashMap<&str, (usize, usize)> = HashMap::new();

        for job in jobs {
            let src = if job.source.is_empty() {
                "Unknown"
            } else {
                job.source.as_str()
            };
            *source_counts.entry(src.to_string()).or_insert(0) += 1;
            if job.is_remote() {
                remote_count += 1;
            }
            for t in &job.tags {
                let next = tags.len();
                tags.entry(t.as_str()).or_insert((0, next)).0 += 1;
            }
        }

        let mut ranked: Vec<(&str, (usize, usize))> = tags.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

        Self {
            source_counts,
            remote_count,
            onsite_count: jobs.len() - remote_count,
            top_tags: ranked
                .into_iter()
                .take(TOP_TAGS)
                .map(|(t, _)| t.to_string())
                .collect(),
        }
    }
}
