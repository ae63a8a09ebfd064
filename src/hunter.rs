//! # Hunter push
//! Library half of `push-jobs-snapshot`: turns a crawler output file into a
//! dashboard update carrying a `jobs_snapshot`, sends it, and judges the reply.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dashboard::format_ts;
use crate::ingest::normalize::{normalize_all, CRAWLER_FIELDS};
use crate::ingest::types::JobRecord;

pub const MAX_PUSH_JOBS: usize = 500;
pub const DEFAULT_SOURCE_LABEL: &str = "Hunter";
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:8000";
pub const UPDATE_PATH: &str = "/api/update.py";

/// Shape written by the crawler. Anything that is not an object reads as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerOutput {
    #[serde(default)]
    pub jobs: Vec<Value>,
    #[serde(default)]
    pub fetched_at: Option<String>,
    #[serde(default)]
    pub sources: Vec<Value>,
}

pub fn read_crawler_output(text: &str) -> Result<CrawlerOutput> {
    let v: Value = serde_json::from_str(text).context("crawler output is not JSON")?;
    if !v.is_object() {
        return Ok(CrawlerOutput::default());
    }
    let mut obj = v;
    // Tolerate wrongly-typed optional fields instead of failing the push.
    if !obj["jobs"].is_array() {
        obj["jobs"] = json!([]);
    }
    if !obj["sources"].is_array() {
        obj["sources"] = json!([]);
    }
    if !obj["fetched_at"].is_string() {
        obj["fetched_at"] = Value::Null;
    }
    serde_json::from_value(obj).context("decoding crawler output")
}

/// At most [`MAX_PUSH_JOBS`] input records are considered; invalid ones drop out.
pub fn normalize_crawler_jobs(raw: &[Value]) -> Vec<JobRecord> {
    normalize_all(raw.iter().take(MAX_PUSH_JOBS), &CRAWLER_FIELDS)
}

pub fn build_payload(
    out: &CrawlerOutput,
    jobs: &[JobRecord],
    label: &str,
    now: DateTime<Utc>,
) -> Value {
    let now_s = format_ts(now);
    let sources: Vec<&str> = out.sources.iter().filter_map(Value::as_str).collect();

    let mut kpis = serde_json::Map::new();
    kpis.insert(format!("{label} Targeted Jobs"), json!(jobs.len().to_string()));
    kpis.insert(
        format!("{label} Last Jobs Sync"),
        json!(out.fetched_at.clone().unwrap_or_else(|| now_s.clone())),
    );

    json!({
        "update_source": label.to_lowercase(),
        "timestamp": now_s,
        "kpi_updates": kpis,
        "jobs_snapshot": {
            "fetched_at": out.fetched_at,
            "sources": sources,
            "jobs": jobs,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushVerdict {
    Accepted,
    /// Server answered `ok: false` (or no usable `ok`).
    Rejected,
    /// Server accepted the push but stored no jobs although some were sent.
    NoJobsAccepted,
}

impl PushVerdict {
    pub fn exit_code(self) -> i32 {
        match self {
            PushVerdict::Accepted => 0,
            PushVerdict::Rejected => 1,
            PushVerdict::NoJobsAccepted => 3,
        }
    }
}

pub fn evaluate_response(resp: &Value, sent_jobs: usize) -> PushVerdict {
    if resp.get("ok").and_then(Value::as_bool) != Some(true) {
        return PushVerdict::Rejected;
    }
    let stored = resp.get("jobs_count").and_then(Value::as_u64).unwrap_or(0);
    if stored == 0 && sent_jobs > 0 {
        return PushVerdict::NoJobsAccepted;
    }
    PushVerdict::Accepted
}

/// POST `payload` to `<base_url>/api/update.py` and return the JSON reply,
/// whatever its status code.
pub async fn push(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    payload: &Value,
) -> Result<Value> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), UPDATE_PATH);
    let resp = client
        .post(&url)
        .bearer_auth(token)
        .json(payload)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;
    let status = resp.status();
    let text = resp.text().await.with_context(|| format!("POST {url} body"))?;
    serde_json::from_str(&text)
        .with_context(|| format!("POST {url}: non-JSON reply (HTTP {status})"))
}
