// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use crate::ingest::types::{
    FetchOutcome, JobProvider, JobRecord, NewsItem, NewsProvider, SourceReport,
};
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_records_total",
            "Records returned by upstream providers after normalization."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_gauge!(
            "ingest_last_fetch_ts",
            "Unix ts of the last live fetch per kind."
        );
    });
}

/// Snippet text: strip tags, decode entities, cap at `max_chars`, trim.
pub fn clean_snippet(s: &str, max_chars: usize) -> String {
    if s.is_empty() {
        return String::new();
    }

    // 1) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?s)<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(s, "");

    // 2) HTML entity decode
    let decoded = html_escape::decode_html_entities(&stripped);

    // 3) Length cap, then trim
    let capped: String = decoded.chars().take(max_chars).collect();
    capped.trim().to_string()
}

/// Log and count provider outcomes; failures contribute zero records.
pub fn collect_outcomes<T>(
    outcomes: Vec<FetchOutcome<T>>,
    kind: &'static str,
) -> (Vec<T>, Vec<SourceReport>) {
    ensure_metrics_described();

    let mut all = Vec::new();
    let mut reports = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            FetchOutcome::Fetched { source, records } => {
                tracing::debug!(target: "ingest", provider = %source, kind, count = records.len(), "provider ok");
                counter!("ingest_records_total", "kind" => kind).increment(records.len() as u64);
                reports.push(SourceReport {
                    source,
                    count: records.len(),
                    error: None,
                });
                all.extend(records);
            }
            FetchOutcome::Failed { source, reason } => {
                tracing::warn!(target: "ingest", provider = %source, kind, error = %reason, "provider error");
                counter!("ingest_provider_errors_total", "kind" => kind).increment(1);
                reports.push(SourceReport {
                    source,
                    count: 0,
                    error: Some(reason),
                });
            }
        }
    }

    metrics::gauge!("ingest_last_fetch_ts", "kind" => kind).set(chrono::Utc::now().timestamp() as f64);
    (all, reports)
}

fn outcome_of<T>(name: &str, res: anyhow::Result<Vec<T>>) -> FetchOutcome<T> {
    match res {
        Ok(records) => FetchOutcome::Fetched {
            source: name.to_string(),
            records,
        },
        Err(e) => FetchOutcome::Failed {
            source: name.to_string(),
            reason: format!("{e:#}"),
        },
    }
}

/// Query every job provider in order. A failing provider is isolated: it is
/// logged and yields zero records while the others still contribute.
pub async fn fetch_jobs(providers: &[Box<dyn JobProvider>]) -> (Vec<JobRecord>, Vec<SourceReport>) {
    let mut outcomes = Vec::with_capacity(providers.len());
    for p in providers {
        outcomes.push(outcome_of(p.name(), p.fetch_jobs().await));
    }
    collect_outcomes(outcomes, "jobs")
}

/// Same isolation rules as [`fetch_jobs`], for RSS/Atom feeds.
pub async fn fetch_news(providers: &[Box<dyn NewsProvider>]) -> (Vec<NewsItem>, Vec<SourceReport>) {
    let mut outcomes = Vec::with_capacity(providers.len());
    for p in providers {
        outcomes.push(outcome_of(p.name(), p.fetch_news().await));
    }
    collect_outcomes(outcomes, "news")
}
