//! # Dashboard document
//! The single persisted document behind `GET/POST /dashboard`: market status,
//! KPIs, alerts, insights, the pushed jobs snapshot and a rolling history.
//!
//! The document is only ever replaced whole through [`DocumentStore::save`].
//! Fields this version does not know about are carried through unchanged.

pub mod merge;
pub mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::store::{BlobStore, StoreError};

pub const DOCUMENT_KEY: &str = "dashboard_data";
pub const SCHEMA_VERSION: &str = "1.0";
pub const DEFAULT_MARKET_STATUS: &str = "Initializing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default = "schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub update_source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            schema_version: schema_version(),
            created_at: None,
            last_updated: None,
            update_source: None,
            extra: Map::new(),
        }
    }
}

/// Crawler-curated job list, replaced wholesale on every push that carries one.
///
/// `jobs` stays loosely typed on disk; readers run every entry back through
/// the snapshot field map before serving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobsSnapshot {
    #[serde(default)]
    pub fetched_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default)]
    pub market_status: Option<String>,
    #[serde(default, deserialize_with = "kpi_map")]
    pub kpi_snapshot: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alert_count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub insight_count: usize,
    #[serde(default)]
    pub update_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Meta,
    #[serde(default = "default_market_status", deserialize_with = "market_status_or_default")]
    pub market_status: String,
    #[serde(default, deserialize_with = "kpi_map")]
    pub kpi_updates: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trend_alerts: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_insights: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs_snapshot: Option<JobsSnapshot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DashboardDocument {
    /// Fresh document as created on first access.
    pub fn skeleton(now: DateTime<Utc>) -> Self {
        Self {
            meta: Meta {
                created_at: Some(format_ts(now)),
                ..Meta::default()
            },
            market_status: default_market_status(),
            kpi_updates: BTreeMap::new(),
            trend_alerts: Vec::new(),
            new_insights: Vec::new(),
            jobs_snapshot: None,
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Whole seconds since `meta.last_updated`; `None` if never updated or unparseable.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        let last = parse_ts(self.meta.last_updated.as_deref()?)?;
        Some((now - last).num_seconds())
    }
}

fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_market_status() -> String {
    DEFAULT_MARKET_STATUS.to_string()
}

/// Hand-edited documents sometimes carry `null` where a value belongs.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn market_status_or_default<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_else(default_market_status))
}

/// KPI maps written by older pushers may hold numbers; keep them as text.
fn kpi_map<'de, D>(de: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Map<String, Value>>::deserialize(de)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, text)
        })
        .collect())
}

/// RFC 3339, UTC, millisecond precision.
pub fn format_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp; offset-less timestamps are taken as UTC.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|n| n.and_utc())
}

/// Loads and saves the dashboard document through a [`BlobStore`].
#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn BlobStore>,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Stored document without side effects; `Ok(None)` if nothing is stored.
    pub fn read(&self) -> Result<Option<DashboardDocument>, StoreError> {
        let Some(bytes) = self.store.read(DOCUMENT_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn load(&self) -> DashboardDocument {
        self.load_at(Utc::now())
    }

    /// Current document, or a skeleton when none is stored yet. A missing
    /// document is persisted on first access so `created_at` stays stable;
    /// an unreadable one is left on disk for inspection.
    pub fn load_at(&self, now: DateTime<Utc>) -> DashboardDocument {
        match self.read() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                let doc = DashboardDocument::skeleton(now);
                match self.save(&doc) {
                    Ok(()) => info!(target: "dashboard", "created dashboard document"),
                    Err(e) => warn!(target: "dashboard", error = %e, "could not persist new document"),
                }
                doc
            }
            Err(e) => {
                warn!(target: "dashboard", error = %e, "stored document unreadable; serving skeleton");
                DashboardDocument::skeleton(now)
            }
        }
    }

    /// Base document for a merge. Unlike [`load_at`](Self::load_at) an
    /// unreadable stored document is an error, so a push never replaces it
    /// with a merged skeleton.
    pub fn load_for_update(&self, now: DateTime<Utc>) -> Result<DashboardDocument, StoreError> {
        Ok(self
            .read()?
            .unwrap_or_else(|| DashboardDocument::skeleton(now)))
    }

    /// Replace the stored document. On error the previous document is intact.
    pub fn save(&self, doc: &DashboardDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.store.write_atomic(DOCUMENT_KEY, &bytes)
    }
}
