// src/ingest/normalize.rs
//! Field-mapping tables and the single routine that turns a raw upstream
//! object into a [`JobRecord`].
//!
//! Every upstream (job API, pushed snapshot, crawler file) describes where its
//! fields live as an ordered list of candidate keys. The first present,
//! non-empty value wins.

use serde_json::{Map, Value};

use crate::ingest::clean_snippet;
use crate::ingest::types::JobRecord;

pub const SNIPPET_MAX_CHARS: usize = 250;
pub const LIVE_TAG_CAP: usize = 6;
pub const SNAPSHOT_TAG_CAP: usize = 8;

/// Label used when nothing in the record identifies its origin.
pub const GENERIC_SOURCE_LABEL: &str = "Other";

/// Known upstream identifiers (lowercase needle → display label).
const KNOWN_SOURCES: &[(&str, &str)] = &[
    ("remotive", "Remotive"),
    ("remoteok", "RemoteOK"),
    ("remote ok", "RemoteOK"),
    ("arbeitnow", "Arbeitnow"),
    ("hunter", "Hunter"),
    ("linkedin", "LinkedIn"),
    ("indeed", "Indeed"),
    ("glassdoor", "Glassdoor"),
    ("wellfound", "Wellfound"),
    ("weworkremotely", "We Work Remotely"),
    ("greenhouse", "Greenhouse"),
    ("lever.co", "Lever"),
];

#[derive(Debug, Clone, Copy)]
pub enum TypeFallback {
    /// Use this literal when no type key is present.
    Literal(&'static str),
    /// Read a boolean flag: `true` ⇒ "Remote", otherwise the given label.
    RemoteFlag {
        key: &'static str,
        otherwise: &'static str,
    },
}

pub type UrlFallback = fn(&Map<String, Value>) -> Option<String>;

/// Where each canonical field lives in one upstream's raw objects.
#[derive(Clone, Copy)]
pub struct FieldMap {
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub employment_type: &'static [&'static str],
    pub posted: &'static [&'static str],
    pub url: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub snippet: &'static [&'static str],
    pub source: &'static [&'static str],
    pub default_location: &'static str,
    pub type_fallback: TypeFallback,
    pub url_fallback: Option<UrlFallback>,
    /// Label for records that carry no explicit or inferable source.
    pub default_source: &'static str,
    pub tag_cap: usize,
    pub snippet_cap: usize,
}

pub const REMOTIVE_FIELDS: FieldMap = FieldMap {
    title: &["title"],
    company: &["company_name"],
    location: &["candidate_required_location"],
    salary: &["salary"],
    employment_type: &[],
    posted: &["publication_date"],
    url: &["url"],
    tags: &["tags"],
    snippet: &["description"],
    source: &[],
    default_location: "Anywhere",
    type_fallback: TypeFallback::Literal("Remote"),
    url_fallback: None,
    default_source: "Remotive",
    tag_cap: LIVE_TAG_CAP,
    snippet_cap: SNIPPET_MAX_CHARS,
};

pub const REMOTEOK_FIELDS: FieldMap = FieldMap {
    title: &["position", "title"],
    company: &["company"],
    location: &["location"],
    salary: &[],
    employment_type: &[],
    posted: &["date"],
    url: &["url", "apply_url"],
    tags: &["tags"],
    snippet: &["description"],
    source: &[],
    default_location: "Remote",
    type_fallback: TypeFallback::Literal("Remote"),
    url_fallback: Some(remoteok_slug_url),
    default_source: "RemoteOK",
    tag_cap: LIVE_TAG_CAP,
    snippet_cap: SNIPPET_MAX_CHARS,
};

pub const ARBEITNOW_FIELDS: FieldMap = FieldMap {
    title: &["title"],
    company: &["company_name"],
    location: &["location"],
    salary: &[],
    employment_type: &[],
    posted: &["created_at"],
    url: &["url"],
    tags: &["tags"],
    snippet: &["description"],
    source: &[],
    default_location: "",
    type_fallback: TypeFallback::RemoteFlag {
        key: "remote",
        otherwise: "Full-time",
    },
    url_fallback: None,
    default_source: "Arbeitnow",
    tag_cap: LIVE_TAG_CAP,
    snippet_cap: SNIPPET_MAX_CHARS,
};

/// Jobs embedded in a pushed `jobs_snapshot`. Accepts the canonical shape,
/// the crawler's historical names, and raw job-board names.
pub const SNAPSHOT_FIELDS: FieldMap = FieldMap {
    title: &["title", "job_title", "position", "name"],
    company: &["company", "company_name", "employer"],
    location: &["location", "candidate_required_location", "job_location"],
    salary: &["salary", "salary_range", "compensation"],
    employment_type: &["type", "employment_type", "job_type"],
    posted: &["posted_at", "posted", "publication_date", "date", "created_at"],
    url: &["url", "job_url", "apply_url", "link"],
    tags: &["tags", "skills"],
    snippet: &["description_snippet", "snippet", "description", "summary"],
    source: &["source", "source_label"],
    default_location: "Remote",
    type_fallback: TypeFallback::Literal(""),
    url_fallback: None,
    default_source: "Hunter",
    tag_cap: SNAPSHOT_TAG_CAP,
    snippet_cap: SNIPPET_MAX_CHARS,
};

/// Crawler output read by the push tool before it is sent upstream.
pub const CRAWLER_FIELDS: FieldMap = FieldMap {
    title: &["title", "job_title"],
    company: &["company", "company_name"],
    location: &["location", "candidate_required_location"],
    salary: &["salary"],
    employment_type: &["type", "employment_type"],
    posted: &["posted_at", "posted", "publication_date", "date"],
    url: &["url", "job_url"],
    tags: &["tags"],
    snippet: &["description_snippet", "snippet"],
    source: &["source"],
    default_location: "Remote",
    type_fallback: TypeFallback::Literal(""),
    url_fallback: None,
    default_source: "Hunter",
    tag_cap: usize::MAX,
    snippet_cap: 220,
};

fn remoteok_slug_url(obj: &Map<String, Value>) -> Option<String> {
    let slug = scalar_text(obj.get("slug")?)?;
    Some(format!("https://remoteok.com/remote-jobs/{slug}"))
}

/// Normalize one raw upstream object. Returns `None` when the record has no
/// title or no URL after normalization.
pub fn normalize_job(raw: &Value, map: &FieldMap) -> Option<JobRecord> {
    let obj = raw.as_object()?;

    let title = first_text(obj, map.title)?;
    let url = first_text(obj, map.url).or_else(|| map.url_fallback.and_then(|f| f(obj)))?;

    let employment_type = first_text(obj, map.employment_type).unwrap_or_else(|| {
        match map.type_fallback {
            TypeFallback::Literal(s) => s.to_string(),
            TypeFallback::RemoteFlag { key, otherwise } => {
                if obj.get(key).and_then(Value::as_bool).unwrap_or(false) {
                    "Remote".to_string()
                } else {
                    otherwise.to_string()
                }
            }
        }
    });

    let explicit_source = first_text(obj, map.source);
    let source = resolve_source_label(explicit_source.as_deref(), &url, map.default_source);

    Some(JobRecord {
        title,
        company: first_text(obj, map.company).unwrap_or_default(),
        location: first_text(obj, map.location)
            .unwrap_or_else(|| map.default_location.to_string()),
        salary: first_text(obj, map.salary).unwrap_or_default(),
        employment_type,
        posted: first_text(obj, map.posted).unwrap_or_default(),
        url,
        tags: first_tags(obj, map.tags, map.tag_cap),
        source,
        snippet: first_text(obj, map.snippet)
            .map(|s| clean_snippet(&s, map.snippet_cap))
            .unwrap_or_default(),
    })
}

/// Normalize a batch, dropping unsalvageable records.
pub fn normalize_all<'a, I>(raws: I, map: &FieldMap) -> Vec<JobRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    raws.into_iter()
        .filter_map(|r| normalize_job(r, map))
        .collect()
}

/// Source label resolution: an explicit label wins, mapped to its canonical
/// spelling when it names a known upstream; without one, the URL is searched
/// for a known identifier; failing that, `default`.
pub fn resolve_source_label(explicit: Option<&str>, url: &str, default: &str) -> String {
    if let Some(label) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return known_source(label).unwrap_or(label).to_string();
    }
    if let Some(known) = known_source(url) {
        return known.to_string();
    }
    if default.is_empty() {
        GENERIC_SOURCE_LABEL.to_string()
    } else {
        default.to_string()
    }
}

fn known_source(haystack: &str) -> Option<&'static str> {
    let h = haystack.to_lowercase();
    KNOWN_SOURCES
        .iter()
        .find(|(needle, _)| h.contains(needle))
        .map(|(_, label)| *label)
}

/// Strings are trimmed; numbers and booleans are rendered; anything else is absent.
fn scalar_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(scalar_text))
}

/// Tags must be list-shaped; anything else yields no tags. Source order is kept.
fn first_tags(obj: &Map<String, Value>, keys: &[&str], cap: usize) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|k| obj.get(*k)) else {
        return Vec::new();
    };
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).take(cap).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_present_alternate_key_wins() {
        let raw = json!({
            "job_title": "Data Engineer",
            "name": "ignored",
            "job_url": "https://example.com/1",
        });
        let j = normalize_job(&raw, &SNAPSHOT_FIELDS).unwrap();
        assert_eq!(j.title, "Data Engineer");
        assert_eq!(j.url, "https://example.com/1");
    }

    #[test]
    fn empty_values_fall_through_to_next_key() {
        let raw = json!({ "title": "  ", "job_title": "SRE", "url": "https://x.io" });
        let j = normalize_job(&raw, &SNAPSHOT_FIELDS).unwrap();
        assert_eq!(j.title, "SRE");
    }

    #[test]
    fn missing_title_or_url_is_discarded() {
        assert!(normalize_job(&json!({ "title": "X" }), &SNAPSHOT_FIELDS).is_none());
        assert!(normalize_job(&json!({ "url": "https://x" }), &SNAPSHOT_FIELDS).is_none());
        assert!(normalize_job(&json!("not an object"), &SNAPSHOT_FIELDS).is_none());
    }

    #[test]
    fn tags_are_coerced_and_capped() {
        let raw = json!({ "title": "T", "url": "u", "tags": "python, rust" });
        assert!(normalize_job(&raw, &SNAPSHOT_FIELDS).unwrap().tags.is_empty());

        let raw = json!({
            "title": "T", "url": "u",
            "tags": ["a","b","c","d","e","f","g","h","i","j"]
        });
        let j = normalize_job(&raw, &SNAPSHOT_FIELDS).unwrap();
        assert_eq!(j.tags, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);

        let live = normalize_job(&raw, &REMOTIVE_FIELDS).unwrap();
        assert_eq!(live.tags.len(), LIVE_TAG_CAP);
    }

    #[test]
    fn numeric_fields_are_rendered() {
        let raw = json!({
            "title": "Dev", "url": "https://arbeitnow.com/x",
            "created_at": 1_700_000_000, "remote": true
        });
        let j = normalize_job(&raw, &ARBEITNOW_FIELDS).unwrap();
        assert_eq!(j.posted, "1700000000");
        assert_eq!(j.employment_type, "Remote");

        let onsite = json!({ "title": "Dev", "url": "u", "remote": false });
        let j = normalize_job(&onsite, &ARBEITNOW_FIELDS).unwrap();
        assert_eq!(j.employment_type, "Full-time");
    }

    #[test]
    fn remoteok_url_falls_back_to_slug() {
        let raw = json!({ "position": "Go Dev", "slug": "go-dev-123" });
        let j = normalize_job(&raw, &REMOTEOK_FIELDS).unwrap();
        assert_eq!(j.url, "https://remoteok.com/remote-jobs/go-dev-123");
        assert_eq!(j.location, "Remote");
        assert_eq!(j.source, "RemoteOK");
    }

    #[test]
    fn source_label_resolution() {
        assert_eq!(resolve_source_label(Some("remotive.com"), "", "Hunter"), "Remotive");
        assert_eq!(resolve_source_label(Some("Company site"), "", "Hunter"), "Company site");
        assert_eq!(
            resolve_source_label(None, "https://www.LinkedIn.com/jobs/1", "Hunter"),
            "LinkedIn"
        );
        assert_eq!(resolve_source_label(None, "https://acme.io", "Hunter"), "Hunter");
        assert_eq!(resolve_source_label(None, "https://acme.io", ""), GENERIC_SOURCE_LABEL);
    }

    #[test]
    fn snippet_is_cleaned() {
        let raw = json!({
            "title": "T", "url": "u",
            "description": format!("<p>Hello &amp; <b>welcome</b></p>{}", "x".repeat(400))
        });
        let j = normalize_job(&raw, &REMOTIVE_FIELDS).unwrap();
        assert!(j.snippet.starts_with("Hello & welcome"));
        assert!(j.snippet.chars().count() <= SNIPPET_MAX_CHARS);
    }
}
