//! Field-level merge of an [`UpdatePayload`] into a [`DashboardDocument`].
//! Pure: no I/O, `current` is never modified.

use chrono::{DateTime, Utc};

use super::validate::{UpdatePayload, MAX_SNAPSHOT_JOBS};
use super::{format_ts, DashboardDocument, HistoryEntry, JobsSnapshot, Meta, SCHEMA_VERSION};
use crate::ingest::normalize::{normalize_all, SNAPSHOT_FIELDS};

pub const TREND_ALERTS_CAP: usize = 100;
pub const NEW_INSIGHTS_CAP: usize = 50;
pub const HISTORY_CAP: usize = 50;
pub const DEFAULT_UPDATE_SOURCE: &str = "atlas";

pub fn merge(
    current: &DashboardDocument,
    payload: &UpdatePayload,
    now: DateTime<Utc>,
) -> DashboardDocument {
    let mut merged = current.clone();

    let stamp = payload.timestamp.clone().unwrap_or_else(|| format_ts(now));
    let update_source = payload
        .update_source
        .clone()
        .or_else(|| current.meta.update_source.clone())
        .unwrap_or_else(|| DEFAULT_UPDATE_SOURCE.to_string());

    merged.meta = Meta {
        schema_version: SCHEMA_VERSION.to_string(),
        created_at: Some(
            current
                .meta
                .created_at
                .clone()
                .unwrap_or_else(|| stamp.clone()),
        ),
        last_updated: Some(stamp.clone()),
        update_source: Some(update_source.clone()),
        extra: current.meta.extra.clone(),
    };

    if let Some(status) = &payload.market_status {
        merged.market_status = status.clone();
    }

    if let Some(kpis) = &payload.kpi_updates {
        merged
            .kpi_updates
            .extend(kpis.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    if let Some(alerts) = &payload.trend_alerts {
        merged.trend_alerts = prepend_capped(alerts, &current.trend_alerts, TREND_ALERTS_CAP);
    }

    if let Some(insights) = &payload.new_insights {
        merged.new_insights = prepend_capped(insights, &current.new_insights, NEW_INSIGHTS_CAP);
    }

    // A stored document may already exceed the caps.
    merged.trend_alerts.truncate(TREND_ALERTS_CAP);
    merged.new_insights.truncate(NEW_INSIGHTS_CAP);

    if let Some(snap) = &payload.jobs_snapshot {
        let jobs = normalize_all(snap.jobs.iter().take(MAX_SNAPSHOT_JOBS), &SNAPSHOT_FIELDS);
        let jobs: Vec<_> = jobs
            .iter()
            .filter_map(|j| serde_json::to_value(j).ok())
            .collect();
        merged.jobs_snapshot = Some(JobsSnapshot {
            fetched_at: Some(snap.fetched_at.clone().unwrap_or_else(|| format_ts(now))),
            updated_at: Some(format_ts(now)),
            source: update_source.clone(),
            sources: snap.sources.clone(),
            total: jobs.len(),
            jobs,
        });
    }

    merged.history.push(HistoryEntry {
        timestamp: stamp,
        market_status: payload.market_status.clone(),
        kpi_snapshot: payload.kpi_updates.clone().unwrap_or_default(),
        alert_count: payload.trend_alerts.as_ref().map_or(0, Vec::len),
        insight_count: payload.new_insights.as_ref().map_or(0, Vec::len),
        update_source: Some(update_source),
    });
    if merged.history.len() > HISTORY_CAP {
        let excess = merged.history.len() - HISTORY_CAP;
        merged.history.drain(0..excess);
    }

    merged
}

fn prepend_capped<T: Clone>(newer: &[T], older: &[T], cap: usize) -> Vec<T> {
    newer.iter().chain(older).take(cap).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::validate::{validate_payload, SnapshotPayload};
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap()
    }

    // Small deterministic generator for randomized documents/payloads.
    struct Lcg(u64);
    impl Lcg {
        fn new(seed: u64) -> Self {
            Self(seed)
        }
        fn next_usize(&mut self, n: usize) -> usize {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((self.0 >> 32) as usize) % n.max(1)
        }
        fn coin(&mut self) -> bool {
            self.next_usize(2) == 1
        }
    }

    fn random_doc(rng: &mut Lcg) -> DashboardDocument {
        let mut d = DashboardDocument::skeleton(t0());
        d.market_status = format!("status-{}", rng.next_usize(5));
        for i in 0..rng.next_usize(6) {
            d.kpi_updates.insert(format!("k{i}"), format!("{}", rng.next_usize(1000)));
        }
        d.trend_alerts = (0..rng.next_usize(130)).map(|i| json!({"old": i})).collect();
        d.new_insights = (0..rng.next_usize(70)).map(|i| json!({"old": i})).collect();
        d.history = (0..rng.next_usize(60))
            .map(|i| HistoryEntry {
                timestamp: format!("h{i}"),
                ..Default::default()
            })
            .collect();
        if rng.coin() {
            d.jobs_snapshot = Some(JobsSnapshot {
                total: 1,
                jobs: vec![json!({"title": "Old", "url": "https://old"})],
                ..Default::default()
            });
        }
        d
    }

    fn random_payload(rng: &mut Lcg) -> UpdatePayload {
        let mut p = UpdatePayload::default();
        if rng.coin() {
            p.market_status = Some("Hot".into());
        }
        if rng.coin() {
            let mut k = BTreeMap::new();
            k.insert("k0".to_string(), "new".to_string());
            k.insert("fresh".to_string(), "1".to_string());
            p.kpi_updates = Some(k);
        }
        if rng.coin() {
            p.trend_alerts = Some((0..rng.next_usize(120)).map(|i| json!({"new": i})).collect());
        }
        if rng.coin() {
            p.new_insights = Some((0..rng.next_usize(60)).map(|i| json!({"new": i})).collect());
        }
        p
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut rng = Lcg::new(0x5EED_2025_0106);
        for _ in 0..200 {
            let d = random_doc(&mut rng);
            let p = random_payload(&mut rng);
            let m = merge(&d, &p, t0());

            if p.market_status.is_none() {
                assert_eq!(m.market_status, d.market_status);
            }
            if p.kpi_updates.is_none() {
                assert_eq!(m.kpi_updates, d.kpi_updates);
            }
            if p.trend_alerts.is_none() {
                let kept = d.trend_alerts.len().min(TREND_ALERTS_CAP);
                assert_eq!(m.trend_alerts, d.trend_alerts[..kept]);
            }
            if p.new_insights.is_none() {
                let kept = d.new_insights.len().min(NEW_INSIGHTS_CAP);
                assert_eq!(m.new_insights, d.new_insights[..kept]);
            }
            assert_eq!(m.jobs_snapshot, d.jobs_snapshot);
            assert_eq!(m.meta.created_at, d.meta.created_at);
        }
    }

    #[test]
    fn history_grows_by_one_up_to_cap() {
        let mut rng = Lcg::new(42);
        for _ in 0..200 {
            let d = random_doc(&mut rng);
            let p = random_payload(&mut rng);
            let m = merge(&d, &p, t0());
            assert_eq!(m.history.len(), (d.history.len() + 1).min(HISTORY_CAP));
            // newest last, oldest dropped first
            assert_eq!(m.history.last().unwrap().market_status, p.market_status);
            if d.history.len() >= HISTORY_CAP {
                assert_eq!(m.history[0], d.history[d.history.len() + 1 - HISTORY_CAP]);
            }
        }
    }

    #[test]
    fn capped_lists_put_new_entries_first() {
        let mut rng = Lcg::new(7);
        for _ in 0..200 {
            let d = random_doc(&mut rng);
            let p = random_payload(&mut rng);
            let m = merge(&d, &p, t0());
            assert!(m.trend_alerts.len() <= TREND_ALERTS_CAP);
            assert!(m.new_insights.len() <= NEW_INSIGHTS_CAP);

            if let Some(new) = &p.trend_alerts {
                let shown = new.len().min(TREND_ALERTS_CAP);
                assert_eq!(&m.trend_alerts[..shown], &new[..shown]);
                if shown < m.trend_alerts.len() {
                    assert_eq!(m.trend_alerts[shown], d.trend_alerts[0]);
                }
            }
        }
    }

    #[test]
    fn oversized_stored_lists_are_clamped_on_any_merge() {
        let mut d = DashboardDocument::skeleton(t0());
        d.trend_alerts = (0..130).map(|i| json!({"old": i})).collect();
        d.new_insights = (0..70).map(|i| json!({"old": i})).collect();
        let p = UpdatePayload {
            market_status: Some("Hot".into()),
            ..Default::default()
        };

        let m = merge(&d, &p, t0());
        assert_eq!(m.trend_alerts.len(), TREND_ALERTS_CAP);
        assert_eq!(m.new_insights.len(), NEW_INSIGHTS_CAP);
        assert_eq!(m.trend_alerts[0], json!({"old": 0}));
        assert_eq!(m.new_insights[49], json!({"old": 49}));
    }

    #[test]
    fn kpis_merge_by_key() {
        let mut d = DashboardDocument::skeleton(t0());
        d.kpi_updates.insert("a".into(), "1".into());
        d.kpi_updates.insert("b".into(), "2".into());
        let p = validate_payload(json!({"kpi_updates": {"b": "20", "c": 3}})).unwrap();

        let m = merge(&d, &p, t0());
        assert_eq!(m.kpi_updates["a"], "1");
        assert_eq!(m.kpi_updates["b"], "20");
        assert_eq!(m.kpi_updates["c"], "3");
        assert_eq!(d.kpi_updates["b"], "2", "input document untouched");
    }

    #[test]
    fn snapshot_replaced_with_valid_jobs_only() {
        let mut d = DashboardDocument::skeleton(t0());
        d.jobs_snapshot = Some(JobsSnapshot {
            total: 1,
            jobs: vec![json!({"title": "Old", "url": "https://old"})],
            ..Default::default()
        });

        let jobs = vec![
            json!({"title": "Rust Engineer", "url": "https://a", "tags": "not-a-list"}),
            json!({"title": "", "url": "https://b"}),
            json!({"title": "No Url"}),
            json!({"job_title": "Data Engineer", "job_url": "https://c", "tags": ["a","b","c","d","e","f","g","h","i"]}),
        ];
        let p = UpdatePayload {
            update_source: Some("hunter".into()),
            jobs_snapshot: Some(SnapshotPayload {
                fetched_at: Some("2025-01-06T09:00:00Z".into()),
                sources: vec!["Remotive".into()],
                jobs,
            }),
            ..Default::default()
        };

        let m = merge(&d, &p, t0());
        let snap = m.jobs_snapshot.unwrap();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.jobs.len(), 2);
        assert_eq!(snap.source, "hunter");
        assert_eq!(snap.fetched_at.as_deref(), Some("2025-01-06T09:00:00Z"));
        assert_eq!(snap.updated_at, Some(format_ts(t0())));
        assert!(snap.jobs.iter().all(|j| j["title"] != "Old"));
        assert_eq!(snap.jobs[0]["tags"], json!([]));
        assert_eq!(snap.jobs[1]["tags"].as_array().map(Vec::len), Some(8));
        assert_eq!(snap.jobs[1]["title"], Value::from("Data Engineer"));
    }

    #[test]
    fn meta_timestamps_and_source_resolution() {
        let d = DashboardDocument::skeleton(t0());
        let created = d.meta.created_at.clone();

        let later = t0() + chrono::Duration::minutes(5);
        let m = merge(&d, &UpdatePayload::default(), later);
        assert_eq!(m.meta.last_updated, Some(format_ts(later)));
        assert_eq!(m.meta.update_source.as_deref(), Some(DEFAULT_UPDATE_SOURCE));
        assert_eq!(m.meta.created_at, created);

        let p = UpdatePayload {
            timestamp: Some("2025-02-01T00:00:00Z".into()),
            update_source: Some("hunter".into()),
            ..Default::default()
        };
        let m2 = merge(&m, &p, later);
        assert_eq!(m2.meta.last_updated.as_deref(), Some("2025-02-01T00:00:00Z"));
        assert_eq!(m2.meta.update_source.as_deref(), Some("hunter"));

        // no explicit source: keep the document's previous one
        let m3 = merge(&m2, &UpdatePayload::default(), later);
        assert_eq!(m3.meta.update_source.as_deref(), Some("hunter"));
        assert_eq!(m3.history.last().unwrap().update_source.as_deref(), Some("hunter"));
    }

    #[test]
    fn unknown_top_level_fields_are_carried() {
        let mut d = DashboardDocument::skeleton(t0());
        d.extra.insert("custom".into(), json!({"keep": true}));
        let m = merge(&d, &UpdatePayload::default(), t0());
        assert_eq!(m.extra["custom"]["keep"], true);
    }
}
