use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured cache TTL.
    pub fn init(cache_ttl: Duration) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("cache_hits_total", "Freshness cache hits per category.");
        describe_counter!("cache_misses_total", "Freshness cache misses per category.");
        describe_counter!(
            "jobs_resolved_total",
            "Job list resolutions by provenance (external_snapshot, local_cache, live_fetch)."
        );
        describe_counter!("dashboard_updates_total", "Accepted dashboard pushes.");
        describe_counter!(
            "dashboard_update_rejections_total",
            "Rejected dashboard pushes by reason."
        );

        gauge!("cache_ttl_seconds").set(cache_ttl.as_secs_f64());

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
