// src/ingest/providers/mod.rs
pub mod arbeitnow;
pub mod remoteok;
pub mod remotive;
pub mod rss;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::ingest::types::{JobProvider, NewsProvider};

pub const USER_AGENT: &str = "Mozilla/5.0 ITJobsDashboard/2.0";

/// Shared client for one upstream family; `timeout` bounds each request.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .timeout(timeout)
        .build()
        .context("building upstream http client")
}

pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} status"))?;
    resp.text().await.with_context(|| format!("GET {url} body"))
}

/// Live job APIs in their fixed query order.
pub fn default_job_providers(client: reqwest::Client) -> Vec<Box<dyn JobProvider>> {
    vec![
        Box::new(remotive::RemotiveProvider::from_client(client.clone())),
        Box::new(remoteok::RemoteOkProvider::from_client(client.clone())),
        Box::new(arbeitnow::ArbeitnowProvider::from_client(client)),
    ]
}

/// Technology news feeds in their fixed query order.
pub fn default_news_providers(client: reqwest::Client) -> Vec<Box<dyn NewsProvider>> {
    rss::DEFAULT_FEEDS
        .iter()
        .map(|(name, url)| {
            Box::new(rss::RssFeedProvider::from_url(name, url, client.clone()))
                as Box<dyn NewsProvider>
        })
        .collect()
}
