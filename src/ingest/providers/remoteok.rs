// src/ingest/providers/remoteok.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::normalize::{normalize_all, REMOTEOK_FIELDS};
use crate::ingest::providers::get_text;
use crate::ingest::types::{JobProvider, JobRecord};

const API_URL: &str = "https://remoteok.com/api";
const MAX_ITEMS: usize = 29;

pub struct RemoteOkProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RemoteOkProvider {
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    /// Top-level array whose first element is a legal/metadata notice.
    pub fn parse_body(body: &str) -> Result<Vec<JobRecord>> {
        let v: Value = serde_json::from_str(body).context("parsing remoteok json")?;
        let items = v
            .as_array()
            .ok_or_else(|| anyhow!("remoteok response is not an array"))?;
        let jobs = items
            .iter()
            .skip(1)
            .take(MAX_ITEMS)
            .filter(|j| j.is_object());
        Ok(normalize_all(jobs, &REMOTEOK_FIELDS))
    }
}

#[async_trait]
impl JobProvider for RemoteOkProvider {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_body(s),
            Mode::Http { client } => {
                let body = get_text(client, API_URL).await?;
                Self::parse_body(&body)
            }
        }
    }

    fn name(&self) -> &str {
        "RemoteOK"
    }
}
