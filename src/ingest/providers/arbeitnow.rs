// src/ingest/providers/arbeitnow.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::normalize::{normalize_all, ARBEITNOW_FIELDS};
use crate::ingest::providers::get_text;
use crate::ingest::types::{JobProvider, JobRecord};

const API_URL: &str = "https://www.arbeitnow.com/api/job-board-api";
const MAX_ITEMS: usize = 25;

pub struct ArbeitnowProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl ArbeitnowProvider {
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

    /// `{"data": [...]}` → normalized records.
    pub fn parse_body(body: &str) -> Result<Vec<JobRecord>> {
        let v: Value = serde_json::from_str(body).context("parsing arbeitnow json")?;
        let jobs = v
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("arbeitnow response has no `data` array"))?;
        Ok(normalize_all(jobs.iter().take(MAX_ITEMS), &ARBEITNOW_FIELDS))
    }
}

#[async_trait]
impl JobProvider for ArbeitnowProvider {
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
        "Arbeitnow"
    }
}
