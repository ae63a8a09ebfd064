// src/ingest/providers/remotive.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::normalize::{normalize_all, REMOTIVE_FIELDS};
use crate::ingest::providers::get_text;
use crate::ingest::types::{JobProvider, JobRecord};

const API_URL: &str = "https://remotive.com/api/remote-jobs";
const CATEGORIES: [&str; 2] = ["software-dev", "data"];
const PER_CATEGORY: usize = 25;

pub struct RemotiveProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RemotiveProvider {
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

    /// `{"jobs": [...]}` → normalized records.
    pub fn parse_body(body: &str) -> Result<Vec<JobRecord>> {
        let v: Value = serde_json::from_str(body).context("parsing remotive json")?;
        let jobs = v
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("remotive response has no `jobs` array"))?;
        Ok(normalize_all(jobs.iter().take(PER_CATEGORY), &REMOTIVE_FIELDS))
    }
}

#[async_trait]
impl JobProvider for RemotiveProvider {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_body(s),
            Mode::Http { client } => {
                let mut out = Vec::new();
                for cat in CATEGORIES {
                    let url = format!("{API_URL}?category={cat}&limit={PER_CATEGORY}");
                    match get_text(client, &url).await.and_then(|b| Self::parse_body(&b)) {
                        Ok(mut jobs) => out.append(&mut jobs),
                        // keep what earlier categories produced
                        Err(e) if !out.is_empty() => {
                            tracing::warn!(target: "ingest", provider = "Remotive", category = cat, error = ?e, "category fetch failed");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(out)
            }
        }
    }

    fn name(&self) -> &str {
        "Remotive"
    }
}
