//! Push a crawler job file to the dashboard as a `jobs_snapshot`.
//!
//! Usage: `push-jobs-snapshot <jobs.json>`
//! Env: `DASHBOARD_URL`, `DASHBOARD_UPDATE_TOKEN`, `PUSH_SOURCE_LABEL`.
//! Exit codes: 0 ok, 1 rejected or failed, 2 usage, 3 no jobs stored.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use it_jobs_dashboard::hunter::{
    build_payload, evaluate_response, normalize_crawler_jobs, push, read_crawler_output,
    DEFAULT_DASHBOARD_URL, DEFAULT_SOURCE_LABEL,
};
use it_jobs_dashboard::ingest::providers::USER_AGENT;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: push-jobs-snapshot <jobs_json_path>");
        return ExitCode::from(2);
    };
    let token = env_or("DASHBOARD_UPDATE_TOKEN", "");
    if token.is_empty() {
        eprintln!("DASHBOARD_UPDATE_TOKEN must be set");
        return ExitCode::from(2);
    }

    match run(&path, &token).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = ?e, "push failed");
            ExitCode::from(1)
        }
    }
}

async fn run(path: &str, token: &str) -> anyhow::Result<u8> {
    let base_url = env_or("DASHBOARD_URL", DEFAULT_DASHBOARD_URL);
    let label = env_or("PUSH_SOURCE_LABEL", DEFAULT_SOURCE_LABEL);

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let out = read_crawler_output(&text)?;
    let jobs = normalize_crawler_jobs(&out.jobs);
    tracing::info!(input = out.jobs.len(), valid = jobs.len(), "normalized crawler jobs");

    let payload = build_payload(&out, &jobs, &label, Utc::now());
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;

    let reply = push(&client, &base_url, token, &payload).await?;
    println!("{reply}");

    let verdict = evaluate_response(&reply, jobs.len());
    Ok(verdict.exit_code() as u8)
}
