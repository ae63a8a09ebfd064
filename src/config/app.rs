// src/config/app.rs
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::FALLBACK_TOKEN;
use crate::cache::DEFAULT_CACHE_TTL;
use crate::relevance::{DEFAULT_RELEVANCE_CONFIG_PATH, ENV_RELEVANCE_CONFIG_PATH};
use crate::snapshot::DEFAULT_SNAPSHOT_MAX_AGE;

pub const ENV_UPDATE_TOKEN: &str = "DASHBOARD_UPDATE_TOKEN";
pub const ENV_REQUIRE_TOKEN: &str = "DASHBOARD_REQUIRE_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Clone)]
pub struct AppConfig {
    pub update_token: String,
    /// True when no token was configured and [`FALLBACK_TOKEN`] is in use.
    pub token_is_fallback: bool,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub cache_ttl: Duration,
    pub snapshot_max_age: Duration,
    pub job_fetch_timeout: Duration,
    pub rss_fetch_timeout: Duration,
    pub relevance_config_path: PathBuf,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("update_token", &"<redacted>")
            .field("token_is_fallback", &self.token_is_fallback)
            .field("data_dir", &self.data_dir)
            .field("static_dir", &self.static_dir)
            .field("cache_ttl", &self.cache_ttl)
            .field("snapshot_max_age", &self.snapshot_max_age)
            .field("job_fetch_timeout", &self.job_fetch_timeout)
            .field("rss_fetch_timeout", &self.rss_fetch_timeout)
            .field("relevance_config_path", &self.relevance_config_path)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Read the process environment (after loading `.env`, if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secs = |k: &str, default: Duration| -> Result<Duration> {
            match get(k) {
                None => Ok(default),
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{k} must be a whole number of seconds, got {v:?}")),
            }
        };

        let require_token = matches!(
            get(ENV_REQUIRE_TOKEN).as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        );
        let (update_token, token_is_fallback) = match get(ENV_UPDATE_TOKEN) {
            Some(t) => (t, false),
            None if require_token => {
                bail!("{ENV_UPDATE_TOKEN} is not set and {ENV_REQUIRE_TOKEN}=1 forbids the fallback token")
            }
            None => (FALLBACK_TOKEN.to_string(), true),
        };

        let log_format = match get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            update_token,
            token_is_fallback,
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".into())),
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "static".into())),
            cache_ttl: secs("CACHE_TTL_SECS", DEFAULT_CACHE_TTL)?,
            snapshot_max_age: secs("SNAPSHOT_MAX_AGE_SECS", DEFAULT_SNAPSHOT_MAX_AGE)?,
            job_fetch_timeout: secs("JOB_FETCH_TIMEOUT_SECS", Duration::from_secs(15))?,
            rss_fetch_timeout: secs("RSS_FETCH_TIMEOUT_SECS", Duration::from_secs(12))?,
            relevance_config_path: PathBuf::from(
                get(ENV_RELEVANCE_CONFIG_PATH)
                    .unwrap_or_else(|| DEFAULT_RELEVANCE_CONFIG_PATH.into()),
            ),
            log_format,
        })
    }
}
