// src/relevance.rs
//! Relevance gate for job records.
//!
//! Exclusion wins: a title containing any excluded role keyword is rejected
//! no matter what its tags say. Otherwise a record passes when title + tags
//! mention an inclusion keyword or when one of its tags is a known technology.
//!
//! Keyword lists come from `config/relevance.toml` (path overridable with
//! `RELEVANCE_CONFIG_PATH`); a missing or broken file falls back to the
//! built-in lists, and a file may override any subset of the three lists.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::ingest::types::JobRecord;

pub const DEFAULT_RELEVANCE_CONFIG_PATH: &str = "config/relevance.toml";
pub const ENV_RELEVANCE_CONFIG_PATH: &str = "RELEVANCE_CONFIG_PATH";

/// Administrative, sales, medical, hospitality and trade roles.
const EXCLUDE_TITLE: &[&str] = &[
    "account manager",
    "account executive",
    "sales representative",
    "sales associate",
    "business development representative",
    "office assistant",
    "administrative assistant",
    "executive assistant",
    "receptionist",
    "secretary",
    "bookkeeper",
    "data entry",
    "customer service representative",
    "call center",
    "nurse",
    "physician",
    "pharmacist",
    "dental",
    "caregiver",
    "medical assistant",
    "therapist",
    "chef",
    "line cook",
    "bartender",
    "waiter",
    "waitress",
    "barista",
    "housekeeper",
    "housekeeping",
    "electrician",
    "plumber",
    "welder",
    "carpenter",
    "hvac technician",
    "truck driver",
];

/// Software, data, cloud, security and engineering role families.
const INCLUDE: &[&str] = &[
    "engineer",
    "developer",
    "software",
    "programmer",
    "data",
    "machine learning",
    "devops",
    "sre",
    "site reliability",
    "cloud",
    "security",
    "cyber",
    "backend",
    "back-end",
    "frontend",
    "front-end",
    "full stack",
    "fullstack",
    "full-stack",
    "architect",
    "infrastructure",
    "platform",
    "database",
    "sysadmin",
    "system administrator",
    "network",
    "scientist",
    "tech lead",
];

const TECH_TAGS: &[&str] = &[
    "python", "rust", "go", "golang", "java", "javascript", "typescript", "react", "node",
    "nodejs", "vue", "angular", "django", "rails", "ruby", "php", "kotlin", "swift", "scala",
    "c++", "c#", ".net", "sql", "postgresql", "mysql", "mongodb", "redis", "graphql", "aws",
    "azure", "gcp", "kubernetes", "docker", "terraform", "linux", "devops", "ml", "ai",
    "security", "data",
];

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct RelevanceRoot {
    #[serde(default)]
    relevance: RelevanceSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RelevanceSection {
    exclude_title: Option<Vec<String>>,
    include: Option<Vec<String>>,
    tech_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    exclude_title: Vec<String>,
    include: Vec<String>,
    tech_tags: HashSet<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl RelevanceFilter {
    /// Built-in keyword lists.
    pub fn default_seed() -> Self {
        Self::from_lists(
            EXCLUDE_TITLE.iter().copied(),
            INCLUDE.iter().copied(),
            TECH_TAGS.iter().copied(),
        )
    }

    fn from_lists<'a>(
        exclude_title: impl IntoIterator<Item = &'a str>,
        include: impl IntoIterator<Item = &'a str>,
        tech_tags: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let clean = |s: &str| {
            let t = s.trim().to_lowercase();
            (!t.is_empty()).then_some(t)
        };
        Self {
            exclude_title: exclude_title.into_iter().filter_map(clean).collect(),
            include: include.into_iter().filter_map(clean).collect(),
            tech_tags: tech_tags.into_iter().filter_map(clean).collect(),
        }
    }

    /// Parse a TOML document; lists it omits keep their built-in values.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: RelevanceRoot = toml::from_str(toml_str)?;
        let sec = root.relevance;
        let pick = |over: &Option<Vec<String>>, seed: &'static [&'static str]| -> Vec<String> {
            match over {
                Some(v) => v.clone(),
                None => seed.iter().map(|s| s.to_string()).collect(),
            }
        };
        let exclude = pick(&sec.exclude_title, EXCLUDE_TITLE);
        let include = pick(&sec.include, INCLUDE);
        let tags = pick(&sec.tech_tags, TECH_TAGS);
        Ok(Self::from_lists(
            exclude.iter().map(String::as_str),
            include.iter().map(String::as_str),
            tags.iter().map(String::as_str),
        ))
    }

    /// Load from a TOML file, falling back to [`default_seed`](Self::default_seed).
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                info!(target: "relevance", path = %path.display(), error = %e, "no relevance config; using built-in lists");
                return Self::default_seed();
            }
        };
        match Self::from_toml_str(&content) {
            Ok(f) => f,
            Err(e) => {
                warn!(target: "relevance", path = %path.display(), error = %e, "invalid relevance config; using built-in lists");
                Self::default_seed()
            }
        }
    }

    pub fn is_relevant(&self, job: &JobRecord) -> bool {
        let title = job.title.to_lowercase();
        if self.exclude_title.iter().any(|k| title.contains(k.as_str())) {
            return false;
        }

        let tags: Vec<String> = job.tags.iter().map(|t| t.trim().to_lowercase()).collect();
        let text = format!("{} {}", title, tags.join(" "));
        if self.include.iter().any(|k| text.contains(k.as_str())) {
            return true;
        }

        tags.iter().any(|t| self.tech_tags.contains(t))
    }

    /// Keep only relevant records, preserving order.
    pub fn retain(&self, jobs: Vec<JobRecord>) -> Vec<JobRecord> {
        jobs.into_iter().filter(|j| self.is_relevant(j)).collect()
    }
}
