//! Shape checks for `POST /dashboard` bodies. Every rejection names the
//! offending field so pushers can fix their payload.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// Upper bound on `jobs_snapshot.jobs` per push.
pub const MAX_SNAPSHOT_JOBS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Payload must be a JSON object")]
    NotAnObject,
    #[error("'{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("'jobs_snapshot.jobs' has {count} items (max {max})")]
    TooManyJobs { count: usize, max: usize },
}

impl ValidationError {
    fn wrong(field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::WrongType { field, .. } => Some(field),
            Self::TooManyJobs { .. } => Some("jobs_snapshot.jobs"),
            _ => None,
        }
    }
}

/// A validated partial update. `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload {
    pub timestamp: Option<String>,
    pub update_source: Option<String>,
    pub market_status: Option<String>,
    pub kpi_updates: Option<BTreeMap<String, String>>,
    pub trend_alerts: Option<Vec<Value>>,
    pub new_insights: Option<Vec<Value>>,
    pub jobs_snapshot: Option<SnapshotPayload>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotPayload {
    pub fetched_at: Option<String>,
    pub sources: Vec<String>,
    pub jobs: Vec<Value>,
}

/// Decode then validate a raw body.
pub fn parse_payload(body: &[u8]) -> Result<UpdatePayload, ValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
    validate_payload(value)
}

pub fn validate_payload(value: Value) -> Result<UpdatePayload, ValidationError> {
    let Value::Object(mut obj) = value else {
        return Err(ValidationError::NotAnObject);
    };

    Ok(UpdatePayload {
        timestamp: nullable_string(&mut obj, "timestamp")?,
        update_source: nullable_string(&mut obj, "update_source")?,
        market_status: match obj.remove("market_status") {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(ValidationError::wrong("market_status", "a string")),
        },
        kpi_updates: match obj.remove("kpi_updates") {
            None => None,
            Some(Value::Object(m)) => Some(kpi_values(m)?),
            Some(_) => return Err(ValidationError::wrong("kpi_updates", "an object")),
        },
        trend_alerts: array_field(&mut obj, "trend_alerts")?,
        new_insights: array_field(&mut obj, "new_insights")?,
        jobs_snapshot: match obj.remove("jobs_snapshot") {
            None => None,
            Some(Value::Object(m)) => Some(snapshot(m)?),
            Some(_) => return Err(ValidationError::wrong("jobs_snapshot", "an object")),
        },
    })
}

// `timestamp` and `update_source` fall back to defaults, so null is "absent".
fn nullable_string(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ValidationError::wrong(field, "a string")),
    }
}

fn array_field(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<Vec<Value>>, ValidationError> {
    match obj.remove(field) {
        None => Ok(None),
        Some(Value::Array(v)) => Ok(Some(v)),
        Some(_) => Err(ValidationError::wrong(field, "an array")),
    }
}

fn kpi_values(m: Map<String, Value>) -> Result<BTreeMap<String, String>, ValidationError> {
    m.into_iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ValidationError::wrong(
                        format!("kpi_updates.{k}"),
                        "a string, number or boolean",
                    ))
                }
            };
            Ok((k, text))
        })
        .collect()
}

fn snapshot(mut m: Map<String, Value>) -> Result<SnapshotPayload, ValidationError> {
    let jobs = match m.remove("jobs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(v)) => v,
        Some(_) => return Err(ValidationError::wrong("jobs_snapshot.jobs", "an array")),
    };
    if jobs.len() > MAX_SNAPSHOT_JOBS {
        return Err(ValidationError::TooManyJobs {
            count: jobs.len(),
            max: MAX_SNAPSHOT_JOBS,
        });
    }

    let fetched_at = match m.remove("fetched_at") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => return Err(ValidationError::wrong("jobs_snapshot.fetched_at", "a string")),
    };

    let sources = match m.remove("sources") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(v)) => v
            .into_iter()
            .map(|s| match s {
                Value::String(s) => Ok(s),
                _ => Err(ValidationError::wrong(
                    "jobs_snapshot.sources",
                    "an array of strings",
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::wrong(
                "jobs_snapshot.sources",
                "an array of strings",
            ))
        }
    };

    Ok(SnapshotPayload {
        fetched_at,
        sources,
        jobs,
    })
}
