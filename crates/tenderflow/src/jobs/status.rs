//! Job status queries for polling clients.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{job_repo, Database, DatabaseError};

use super::types::JobStatus;

/// Errors from a status lookup. Malformed identifiers, missing jobs, and
/// storage failures are deliberately distinct so the transport layer can
/// map them to 400 / 404 / 503.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("malformed job id '{0}'")]
    InvalidId(String),

    #[error("job '{0}' not found")]
    NotFound(String),

    /// The backing store is unreachable. Never masked as "not found".
    #[error("job store unavailable: {0}")]
    Unavailable(#[from] DatabaseError),
}

/// Client-facing view of a job. Clients must check `status` before
/// interpreting `result`: a failed job carries `{"error": …}` there.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("failed to parse stored timestamp '{}': {}", s, e);
            Utc::now()
        })
}

/// Looks up a job by its identifier.
pub fn job_status(db: &Database, raw_id: &str) -> Result<JobStatusView, StatusError> {
    if Uuid::parse_str(raw_id).is_err() {
        return Err(StatusError::InvalidId(raw_id.to_string()));
    }

    let row = job_repo::find_by_id(db, raw_id)?
        .ok_or_else(|| StatusError::NotFound(raw_id.to_string()))?;

    let status = JobStatus::parse(&row.status).unwrap_or_else(|| {
        log::warn!(
            "unknown job status '{}' for job {}, reporting as processing",
            row.status,
            row.id
        );
        JobStatus::Processing
    });

    let result = row
        .result
        .as_deref()
        .and_then(|r| serde_json::from_str(r).ok());

    Ok(JobStatusView {
        id: row.id,
        status,
        progress: row.progress,
        result,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
