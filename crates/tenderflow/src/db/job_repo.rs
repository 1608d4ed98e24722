//! Job repository: persistence for the async analysis job queue.
//!
//! The `claim_next_pending` operation is the concurrency anchor of the
//! whole pipeline: it moves the oldest pending job to `processing` in a
//! single SQL statement, so two overlapping workers can never claim the
//! same job.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// Progress value written when a job is claimed by the worker.
/// Jobs are seeded at 5 on creation; the jump signals pickup to pollers.
pub const CLAIM_PROGRESS: u8 = 12;

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub job_type: String,
    pub status: String,
    /// Tagged-union payload, JSON-encoded (see `jobs::JobPayload`).
    pub payload: String,
    pub progress: u8,
    /// Structured analysis output, or `{"error": …}` when failed.
    pub result: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_type: row.get("job_type")?,
            status: row.get("status")?,
            payload: row.get("payload")?,
            progress: row.get::<_, i64>("progress")?.clamp(0, 100) as u8,
            result: row.get("result")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub job_type: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, job_type, status, payload, progress, result,
             created_at, updated_at, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.job_type,
                job.status,
                job.payload,
                job.progress,
                job.result,
                job.created_at,
                job.updated_at,
                job.started_at,
                job.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], |r| {
                JobRow::from_row(r)
            })
            .optional()?;
        Ok(row)
    })
}

/// Atomically claims the oldest pending job, moving it to `processing`.
///
/// FIFO by creation time (id as tiebreaker). Returns `None` when the queue
/// is empty. The update and the selection happen in one statement, which is
/// what makes concurrent claims safe: each pending job transitions to
/// `processing` exactly once.
pub fn claim_next_pending(db: &Database, now: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "UPDATE jobs
                 SET status = 'processing', started_at = ?1, updated_at = ?1, progress = ?2
                 WHERE id = (
                     SELECT id FROM jobs WHERE status = 'pending'
                     ORDER BY created_at ASC, id ASC LIMIT 1
                 )
                 RETURNING *",
                params![now, CLAIM_PROGRESS],
                |r| JobRow::from_row(r),
            )
            .optional()?;
        Ok(row)
    })
}

/// Updates job progress. The ratchet (`MAX`) keeps recorded progress
/// monotonically non-decreasing even if updates arrive out of order.
pub fn update_progress(
    db: &Database,
    id: &str,
    progress: u8,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET progress = MAX(progress, ?2), updated_at = ?3 WHERE id = ?1",
            params![id, progress, now],
        )?;
        Ok(())
    })
}

/// Finalizes a job as completed with its structured result.
pub fn mark_completed(
    db: &Database,
    id: &str,
    result: &serde_json::Value,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs
             SET status = 'completed', progress = 100, result = ?2,
                 completed_at = ?3, updated_at = ?3
             WHERE id = ?1",
            params![id, result.to_string(), now],
        )?;
        Ok(())
    })
}

/// Finalizes a job as failed. The stored result carries only the error
/// message; any partial stage output is discarded by the caller.
pub fn mark_failed(db: &Database, id: &str, error: &str, now: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let result = serde_json::json!({ "error": error });
        conn.execute(
            "UPDATE jobs
             SET status = 'failed', result = ?2, completed_at = ?3, updated_at = ?3
             WHERE id = ?1",
            params![id, result.to_string(), now],
        )?;
        Ok(())
    })
}

/// Re-queues jobs stuck in `processing` since before `stuck_since`.
///
/// Maintenance operation for recovering from a worker that died mid-job.
/// Not invoked by the polling loop itself. Returns the number of jobs
/// released back to `pending`.
pub fn release_stale(db: &Database, stuck_since: &str, now: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let released = conn.execute(
            "UPDATE jobs
             SET status = 'pending', started_at = NULL, updated_at = ?2
             WHERE status = 'processing' AND started_at <= ?1",
            params![stuck_since, now],
        )?;
        Ok(released as u64)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Queries jobs with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<JobRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }
        if let Some(ref job_type) = filter.job_type {
            conditions.push(format!("job_type = ?{}", param_values.len() + 1));
            param_values.push(Box::new(job_type.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM jobs {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<JobRow> = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}
