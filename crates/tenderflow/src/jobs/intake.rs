//! Job intake: accepts an uploaded PDF, creates the pending job, and
//! optionally attempts an immediate out-of-band analysis.
//!
//! The optimistic attempt is stage 1 of a two-stage strategy: it only
//! transitions job state on success. Any failure leaves the job `pending`,
//! and the polling worker (the sole guaranteed path) picks it up.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::db::{job_repo, Database, DatabaseError};
use crate::extract::{ExtractError, PdfExtractor};

use super::types::{JobPayload, JobStatus, INITIAL_PROGRESS};

/// Errors from job submission. `NotAPdf` and `Document` are client
/// errors (400/422-class); the rest are server-side.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("uploaded file is not a PDF document")]
    NotAPdf,

    /// Empty or unreadable document, rejected before queueing.
    #[error(transparent)]
    Document(#[from] ExtractError),

    #[error("failed to store upload '{path}': {source}")]
    StoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// An uploaded document as received from the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub original_name: String,
}

/// What the caller gets back immediately: a job id and the status it had
/// when the submission returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    pub job_id: String,
    pub status: JobStatus,
}

/// Best-effort external analysis capability tried right after creation.
///
/// Purely an optimization: implementations may hand the file to a
/// pre-configured analysis backend and return the finished result. The
/// durable queue never depends on it.
#[async_trait]
pub trait EagerAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        file_path: &Path,
        company_context: &BTreeMap<String, String>,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Accepts uploads and enqueues analysis jobs.
pub struct JobIntake {
    db: Database,
    upload_dir: PathBuf,
    extractor: PdfExtractor,
    eager: Option<std::sync::Arc<dyn EagerAnalyzer>>,
}

impl JobIntake {
    pub fn new(db: Database, upload_dir: PathBuf) -> Self {
        Self {
            db,
            upload_dir,
            extractor: PdfExtractor::new(),
            eager: None,
        }
    }

    /// Enables the optimistic upload-time analysis path.
    pub fn with_eager_analyzer(mut self, analyzer: std::sync::Arc<dyn EagerAnalyzer>) -> Self {
        self.eager = Some(analyzer);
        self
    }

    /// Validates, stores, and enqueues a PDF for analysis.
    ///
    /// Empty or unreadable documents are rejected here so they never enter
    /// the queue. Returns immediately; analysis happens asynchronously
    /// unless the eager path completed it.
    pub async fn submit(
        &self,
        document: UploadedDocument,
        company_context: BTreeMap<String, String>,
    ) -> Result<JobTicket, IntakeError> {
        if !document.bytes.starts_with(b"%PDF-") {
            return Err(IntakeError::NotAPdf);
        }

        // Pre-flight readability check, 422-equivalent on failure.
        self.extractor.extract(&document.bytes)?;

        let job_id = Uuid::new_v4().to_string();
        let file_path = self.upload_dir.join(format!("tender-{}.pdf", job_id));

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| IntakeError::StoreFile {
                path: self.upload_dir.clone(),
                source: e,
            })?;
        tokio::fs::write(&file_path, &document.bytes)
            .await
            .map_err(|e| IntakeError::StoreFile {
                path: file_path.clone(),
                source: e,
            })?;

        let payload = JobPayload::PdfAnalysis {
            file_path: file_path.clone(),
            original_name: document.original_name.clone(),
            company_context: company_context.clone(),
        };

        let now = Utc::now().to_rfc3339();
        let row = job_repo::JobRow {
            id: job_id.clone(),
            job_type: payload.job_type().as_str().to_string(),
            status: JobStatus::Pending.as_str().to_string(),
            payload: serde_json::to_string(&payload)?,
            progress: INITIAL_PROGRESS,
            result: None,
            created_at: now.clone(),
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        job_repo::insert(&self.db, &row)?;
        info!(job_id = %job_id, file = %document.original_name, "job accepted");

        // Stage 1: optimistic analysis. Success finalizes the job directly;
        // the worker's claim will then find nothing pending for it.
        if let Some(eager) = &self.eager {
            match eager.analyze(&file_path, &company_context).await {
                Ok(result) => {
                    let now = Utc::now().to_rfc3339();
                    let value = serde_json::to_value(&result)?;
                    job_repo::mark_completed(&self.db, &job_id, &value, &now)?;
                    info!(job_id = %job_id, "eager analysis completed job");
                    return Ok(JobTicket {
                        job_id,
                        status: JobStatus::Completed,
                    });
                }
                Err(e) => {
                    // Leave the job pending; the queue worker is guaranteed
                    // to pick it up.
                    warn!(job_id = %job_id, "eager analysis failed, job stays queued: {}", e);
                }
            }
        }

        Ok(JobTicket {
            job_id,
            status: JobStatus::Pending,
        })
    }
}
