//! Polling queue worker.
//!
//! Single-process, single-concurrency: one tick claims at most one job and
//! drives it to a terminal state before the next claim. Two guards keep
//! this safe: the DB-level atomic claim (cross-worker) and an in-memory
//! busy flag (overlapping ticks in the same process under slow I/O).
//!
//! A job failure is recorded and the loop keeps polling; nothing a single
//! job does may stop the worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::analysis::{AnalysisEngine, AnalysisError, AnalysisResult};
use crate::db::{job_repo, Database, DatabaseError};
use crate::extract::{ExtractError, PdfExtractor};
use crate::jobs::types::JobPayload;

/// Default polling cadence. Analysis latency (seconds per stage) dominates
/// poll latency, so 1s pickup is plenty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

// Progress checkpoints for the pdf_analysis pipeline. Strictly increasing;
// the repository ratchet enforces monotonicity on top.
const PROGRESS_READING: u8 = 15;
const PROGRESS_PARSED: u8 = 25;
const PROGRESS_ANALYSIS_START: u8 = 35;
const PROGRESS_COMPLIANCE_DONE: u8 = 50;
const PROGRESS_RISK_DONE: u8 = 60;
const PROGRESS_PROPOSAL_DONE: u8 = 70;
const PROGRESS_FINALIZING: u8 = 85;

/// Outcome of a single polling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending job existed.
    Idle,
    /// A previous tick is still running in this process.
    Busy,
    /// A job was claimed and finalized as completed.
    Completed(String),
    /// A job was claimed and finalized as failed.
    Failed(String),
}

/// Errors that abort a single job (not the worker).
#[derive(Error, Debug)]
enum ProcessError {
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to read uploaded file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// The durable analysis worker.
pub struct QueueWorker {
    db: Database,
    engine: Arc<AnalysisEngine>,
    extractor: PdfExtractor,
    poll_interval: Duration,
    busy: AtomicBool,
}

/// Releases the busy flag when a tick ends, on every path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueueWorker {
    pub fn new(db: Database, engine: Arc<AnalysisEngine>) -> Self {
        Self::with_poll_interval(db, engine, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        db: Database,
        engine: Arc<AnalysisEngine>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            engine,
            extractor: PdfExtractor::new(),
            poll_interval,
            busy: AtomicBool::new(false),
        }
    }

    /// Runs the polling loop until `shutdown` is set.
    pub async fn run(&self, shutdown: Arc<AtomicBool>) {
        info!(
            "queue worker started, polling every {}ms",
            self.poll_interval.as_millis()
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if shutdown.load(Ordering::Relaxed) {
                info!("queue worker shutting down");
                break;
            }
            // A tick error means the job store itself misbehaved; log and
            // keep polling. The next cycle may find it recovered.
            if let Err(e) = self.tick().await {
                error!("worker tick failed: {}", e);
            }
        }
    }

    /// One polling cycle: claim the oldest pending job and process it to a
    /// terminal state. No-op when the queue is empty or a tick is already
    /// running.
    pub async fn tick(&self) -> Result<TickOutcome, DatabaseError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(TickOutcome::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let now = Utc::now().to_rfc3339();
        let Some(job) = job_repo::claim_next_pending(&self.db, &now)? else {
            return Ok(TickOutcome::Idle);
        };

        let span = info_span!("job", id = %job.id, job_type = %job.job_type);
        async {
            info!("processing job");
            match self.process(&job).await {
                Ok(result) => {
                    job_repo::mark_completed(&self.db, &job.id, &result, &Utc::now().to_rfc3339())?;
                    info!("job completed");
                    Ok(TickOutcome::Completed(job.id.clone()))
                }
                Err(e) => {
                    // Partial stage output is discarded: the stored result
                    // carries only the error message.
                    let message = e.to_string();
                    warn!("job failed: {}", message);
                    job_repo::mark_failed(&self.db, &job.id, &message, &Utc::now().to_rfc3339())?;
                    Ok(TickOutcome::Failed(job.id.clone()))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(&self, job: &job_repo::JobRow) -> Result<serde_json::Value, ProcessError> {
        let payload: JobPayload = serde_json::from_str(&job.payload)?;
        match payload {
            JobPayload::PdfAnalysis { file_path, .. } => {
                // The staged engine calls work from the document text alone;
                // company context is consumed by single-shot analyzers.
                self.process_pdf_analysis(&job.id, &file_path).await
            }
            JobPayload::ComplianceCheck { file_path, .. } => {
                self.process_compliance_check(&job.id, &file_path).await
            }
        }
    }

    /// Full staged analysis: extract, then compliance → risk → proposal,
    /// reporting progress after each stage. The first stage error aborts
    /// the rest.
    async fn process_pdf_analysis(
        &self,
        job_id: &str,
        file_path: &Path,
    ) -> Result<serde_json::Value, ProcessError> {
        self.report_progress(job_id, PROGRESS_READING);
        let bytes =
            tokio::fs::read(file_path)
                .await
                .map_err(|e| ProcessError::ReadFile {
                    path: file_path.to_path_buf(),
                    source: e,
                })?;

        self.report_progress(job_id, PROGRESS_PARSED);
        let extracted = self.extractor.extract(&bytes)?;
        debug!(pages = extracted.pages, "text extracted");

        self.report_progress(job_id, PROGRESS_ANALYSIS_START);
        let compliance = self.engine.compliance_stage(&extracted.text).await?;
        self.report_progress(job_id, PROGRESS_COMPLIANCE_DONE);

        let risk = self.engine.risk_stage(&extracted.text).await?;
        self.report_progress(job_id, PROGRESS_RISK_DONE);

        let proposal = self.engine.proposal_stage(&extracted.text).await?;
        self.report_progress(job_id, PROGRESS_PROPOSAL_DONE);

        self.report_progress(job_id, PROGRESS_FINALIZING);
        let result = AnalysisResult {
            compliance_matrix: compliance,
            risk_score: risk.score,
            deadlines: Vec::new(),
            proposal_draft: proposal,
        };

        Ok(serde_json::to_value(&result)?)
    }

    /// Compliance-only variant: extract, then the compliance stage.
    async fn process_compliance_check(
        &self,
        job_id: &str,
        file_path: &Path,
    ) -> Result<serde_json::Value, ProcessError> {
        self.report_progress(job_id, PROGRESS_READING);
        let bytes =
            tokio::fs::read(file_path)
                .await
                .map_err(|e| ProcessError::ReadFile {
                    path: file_path.to_path_buf(),
                    source: e,
                })?;

        self.report_progress(job_id, PROGRESS_PARSED);
        let extracted = self.extractor.extract(&bytes)?;

        self.report_progress(job_id, PROGRESS_ANALYSIS_START);
        let compliance = self.engine.compliance_stage(&extracted.text).await?;
        self.report_progress(job_id, PROGRESS_FINALIZING);

        Ok(serde_json::json!({ "compliance_matrix": compliance }))
    }

    /// A progress-update failure must not fail the job.
    fn report_progress(&self, job_id: &str, progress: u8) {
        if let Err(e) =
            job_repo::update_progress(&self.db, job_id, progress, &Utc::now().to_rfc3339())
        {
            warn!(job_id = %job_id, "failed to update progress to {}: {}", progress, e);
        }
    }
}
