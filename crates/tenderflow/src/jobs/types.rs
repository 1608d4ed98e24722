//! Typed job lifecycle model.
//!
//! The payload is a tagged union keyed by `type`: adding a job kind means
//! adding a variant with its own schema, not loosening the typing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Progress value seeded when a job is created, signalling immediate
/// acceptance to clients that poll right after upload.
pub const INITIAL_PROGRESS: u8 = 5;

/// Job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    PdfAnalysis,
    ComplianceCheck,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::PdfAnalysis => "pdf_analysis",
            JobType::ComplianceCheck => "compliance_check",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear job state machine. Terminal states are final; a failed job is
/// never re-queued automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Immutable job input, one schema per job kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    PdfAnalysis {
        file_path: PathBuf,
        original_name: String,
        /// Free-form company context forwarded to the analysis engine.
        #[serde(default)]
        company_context: BTreeMap<String, String>,
    },
    ComplianceCheck {
        file_path: PathBuf,
        original_name: String,
    },
}

impl JobPayload {
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::PdfAnalysis { .. } => JobType::PdfAnalysis,
            JobPayload::ComplianceCheck { .. } => JobType::ComplianceCheck,
        }
    }

    pub fn file_path(&self) -> &Path {
        match self {
            JobPayload::PdfAnalysis { file_path, .. } => file_path,
            JobPayload::ComplianceCheck { file_path, .. } => file_path,
        }
    }

    pub fn original_name(&self) -> &str {
        match self {
            JobPayload::PdfAnalysis { original_name, .. } => original_name,
            JobPayload::ComplianceCheck { original_name, .. } => original_name,
        }
    }
}
