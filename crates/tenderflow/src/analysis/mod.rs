//! LLM-backed tender analysis.
//!
//! The engine sends bounded prompts to a chat-completions API and expects
//! strict JSON back. When no credential is configured (or demo mode is on)
//! it serves a fixed, deterministic result instead: a distinct code path
//! used for local development and offline testing, not a degraded call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod engine;

pub use engine::{AnalysisEngine, MAX_PROMPT_CHARS};

/// Compliance verdict for a single extracted requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Risk,
}

/// One row of the compliance matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub requirement: String,
    /// Approximate page the requirement was found on.
    #[serde(default)]
    pub source_page: u32,
    pub status: ComplianceStatus,
}

/// A labelled deadline extracted from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    pub label: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
}

/// Risk verdict from the granular risk stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    #[serde(default)]
    pub rationale: String,
}

/// Structured output of a full tender analysis.
///
/// Field names are part of the client contract; downstream consumers key
/// off them, so they must not be renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub compliance_matrix: Vec<ComplianceItem>,
    pub risk_score: u8,
    pub deadlines: Vec<Deadline>,
    pub proposal_draft: String,
}

/// The independently invocable analysis stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Compliance,
    Risk,
    Proposal,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStage::Compliance => "compliance",
            AnalysisStage::Risk => "risk",
            AnalysisStage::Proposal => "proposal",
        }
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the analysis engine.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The generation request failed (network, HTTP status, timeout).
    #[error("generation request failed: {0}")]
    Request(String),

    /// The backend answered but the content was not the expected JSON.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// A granular stage failed; carries the stage name so the job error
    /// identifies where processing stopped.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: AnalysisStage,
        #[source]
        source: Box<AnalysisError>,
    },
}
