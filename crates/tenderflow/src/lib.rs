pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod jobs;
pub mod scoring;
pub mod telemetry;
pub mod worker;

pub use analysis::{AnalysisEngine, AnalysisResult};
pub use config::{Config, ScoringMode};
pub use db::Database;
pub use error::{Result, TenderflowError};
pub use extract::PdfExtractor;
pub use ingest::{FeedConfig, TenderIngestor};
pub use jobs::{job_status, JobIntake, JobStatusView, JobTicket};
pub use scoring::{CompanyProfile, HeuristicScorer, LlmScorer, MatchScore};
pub use worker::QueueWorker;
