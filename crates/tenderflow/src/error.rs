use thiserror::Error;

#[derive(Error, Debug)]
pub enum TenderflowError {
    #[error("Extraction error: {0}")]
    Extract(#[from] crate::extract::ExtractError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] crate::analysis::AnalysisError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Intake error: {0}")]
    Intake(#[from] crate::jobs::IntakeError),

    #[error("Status query error: {0}")]
    Status(#[from] crate::jobs::StatusError),

    #[error("Feed error: {0}")]
    Feed(#[from] crate::ingest::FeedError),
}

pub type Result<T> = std::result::Result<T, TenderflowError>;
