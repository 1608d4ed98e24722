//! Job lifecycle: typed model, intake, and status queries.

pub mod intake;
pub mod status;
pub mod types;

pub use intake::{EagerAnalyzer, IntakeError, JobIntake, JobTicket, UploadedDocument};
pub use status::{job_status, JobStatusView, StatusError};
pub use types::{JobPayload, JobStatus, JobType, INITIAL_PROGRESS};
