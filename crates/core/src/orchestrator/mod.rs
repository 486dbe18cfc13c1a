//! Pipeline orchestrator.
//!
//! Drives one file through the fixed sequence:
//! - **Normalize** the instrument-reported path
//! - **Transfer** instrument → facility, then facility → archive (halting)
//! - **Ingest** the archived file (best effort)
//! - **Schedule** deletion of the instrument and facility copies (best effort)

mod runner;
mod smoke;
mod types;

pub use runner::{Collaborators, PipelineOrchestrator};
pub use smoke::DEFAULT_SMOKE_TEST_FILE;
pub use types::{
    DeletionResult, PipelineError, PipelineReport, PipelineStage, PipelineStatus, SmokeTestReport,
    StepRecord, StepStatus,
};
