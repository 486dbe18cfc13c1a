//! Types for the pipeline orchestrator.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{IngestError, IngestReceipt};
use crate::paths::{PathError, RelativePath};
use crate::scheduler::{DeletionTier, ScheduledFlowRun, SchedulingError};
use crate::transfer::Hop;

/// Errors that halt a pipeline run.
///
/// Ingestion and scheduling failures are not here: they degrade the run and
/// are recorded in the [`PipelineReport`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The reported path could not be normalized.
    #[error(transparent)]
    MalformedPath(#[from] PathError),

    /// A hop did not finish before its deadline.
    #[error("{hop} transfer timed out after {}s", .waited.as_secs())]
    TransferTimeout {
        hop: Hop,
        /// `None` when the submission itself did not return in time.
        task_id: Option<String>,
        waited: Duration,
    },

    /// A hop was rejected or failed permanently.
    #[error("{hop} transfer failed: {reason}")]
    TransferFailed {
        hop: Hop,
        task_id: Option<String>,
        reason: String,
    },

    /// The ingestion service could not be reached (smoke test only).
    #[error("ingestion service probe failed: {0}")]
    IngestProbe(#[from] IngestError),
}

impl PipelineError {
    /// The last stage the run reached before halting.
    pub fn halted_at(&self) -> PipelineStage {
        match self {
            PipelineError::MalformedPath(_) | PipelineError::IngestProbe(_) => PipelineStage::Start,
            PipelineError::TransferTimeout { hop, .. } | PipelineError::TransferFailed { hop, .. } => {
                match hop {
                    Hop::InstrumentCopy | Hop::InstrumentToFacility => PipelineStage::Normalized,
                    Hop::FacilityToArchive => PipelineStage::TransferredToFacility,
                }
            }
        }
    }
}

/// Pipeline states, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Normalized,
    TransferredToFacility,
    TransferredToArchive,
    Ingested,
    ScheduledDeleteInstrument,
    ScheduledDeleteFacility,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::Normalized => "normalized",
            PipelineStage::TransferredToFacility => "transferred_to_facility",
            PipelineStage::TransferredToArchive => "transferred_to_archive",
            PipelineStage::Ingested => "ingested",
            PipelineStage::ScheduledDeleteInstrument => "scheduled_delete_instrument",
            PipelineStage::ScheduledDeleteFacility => "scheduled_delete_facility",
            PipelineStage::Done => "done",
        }
    }

    /// Stage entered once the deletion for `tier` has been attempted.
    pub fn scheduled_delete(tier: DeletionTier) -> Self {
        match tier {
            DeletionTier::Instrument => PipelineStage::ScheduledDeleteInstrument,
            DeletionTier::Facility => PipelineStage::ScheduledDeleteFacility,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed(String),
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: PipelineStage,
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepRecord {
    pub fn completed(stage: PipelineStage) -> Self {
        Self {
            stage,
            status: StepStatus::Completed,
        }
    }

    pub fn failed(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Failed(reason.into()),
        }
    }
}

/// Result of registering one tier's deletion.
#[derive(Debug)]
pub struct DeletionResult {
    pub tier: DeletionTier,
    pub result: Result<ScheduledFlowRun, SchedulingError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every step succeeded.
    Done,
    /// Data reached the archive but ingestion or a deletion failed.
    Degraded,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Done => "done",
            PipelineStatus::Degraded => "degraded",
        }
    }
}

/// What a pipeline run that reached the archive did.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: String,
    pub relative_path: RelativePath,
    pub steps: Vec<StepRecord>,
    pub ingest: Result<IngestReceipt, IngestError>,
    pub deletions: Vec<DeletionResult>,
}

impl PipelineReport {
    pub fn status(&self) -> PipelineStatus {
        let deletions_ok = self.deletions.iter().all(|d| d.result.is_ok());
        if self.ingest.is_ok() && deletions_ok {
            PipelineStatus::Done
        } else {
            PipelineStatus::Degraded
        }
    }

    /// Steps that failed without halting the run.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
    }
}

/// What a smoke test moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTestReport {
    pub run_id: String,
    /// The instrument-side file that was copied.
    pub source: RelativePath,
    /// The uniquely named copy that travelled through every tier.
    pub copy: RelativePath,
    pub hops: Vec<Hop>,
}
