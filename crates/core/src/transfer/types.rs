//! Types for transfer operations.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::{Endpoint, RelativePath, Tier};

/// Errors returned by a transfer service backend.
#[derive(Debug, Clone, Error)]
pub enum TransferClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

impl TransferClientError {
    /// Whether a status poll that failed this way is worth repeating.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Timeout => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::AuthenticationFailed(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Opaque identifier of a submitted transfer task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self(task_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a task as reported by the transfer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Still queued or running.
    Active,
    Succeeded,
    /// Permanently failed.
    Failed { reason: String },
}

/// One hop between two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hop {
    /// Copy within the instrument tier (smoke test only).
    InstrumentCopy,
    InstrumentToFacility,
    FacilityToArchive,
}

impl Hop {
    pub fn source(&self) -> Tier {
        match self {
            Hop::InstrumentCopy | Hop::InstrumentToFacility => Tier::Instrument,
            Hop::FacilityToArchive => Tier::Facility,
        }
    }

    pub fn destination(&self) -> Tier {
        match self {
            Hop::InstrumentCopy => Tier::Instrument,
            Hop::InstrumentToFacility => Tier::Facility,
            Hop::FacilityToArchive => Tier::Archive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hop::InstrumentCopy => "instrument_copy",
            Hop::InstrumentToFacility => "instrument_to_facility",
            Hop::FacilityToArchive => "facility_to_archive",
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transfer to submit and wait for.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: Endpoint,
    /// Absolute path on the source endpoint.
    pub source_path: String,
    pub destination: Endpoint,
    /// Absolute path on the destination endpoint.
    pub destination_path: String,
    /// Deadline enforced by the monitor.
    pub max_wait: Duration,
    /// Label shown by the transfer service.
    pub label: Option<String>,
}

impl TransferRequest {
    /// Builds a request whose absolute paths are the endpoints' roots joined
    /// with the given relative paths.
    pub fn between(
        source: &Endpoint,
        source_relative: &RelativePath,
        destination: &Endpoint,
        destination_relative: &RelativePath,
        max_wait: Duration,
    ) -> Self {
        Self {
            source_path: source.absolute(source_relative),
            destination_path: destination.absolute(destination_relative),
            source: source.clone(),
            destination: destination.clone(),
            max_wait,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Terminal result of a monitored transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded {
        task: TaskHandle,
        elapsed: Duration,
    },
    /// The deadline elapsed before the task reached a terminal state.
    /// `task` is `None` when submission itself did not return in time.
    TimedOut {
        task: Option<TaskHandle>,
        waited: Duration,
    },
    /// Submission was rejected or the task failed permanently.
    Failed {
        task: Option<TaskHandle>,
        reason: String,
    },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Succeeded { .. })
    }

    pub fn task(&self) -> Option<&TaskHandle> {
        match self {
            TransferOutcome::Succeeded { task, .. } => Some(task),
            TransferOutcome::TimedOut { task, .. } | TransferOutcome::Failed { task, .. } => {
                task.as_ref()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferOutcome::Succeeded { .. } => "succeeded",
            TransferOutcome::TimedOut { .. } => "timed_out",
            TransferOutcome::Failed { .. } => "failed",
        }
    }
}

/// Trait for transfer service backends.
///
/// Submitting a transfer whose destination already holds an identical copy
/// must be a no-op or a harmless duplicate, since a failed pipeline is
/// re-run from the start.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Submit a transfer and return the service's task handle.
    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TaskHandle, TransferClientError>;

    /// Current status of a submitted task.
    async fn poll_status(&self, task: &TaskHandle) -> Result<TaskStatus, TransferClientError>;
}
