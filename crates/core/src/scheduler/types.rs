//! Types for deferred jobs.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::Tier;

/// Errors that can occur while registering a deferred job.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The scheduler refused the registration.
    #[error("scheduler rejected flow run (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("deployment not found: {0}")]
    DeploymentNotFound(String),

    #[error("invalid delay: {0}")]
    InvalidDelay(String),

    #[error("scheduler request failed: {0}")]
    Request(String),

    #[error("invalid scheduler response: {0}")]
    InvalidResponse(String),
}

/// Tiers whose copies are pruned after their retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionTier {
    Instrument,
    Facility,
}

impl DeletionTier {
    pub fn tier(&self) -> Tier {
        match self {
            DeletionTier::Instrument => Tier::Instrument,
            DeletionTier::Facility => Tier::Facility,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.tier().as_str()
    }
}

impl fmt::Display for DeletionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-shot future flow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredJob {
    /// Deployment to run, as `flow/deployment`.
    pub flow_name: String,
    /// Human-readable run name.
    pub label: String,
    pub parameters: BTreeMap<String, String>,
    pub fire_after: Duration,
    /// Absolute fire time, computed when the job is built.
    pub fire_at: DateTime<Utc>,
}

/// A registration accepted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledFlowRun {
    pub flow_run_id: String,
    pub flow_name: String,
    pub fire_at: DateTime<Utc>,
}

/// Trait for workflow scheduler backends.
#[async_trait]
pub trait FlowScheduler: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Register `job` to run at `job.fire_at`.
    async fn schedule_flow(&self, job: &DeferredJob) -> Result<ScheduledFlowRun, SchedulingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_tier_maps_to_tier() {
        assert_eq!(DeletionTier::Instrument.tier(), Tier::Instrument);
        assert_eq!(DeletionTier::Facility.tier(), Tier::Facility);
        assert_eq!(DeletionTier::Facility.to_string(), "facility");
    }
}
