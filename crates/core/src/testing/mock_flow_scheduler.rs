//! Mock workflow scheduler for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::scheduler::{DeferredJob, FlowScheduler, ScheduledFlowRun, SchedulingError};

#[derive(Debug, Default)]
struct State {
    accepted: Vec<DeferredJob>,
    attempts: usize,
    reject_all: bool,
    rejected_flows: HashSet<String>,
}

/// Mock implementation of the FlowScheduler trait.
#[derive(Debug, Default)]
pub struct MockFlowScheduler {
    state: Arc<RwLock<State>>,
}

impl MockFlowScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs the scheduler accepted, in registration order.
    pub async fn scheduled_jobs(&self) -> Vec<DeferredJob> {
        self.state.read().await.accepted.clone()
    }

    /// Registration attempts, accepted or not.
    pub async fn schedule_count(&self) -> usize {
        self.state.read().await.attempts
    }

    pub async fn set_reject_all(&self, reject: bool) {
        self.state.write().await.reject_all = reject;
    }

    /// Reject registrations of `flow_name` only.
    pub async fn reject_flow(&self, flow_name: impl Into<String>) {
        self.state.write().await.rejected_flows.insert(flow_name.into());
    }
}

#[async_trait]
impl FlowScheduler for MockFlowScheduler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn schedule_flow(&self, job: &DeferredJob) -> Result<ScheduledFlowRun, SchedulingError> {
        let mut state = self.state.write().await;
        state.attempts += 1;
        if state.reject_all || state.rejected_flows.contains(&job.flow_name) {
            return Err(SchedulingError::Rejected {
                status: 422,
                body: format!("mock rejected {}", job.flow_name),
            });
        }
        state.accepted.push(job.clone());
        Ok(ScheduledFlowRun {
            flow_run_id: format!("mock-run-{}", state.accepted.len()),
            flow_name: job.flow_name.clone(),
            fire_at: job.fire_at,
        })
    }
}
