//! Mock transfer service for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::transfer::{
    TaskHandle, TaskStatus, TransferClient, TransferClientError, TransferRequest,
};

/// How a submitted task behaves when polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferBehavior {
    /// Reports active for `n` polls, then succeeded.
    SucceedAfter(u32),
    /// Reports active forever.
    NeverFinish,
    /// Status calls never return.
    Hang,
    /// The submission call itself never returns.
    HangOnSubmit,
    /// Reports active for `polls` polls, then failed with `reason`.
    FailAfter { polls: u32, reason: String },
}

impl Default for TransferBehavior {
    fn default() -> Self {
        TransferBehavior::SucceedAfter(0)
    }
}

#[derive(Debug)]
struct MockTask {
    behavior: TransferBehavior,
    polls: u32,
}

#[derive(Debug, Default)]
struct State {
    submissions: Vec<TransferRequest>,
    tasks: HashMap<String, MockTask>,
    default_behavior: TransferBehavior,
    destination_behaviors: HashMap<String, TransferBehavior>,
    next_submit_error: Option<TransferClientError>,
    poll_errors: VecDeque<TransferClientError>,
    poll_count: u32,
}

/// Mock implementation of the TransferClient trait.
///
/// Each submission creates a task whose behavior is taken from the
/// destination endpoint's override, or the default (immediate success).
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTransferClient::new();
/// client.set_default_behavior(TransferBehavior::SucceedAfter(3)).await;
/// client
///     .set_behavior_for_destination("nersc832", TransferBehavior::Hang)
///     .await;
/// ```
#[derive(Debug, Default)]
pub struct MockTransferClient {
    state: Arc<RwLock<State>>,
}

impl MockTransferClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_default_behavior(&self, behavior: TransferBehavior) {
        self.state.write().await.default_behavior = behavior;
    }

    /// Override the behavior of tasks sent to the endpoint named `destination`.
    pub async fn set_behavior_for_destination(
        &self,
        destination: impl Into<String>,
        behavior: TransferBehavior,
    ) {
        self.state
            .write()
            .await
            .destination_behaviors
            .insert(destination.into(), behavior);
    }

    /// Fail the next submission with `error`.
    pub async fn set_next_submit_error(&self, error: TransferClientError) {
        self.state.write().await.next_submit_error = Some(error);
    }

    /// Queue an error for an upcoming status poll.
    ///
    /// Queued errors are returned before any task is consulted and do not
    /// count as a poll of that task.
    pub async fn push_poll_error(&self, error: TransferClientError) {
        self.state.write().await.poll_errors.push_back(error);
    }

    /// All submitted requests, including rejected ones.
    pub async fn submitted_requests(&self) -> Vec<TransferRequest> {
        self.state.read().await.submissions.clone()
    }

    pub async fn submission_count(&self) -> usize {
        self.state.read().await.submissions.len()
    }

    /// Status calls made, across all tasks.
    pub async fn poll_count(&self) -> u32 {
        self.state.read().await.poll_count
    }
}

#[async_trait]
impl TransferClient for MockTransferClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TaskHandle, TransferClientError> {
        let mut state = self.state.write().await;
        state.submissions.push(request.clone());
        if let Some(error) = state.next_submit_error.take() {
            return Err(error);
        }

        let behavior = state
            .destination_behaviors
            .get(&request.destination.name)
            .cloned()
            .unwrap_or_else(|| state.default_behavior.clone());
        if behavior == TransferBehavior::HangOnSubmit {
            drop(state);
            return std::future::pending().await;
        }
        let task_id = format!("mock-task-{}", state.submissions.len());
        state
            .tasks
            .insert(task_id.clone(), MockTask { behavior, polls: 0 });
        Ok(TaskHandle::new(task_id))
    }

    async fn poll_status(&self, task: &TaskHandle) -> Result<TaskStatus, TransferClientError> {
        let status = {
            let mut state = self.state.write().await;
            state.poll_count += 1;
            if let Some(error) = state.poll_errors.pop_front() {
                return Err(error);
            }

            let Some(mock) = state.tasks.get_mut(task.as_str()) else {
                return Err(TransferClientError::InvalidResponse(format!(
                    "unknown task {task}"
                )));
            };
            mock.polls += 1;
            match &mock.behavior {
                TransferBehavior::SucceedAfter(n) if mock.polls > *n => Some(TaskStatus::Succeeded),
                TransferBehavior::SucceedAfter(_)
                | TransferBehavior::NeverFinish
                | TransferBehavior::HangOnSubmit => Some(TaskStatus::Active),
                TransferBehavior::FailAfter { polls, reason } if mock.polls > *polls => {
                    Some(TaskStatus::Failed {
                        reason: reason.clone(),
                    })
                }
                TransferBehavior::FailAfter { .. } => Some(TaskStatus::Active),
                TransferBehavior::Hang => None,
            }
        };

        match status {
            Some(status) => Ok(status),
            None => std::future::pending().await,
        }
    }
}
