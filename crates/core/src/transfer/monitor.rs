//! Deadline-bounded transfer monitoring.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::metrics;

use super::types::{TaskStatus, TransferClient, TransferOutcome, TransferRequest};

/// Submits a transfer and polls it until it succeeds, fails, or runs out of time.
///
/// Holds nothing but its collaborators, so one monitor can serve any number
/// of concurrent requests.
pub struct TransferMonitor {
    client: Arc<dyn TransferClient>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl TransferMonitor {
    pub fn new(
        client: Arc<dyn TransferClient>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            clock,
            poll_interval,
        }
    }

    /// Runs `request` to a terminal outcome.
    ///
    /// Returns `TimedOut` once `request.max_wait` has elapsed since the
    /// transfer was submitted, even if the submission or a status call never
    /// returns. Permanent failures are surfaced,
    /// not retried; transient poll errors are retried until the deadline.
    pub async fn transfer(&self, request: &TransferRequest) -> TransferOutcome {
        info!(
            backend = self.client.name(),
            source = %request.source.name,
            source_path = %request.source_path,
            destination = %request.destination.name,
            destination_path = %request.destination_path,
            max_wait_secs = request.max_wait.as_secs(),
            "Submitting transfer"
        );

        let started = self.clock.now();
        let deadline = started + request.max_wait;

        let submitted = tokio::select! {
            biased;
            submitted = self.client.submit_transfer(request) => Some(submitted),
            _ = self.clock.sleep(request.max_wait) => None,
        };
        let task = match submitted {
            Some(Ok(task)) => task,
            Some(Err(e)) => {
                error!(error = %e, "Transfer submission failed");
                return TransferOutcome::Failed {
                    task: None,
                    reason: format!("submission failed: {e}"),
                };
            }
            None => {
                let waited = self.clock.now().saturating_duration_since(started);
                warn!(
                    waited_secs = waited.as_secs(),
                    "Transfer submission did not return before the deadline"
                );
                metrics::TRANSFER_WAIT_SECONDS
                    .with_label_values(&["timed_out"])
                    .observe(waited.as_secs_f64());
                return TransferOutcome::TimedOut { task: None, waited };
            }
        };
        info!(task_id = %task, "Transfer submitted");

        let mut polls: u32 = 0;

        let outcome = loop {
            let remaining = deadline.saturating_duration_since(self.clock.now());
            polls += 1;

            let polled = tokio::select! {
                biased;
                status = self.client.poll_status(&task) => Some(status),
                _ = self.clock.sleep(remaining) => None,
            };

            match polled {
                Some(Ok(TaskStatus::Succeeded)) => {
                    break TransferOutcome::Succeeded {
                        task: task.clone(),
                        elapsed: self.clock.now().saturating_duration_since(started),
                    };
                }
                Some(Ok(TaskStatus::Failed { reason })) => {
                    break TransferOutcome::Failed {
                        task: Some(task.clone()),
                        reason,
                    };
                }
                Some(Ok(TaskStatus::Active)) => {
                    debug!(task_id = %task, polls, "Transfer still active");
                }
                Some(Err(e)) if e.is_transient() => {
                    warn!(task_id = %task, polls, error = %e, "Transient error polling transfer");
                }
                Some(Err(e)) => {
                    break TransferOutcome::Failed {
                        task: Some(task.clone()),
                        reason: format!("status poll failed: {e}"),
                    };
                }
                None => {
                    warn!(task_id = %task, "Status poll did not return before the deadline");
                }
            }

            let now = self.clock.now();
            if now >= deadline {
                break TransferOutcome::TimedOut {
                    task: Some(task.clone()),
                    waited: now.saturating_duration_since(started),
                };
            }
            let pause = self.poll_interval.min(deadline.saturating_duration_since(now));
            self.clock.sleep(pause).await;
        };

        let waited = self.clock.now().saturating_duration_since(started);
        metrics::TRANSFER_WAIT_SECONDS
            .with_label_values(&[outcome.as_str()])
            .observe(waited.as_secs_f64());

        match &outcome {
            TransferOutcome::Succeeded { elapsed, .. } => {
                info!(task_id = %task, polls, elapsed_secs = elapsed.as_secs(), "Transfer succeeded");
            }
            TransferOutcome::TimedOut { waited, .. } => {
                warn!(task_id = %task, polls, waited_secs = waited.as_secs(), "Transfer timed out");
            }
            TransferOutcome::Failed { reason, .. } => {
                error!(task_id = %task, polls, reason = %reason, "Transfer failed");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{Endpoint, RelativePath};
    use crate::testing::{ManualClock, MockTransferClient, TransferBehavior};
    use crate::transfer::TransferClientError;

    const POLL: Duration = Duration::from_secs(10);
    const MAX_WAIT: Duration = Duration::from_secs(600);

    fn request() -> TransferRequest {
        let rel = RelativePath::new("raw/sample1/scan0001.h5").unwrap();
        TransferRequest::between(
            &Endpoint::new("spot832", "/", "spot-id"),
            &rel,
            &Endpoint::new("data832", "/data/", "data-id"),
            &rel,
            MAX_WAIT,
        )
    }

    fn monitor(client: &Arc<MockTransferClient>, clock: &Arc<ManualClock>) -> TransferMonitor {
        TransferMonitor::new(client.clone(), clock.clone(), POLL)
    }

    #[tokio::test]
    async fn test_success_submits_exactly_once() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::SucceedAfter(3))
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(client.submission_count().await, 1);
        assert_eq!(client.poll_count().await, 4);
        assert_eq!(clock.elapsed(), POLL * 3);
    }

    #[tokio::test]
    async fn test_immediate_success_does_not_sleep() {
        let client = Arc::new(MockTransferClient::new());
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        match outcome {
            TransferOutcome::Succeeded { elapsed, .. } => assert_eq!(elapsed, Duration::ZERO),
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_never_terminal_times_out_within_deadline() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::NeverFinish)
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        match outcome {
            TransferOutcome::TimedOut { waited, .. } => {
                assert!(waited >= MAX_WAIT);
                assert!(waited <= MAX_WAIT + POLL);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(clock.elapsed() <= MAX_WAIT + POLL);
        assert_eq!(client.submission_count().await, 1);
    }

    #[tokio::test]
    async fn test_hanging_status_call_is_cut_off_by_deadline() {
        let client = Arc::new(MockTransferClient::new());
        client.set_default_behavior(TransferBehavior::Hang).await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        assert!(matches!(outcome, TransferOutcome::TimedOut { .. }), "{outcome:?}");
        assert_eq!(clock.elapsed(), MAX_WAIT);
    }

    #[tokio::test]
    async fn test_hanging_submission_is_cut_off_by_deadline() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::HangOnSubmit)
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            monitor(&client, &clock).transfer(&request()),
        )
        .await
        .expect("monitor must return on its own deadline");

        match outcome {
            TransferOutcome::TimedOut { task, waited } => {
                assert!(task.is_none());
                assert_eq!(waited, MAX_WAIT);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(client.submission_count().await, 1);
        assert_eq!(client.poll_count().await, 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::FailAfter {
                polls: 1,
                reason: "PERMISSION_DENIED".to_string(),
            })
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        match outcome {
            TransferOutcome::Failed { task, reason } => {
                assert!(task.is_some());
                assert_eq!(reason, "PERMISSION_DENIED");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(client.submission_count().await, 1);
        assert_eq!(client.poll_count().await, 2);
    }

    #[tokio::test]
    async fn test_submission_error_fails_without_polling() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_next_submit_error(TransferClientError::AuthenticationFailed(
                "token expired".to_string(),
            ))
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        match outcome {
            TransferOutcome::Failed { task, reason } => {
                assert!(task.is_none());
                assert!(reason.contains("token expired"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(client.poll_count().await, 0);
    }

    #[tokio::test]
    async fn test_transient_poll_errors_are_retried() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::SucceedAfter(2))
            .await;
        client
            .push_poll_error(TransferClientError::ConnectionFailed("reset".to_string()))
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        assert!(outcome.is_success(), "{outcome:?}");
    }

    #[tokio::test]
    async fn test_permanent_poll_error_fails() {
        let client = Arc::new(MockTransferClient::new());
        client
            .set_default_behavior(TransferBehavior::NeverFinish)
            .await;
        client
            .push_poll_error(TransferClientError::AuthenticationFailed(
                "revoked".to_string(),
            ))
            .await;
        let clock = Arc::new(ManualClock::new());

        let outcome = monitor(&client, &clock).transfer(&request()).await;

        assert!(matches!(outcome, TransferOutcome::Failed { task: Some(_), .. }));
    }
}
