//! Mock ingestion service for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ingest::{IngestApi, IngestError, IngestJob, IngestReceipt};

#[derive(Debug, Default)]
struct State {
    jobs: Vec<IngestJob>,
    probes: u32,
    failure: Option<(u16, String)>,
    probe_failure: Option<(u16, String)>,
}

/// Mock implementation of the IngestApi trait.
///
/// Records every submitted job. Accepts everything with HTTP 200 unless told
/// to fail.
#[derive(Debug, Default)]
pub struct MockIngestApi {
    state: Arc<RwLock<State>>,
}

impl MockIngestApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// All submitted jobs, including rejected ones.
    pub async fn submitted_jobs(&self) -> Vec<IngestJob> {
        self.state.read().await.jobs.clone()
    }

    pub async fn submission_count(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    pub async fn probe_count(&self) -> u32 {
        self.state.read().await.probes
    }

    /// Reject every following submission with `status` and `body`.
    pub async fn fail_with(&self, status: u16, body: impl Into<String>) {
        self.state.write().await.failure = Some((status, body.into()));
    }

    /// Fail every following probe with `status` and `body`.
    pub async fn fail_probe_with(&self, status: u16, body: impl Into<String>) {
        self.state.write().await.probe_failure = Some((status, body.into()));
    }
}

#[async_trait]
impl IngestApi for MockIngestApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, job: &IngestJob) -> Result<IngestReceipt, IngestError> {
        let mut state = self.state.write().await;
        state.jobs.push(job.clone());
        match &state.failure {
            Some((status, body)) => Err(IngestError::Submit {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(IngestReceipt {
                status: 200,
                body: r#"{"status":"queued"}"#.to_string(),
            }),
        }
    }

    async fn probe(&self, _api_url: &str, _token: &str) -> Result<(), IngestError> {
        let mut state = self.state.write().await;
        state.probes += 1;
        match &state.probe_failure {
            Some((status, body)) => Err(IngestError::Submit {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}
