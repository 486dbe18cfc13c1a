//! Types for ingestion jobs.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secrets::SecretError;

/// Errors that can occur while notifying the ingestion service.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The service answered with a non-success status.
    #[error("ingest submission rejected (HTTP {status}): {body}")]
    Submit { status: u16, body: String },

    /// The request could not be completed.
    #[error("ingest request failed: {0}")]
    Request(String),

    /// The ingestion token could not be resolved.
    #[error("ingest token unavailable: {0}")]
    Secret(#[from] SecretError),
}

/// A job for the ingestion service.
#[derive(Clone)]
pub struct IngestJob {
    pub api_url: String,
    /// Path as seen by the ingestion service.
    pub ingest_path: String,
    pub dataset_tag: String,
    pub token: String,
}

impl fmt::Debug for IngestJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestJob")
            .field("api_url", &self.api_url)
            .field("ingest_path", &self.ingest_path)
            .field("dataset_tag", &self.dataset_tag)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Body posted to the jobs endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequestBody {
    pub path: String,
    #[serde(rename = "datasetTag")]
    pub dataset_tag: String,
}

impl From<&IngestJob> for IngestRequestBody {
    fn from(job: &IngestJob) -> Self {
        Self {
            path: job.ingest_path.clone(),
            dataset_tag: job.dataset_tag.clone(),
        }
    }
}

/// Acknowledgement from the ingestion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub status: u16,
    /// Raw response body, kept for logging.
    pub body: String,
}

/// Trait for ingestion service backends.
///
/// Submission is fire-and-forget: success means the job was accepted, not
/// that ingestion finished.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Submit one ingestion job.
    async fn submit(&self, job: &IngestJob) -> Result<IngestReceipt, IngestError>;

    /// Check that the service is reachable and accepts `token`, without
    /// submitting anything.
    async fn probe(&self, api_url: &str, token: &str) -> Result<(), IngestError>;
}
