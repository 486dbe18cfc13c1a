//! HTTP client for the ingestion service's jobs endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::{IngestApi, IngestError, IngestJob, IngestReceipt, IngestRequestBody};

/// Ingestion service client.
pub struct HttpIngestApi {
    client: Client,
}

impl HttpIngestApi {
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl IngestApi for HttpIngestApi {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, job: &IngestJob) -> Result<IngestReceipt, IngestError> {
        let body = IngestRequestBody::from(job);
        debug!(url = %job.api_url, "POST ingest job");

        let response = self
            .client
            .post(&job.api_url)
            .bearer_auth(&job.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(IngestError::Submit {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(IngestReceipt {
            status: status.as_u16(),
            body: text,
        })
    }

    async fn probe(&self, api_url: &str, token: &str) -> Result<(), IngestError> {
        let response = self
            .client
            .get(api_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IngestError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(IngestError::Submit {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
