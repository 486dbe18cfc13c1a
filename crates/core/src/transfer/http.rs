//! HTTP transfer client for a Globus-style transfer REST API.
//!
//! Every submission carries a fresh submission id and the configured
//! `sync_level`, so repeating a transfer whose destination already matches
//! the source completes without moving data.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TransferConfig;

use super::{TaskHandle, TaskStatus, TransferClient, TransferClientError, TransferRequest};

/// Transfer client speaking the transfer service's REST API.
pub struct HttpTransferClient {
    client: Client,
    base_url: String,
    token: String,
    sync_level: String,
    verify_checksum: bool,
}

impl HttpTransferClient {
    /// Create a new client authenticated with `token`.
    pub fn new(config: &TransferConfig, token: String) -> Result<Self, TransferClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransferClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            sync_level: config.sync_level.as_str().to_string(),
            verify_checksum: config.verify_checksum,
        })
    }

    async fn submission_id(&self) -> Result<String, TransferClientError> {
        let url = format!("{}/submission_id", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_request_error)?;

        let doc: SubmissionIdDocument = parse_json(check_status(response).await?).await?;
        Ok(doc.value)
    }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TaskHandle, TransferClientError> {
        let submission_id = self.submission_id().await?;
        let document = transfer_document(
            request,
            submission_id,
            &self.sync_level,
            self.verify_checksum,
        );
        debug!(submission_id = %document.submission_id, "Posting transfer document");

        let url = format!("{}/transfer", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&document)
            .send()
            .await
            .map_err(map_request_error)?;

        let result: TransferResultDocument = parse_json(check_status(response).await?).await?;
        Ok(TaskHandle::new(result.task_id))
    }

    async fn poll_status(&self, task: &TaskHandle) -> Result<TaskStatus, TransferClientError> {
        let url = format!(
            "{}/task/{}",
            self.base_url,
            urlencoding::encode(task.as_str())
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_request_error)?;

        let doc: TaskDocument = parse_json(check_status(response).await?).await?;
        parse_task_status(&doc)
    }
}

fn map_request_error(e: reqwest::Error) -> TransferClientError {
    if e.is_timeout() {
        TransferClientError::Timeout
    } else if e.is_connect() {
        TransferClientError::ConnectionFailed(e.to_string())
    } else {
        TransferClientError::ConnectionFailed(format!("request failed: {e}"))
    }
}

async fn check_status(response: Response) -> Result<Response, TransferClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = body.chars().take(500).collect::<String>();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(TransferClientError::AuthenticationFailed(message));
    }
    Err(TransferClientError::ApiError {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: for<'de> Deserialize<'de>>(
    response: Response,
) -> Result<T, TransferClientError> {
    response
        .json()
        .await
        .map_err(|e| TransferClientError::InvalidResponse(e.to_string()))
}

// ============================================================================
// Wire documents
// ============================================================================

#[derive(Debug, Deserialize)]
struct SubmissionIdDocument {
    value: String,
}

#[derive(Debug, Serialize)]
struct TransferDocument {
    #[serde(rename = "DATA_TYPE")]
    data_type: &'static str,
    submission_id: String,
    source_endpoint: String,
    destination_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    sync_level: String,
    verify_checksum: bool,
    #[serde(rename = "DATA")]
    data: Vec<TransferItem>,
}

#[derive(Debug, Serialize)]
struct TransferItem {
    #[serde(rename = "DATA_TYPE")]
    data_type: &'static str,
    source_path: String,
    destination_path: String,
    recursive: bool,
}

#[derive(Debug, Deserialize)]
struct TransferResultDocument {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskDocument {
    status: String,
    #[serde(default)]
    nice_status: Option<String>,
    #[serde(default)]
    fatal_error: Option<FatalError>,
}

#[derive(Debug, Deserialize)]
struct FatalError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn transfer_document(
    request: &TransferRequest,
    submission_id: String,
    sync_level: &str,
    verify_checksum: bool,
) -> TransferDocument {
    TransferDocument {
        data_type: "transfer",
        submission_id,
        source_endpoint: request.source.endpoint_id.clone(),
        destination_endpoint: request.destination.endpoint_id.clone(),
        label: request.label.clone(),
        sync_level: sync_level.to_string(),
        verify_checksum,
        data: vec![TransferItem {
            data_type: "transfer_item",
            source_path: request.source_path.clone(),
            destination_path: request.destination_path.clone(),
            recursive: request.source_path.ends_with('/'),
        }],
    }
}

fn parse_task_status(doc: &TaskDocument) -> Result<TaskStatus, TransferClientError> {
    match doc.status.as_str() {
        "ACTIVE" | "INACTIVE" => Ok(TaskStatus::Active),
        "SUCCEEDED" => Ok(TaskStatus::Succeeded),
        "FAILED" => {
            let reason = doc
                .fatal_error
                .as_ref()
                .and_then(|e| match (&e.code, &e.description) {
                    (Some(code), Some(desc)) => Some(format!("{code}: {desc}")),
                    (Some(code), None) => Some(code.clone()),
                    (None, Some(desc)) => Some(desc.clone()),
                    (None, None) => None,
                })
                .or_else(|| doc.nice_status.clone())
                .unwrap_or_else(|| "task failed".to_string());
            Ok(TaskStatus::Failed { reason })
        }
        other => Err(TransferClientError::InvalidResponse(format!(
            "unknown task status {other:?}"
        ))),
    }
}
