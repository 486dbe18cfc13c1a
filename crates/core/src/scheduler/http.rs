//! HTTP client for a Prefect-style workflow scheduler.
//!
//! A deferred job is registered in two calls: the deployment is looked up by
//! `flow/deployment` name, then a flow run is created in the `SCHEDULED`
//! state with the job's fire time.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{DeferredJob, FlowScheduler, ScheduledFlowRun, SchedulingError};

/// Workflow scheduler client.
pub struct HttpFlowScheduler {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpFlowScheduler {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SchedulingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulingError::Request(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn deployment_id(&self, flow_name: &str) -> Result<String, SchedulingError> {
        let url = deployment_lookup_url(&self.api_url, flow_name)?;
        debug!(url = %url, "Looking up deployment");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| SchedulingError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SchedulingError::DeploymentNotFound(flow_name.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SchedulingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let deployment: DeploymentDocument = serde_json::from_str(&body)
            .map_err(|e| SchedulingError::InvalidResponse(e.to_string()))?;
        Ok(deployment.id)
    }
}

#[async_trait]
impl FlowScheduler for HttpFlowScheduler {
    fn name(&self) -> &str {
        "http"
    }

    async fn schedule_flow(&self, job: &DeferredJob) -> Result<ScheduledFlowRun, SchedulingError> {
        let deployment_id = self.deployment_id(&job.flow_name).await?;
        let url = format!(
            "{}/deployments/{}/create_flow_run",
            self.api_url,
            urlencoding::encode(&deployment_id)
        );
        debug!(url = %url, label = %job.label, "Creating scheduled flow run");

        let response = self
            .authorize(self.client.post(&url))
            .json(&flow_run_body(job))
            .send()
            .await
            .map_err(|e| SchedulingError::Request(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SchedulingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let run: FlowRunDocument = serde_json::from_str(&body)
            .map_err(|e| SchedulingError::InvalidResponse(e.to_string()))?;
        Ok(ScheduledFlowRun {
            flow_run_id: run.id,
            flow_name: job.flow_name.clone(),
            fire_at: job.fire_at,
        })
    }
}

/// `GET` URL resolving a `flow/deployment` name to a deployment id.
fn deployment_lookup_url(api_url: &str, flow_name: &str) -> Result<String, SchedulingError> {
    let (flow, deployment) = flow_name
        .split_once('/')
        .filter(|(flow, deployment)| !flow.is_empty() && !deployment.is_empty())
        .ok_or_else(|| SchedulingError::DeploymentNotFound(flow_name.to_string()))?;
    Ok(format!(
        "{}/deployments/name/{}/{}",
        api_url,
        urlencoding::encode(flow),
        urlencoding::encode(deployment)
    ))
}

#[derive(Debug, Deserialize)]
struct DeploymentDocument {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FlowRunDocument {
    id: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct FlowRunBody<'a> {
    name: &'a str,
    parameters: &'a BTreeMap<String, String>,
    state: ScheduledState,
}

#[derive(Debug, Serialize, PartialEq)]
struct ScheduledState {
    #[serde(rename = "type")]
    state_type: &'static str,
    state_details: StateDetails,
}

#[derive(Debug, Serialize, PartialEq)]
struct StateDetails {
    scheduled_time: String,
}

fn flow_run_body(job: &DeferredJob) -> FlowRunBody<'_> {
    FlowRunBody {
        name: &job.label,
        parameters: &job.parameters,
        state: ScheduledState {
            state_type: "SCHEDULED",
            state_details: StateDetails {
                scheduled_time: format_fire_time(job.fire_at),
            },
        },
    }
}

fn format_fire_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
