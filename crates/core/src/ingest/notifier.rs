//! Ingestion notifier.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::IngestConfig;
use crate::metrics;
use crate::paths::{join, RelativePath};
use crate::secrets::SecretStore;

use super::types::{IngestApi, IngestError, IngestJob, IngestReceipt};

/// Submits ingestion jobs for files that reached the archive tier.
pub struct IngestionNotifier {
    api: Arc<dyn IngestApi>,
    secrets: Arc<dyn SecretStore>,
    config: IngestConfig,
}

impl IngestionNotifier {
    pub fn new(api: Arc<dyn IngestApi>, secrets: Arc<dyn SecretStore>, config: IngestConfig) -> Self {
        Self {
            api,
            secrets,
            config,
        }
    }

    /// Path of `relative` in the ingestion service's namespace.
    pub fn ingest_path(&self, relative: &RelativePath) -> String {
        join(&self.config.mount_prefix, relative.as_str())
    }

    /// Resolves the ingestion token and submits a job using the configured
    /// endpoint and dataset tag.
    pub async fn ingest(&self, relative: &RelativePath) -> Result<IngestReceipt, IngestError> {
        let token = match self.secrets.load(&self.config.token_secret).await {
            Ok(token) => token,
            Err(e) => {
                error!(secret = %self.config.token_secret, error = %e, "Ingest token unavailable");
                metrics::INGEST_SUBMISSIONS.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
        };
        self.notify(
            relative,
            &self.config.dataset_tag,
            &self.config.jobs_api_url,
            &token,
        )
        .await
    }

    /// Submits a job for `relative` to `api_url`.
    pub async fn notify(
        &self,
        relative: &RelativePath,
        dataset_tag: &str,
        api_url: &str,
        token: &str,
    ) -> Result<IngestReceipt, IngestError> {
        let job = IngestJob {
            api_url: api_url.to_string(),
            ingest_path: self.ingest_path(relative),
            dataset_tag: dataset_tag.to_string(),
            token: token.to_string(),
        };
        info!(
            api_url = %job.api_url,
            ingest_path = %job.ingest_path,
            dataset_tag = %job.dataset_tag,
            "Sending ingest job"
        );

        match self.api.submit(&job).await {
            Ok(receipt) => {
                info!(status = receipt.status, response = %receipt.body, "Ingest job accepted");
                metrics::INGEST_SUBMISSIONS.with_label_values(&["accepted"]).inc();
                Ok(receipt)
            }
            Err(e) => {
                error!(error = %e, ingest_path = %job.ingest_path, "Ingest job failed");
                metrics::INGEST_SUBMISSIONS.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    /// Verifies the ingestion service is reachable with the configured token.
    pub async fn probe(&self) -> Result<(), IngestError> {
        let token = self.secrets.load(&self.config.token_secret).await?;
        info!(api_url = %self.config.jobs_api_url, "Probing ingest service");
        self.api.probe(&self.config.jobs_api_url, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockIngestApi, MockSecretStore};

    fn notifier(api: &Arc<MockIngestApi>, secrets: MockSecretStore) -> IngestionNotifier {
        IngestionNotifier::new(api.clone(), Arc::new(secrets), fixtures::config().ingest)
    }

    #[test]
    fn test_ingest_path_translation() {
        let api = Arc::new(MockIngestApi::new());
        let notifier = notifier(&api, MockSecretStore::new());
        let rel = RelativePath::normalize("/global/raw/sample1/scan0001.h5", "global").unwrap();
        assert_eq!(
            notifier.ingest_path(&rel),
            "/data_mover/8.3.2/raw/sample1/scan0001.h5"
        );
    }

    #[tokio::test]
    async fn test_ingest_submits_translated_job() {
        let api = Arc::new(MockIngestApi::new());
        let notifier = notifier(&api, MockSecretStore::new().with_secret("scicat-token", "tok"));
        let rel = RelativePath::new("raw/sample1/scan0001.h5").unwrap();

        let receipt = tokio_test::assert_ok!(notifier.ingest(&rel).await);
        assert_eq!(receipt.status, 200);

        let jobs = api.submitted_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].ingest_path, "/data_mover/8.3.2/raw/sample1/scan0001.h5");
        assert_eq!(jobs[0].dataset_tag, "als832_dx_3");
        assert_eq!(jobs[0].token, "tok");
        assert_eq!(jobs[0].api_url, fixtures::config().ingest.jobs_api_url);
    }

    #[tokio::test]
    async fn test_ingest_without_token_does_not_submit() {
        let api = Arc::new(MockIngestApi::new());
        let notifier = notifier(&api, MockSecretStore::new());
        let rel = RelativePath::new("raw/a.h5").unwrap();

        let err = tokio_test::assert_err!(notifier.ingest(&rel).await);
        assert!(matches!(err, IngestError::Secret(_)));
        assert_eq!(api.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_ingest_rejection_surfaces_status_and_body() {
        let api = Arc::new(MockIngestApi::new());
        api.fail_with(500, "ingestor down").await;
        let notifier = notifier(&api, MockSecretStore::new().with_secret("scicat-token", "tok"));
        let rel = RelativePath::new("raw/a.h5").unwrap();

        match notifier.ingest(&rel).await {
            Err(IngestError::Submit { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "ingestor down");
            }
            other => panic!("expected submit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_notify_uses_explicit_arguments() {
        let api = Arc::new(MockIngestApi::new());
        let notifier = notifier(&api, MockSecretStore::new());
        let rel = RelativePath::new("raw/a.h5").unwrap();

        notifier
            .notify(&rel, "custom_tag", "https://other.example.org/jobs", "explicit")
            .await
            .unwrap();

        let jobs = api.submitted_jobs().await;
        assert_eq!(jobs[0].dataset_tag, "custom_tag");
        assert_eq!(jobs[0].api_url, "https://other.example.org/jobs");
        assert_eq!(jobs[0].token, "explicit");
    }

    #[tokio::test]
    async fn test_probe_does_not_submit() {
        let api = Arc::new(MockIngestApi::new());
        let notifier = notifier(&api, MockSecretStore::new().with_secret("scicat-token", "tok"));

        notifier.probe().await.unwrap();

        assert_eq!(api.probe_count().await, 1);
        assert_eq!(api.submission_count().await, 0);
    }
}
