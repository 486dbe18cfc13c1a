//! The fixed transfer pipeline.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::{Clock, TokioClock};
use crate::config::{config_fingerprint, validate_config, Config, ConfigError};
use crate::ingest::{IngestApi, IngestionNotifier};
use crate::metrics;
use crate::paths::RelativePath;
use crate::scheduler::{DeferredDeletionScheduler, DeletionTier, FlowScheduler};
use crate::secrets::SecretStore;
use crate::transfer::{Hop, TransferClient, TransferMonitor, TransferOutcome, TransferRequest};

use super::types::{DeletionResult, PipelineError, PipelineReport, PipelineStage, StepRecord};

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transfer: Arc<dyn TransferClient>,
    pub ingest: Arc<dyn IngestApi>,
    pub scheduler: Arc<dyn FlowScheduler>,
    pub secrets: Arc<dyn SecretStore>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators driven by the tokio timer.
    pub fn new(
        transfer: Arc<dyn TransferClient>,
        ingest: Arc<dyn IngestApi>,
        scheduler: Arc<dyn FlowScheduler>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            transfer,
            ingest,
            scheduler,
            secrets,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Moves one file instrument → facility → archive, then ingests it and
/// schedules the source copies for deletion.
///
/// Holds only read-only configuration and collaborator handles, so runs for
/// different files may proceed concurrently on the same orchestrator.
pub struct PipelineOrchestrator {
    pub(super) config: Config,
    pub(super) monitor: TransferMonitor,
    pub(super) notifier: IngestionNotifier,
    deletions: DeferredDeletionScheduler,
}

impl PipelineOrchestrator {
    /// Validates `config` and wires the pipeline components.
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        info!(
            fingerprint = %config_fingerprint(&config),
            transfer = collaborators.transfer.name(),
            ingest = collaborators.ingest.name(),
            scheduler = collaborators.scheduler.name(),
            secrets = collaborators.secrets.name(),
            "Pipeline orchestrator configured"
        );

        let monitor = TransferMonitor::new(
            collaborators.transfer,
            collaborators.clock.clone(),
            config.transfer.poll_interval(),
        );
        let notifier = IngestionNotifier::new(
            collaborators.ingest,
            collaborators.secrets,
            config.ingest.clone(),
        );
        let deletions = DeferredDeletionScheduler::new(
            collaborators.scheduler,
            collaborators.clock,
            config.scheduler.clone(),
            config.retention.clone(),
            config.endpoints.clone(),
        );

        Ok(Self {
            config,
            monitor,
            notifier,
            deletions,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the pipeline for one instrument-reported file path.
    ///
    /// Returns `Err` only when the run halted before the file was confirmed
    /// on the archive tier. Ingestion and scheduling failures show up as a
    /// degraded report.
    pub async fn run(&self, file_path: &str) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("pipeline", run_id = %run_id, file = %file_path);

        let result = self.run_steps(run_id, file_path).instrument(span).await;
        let label = match &result {
            Ok(report) => report.status().as_str(),
            Err(_) => "failed",
        };
        metrics::PIPELINE_RUNS.with_label_values(&[label]).inc();
        result
    }

    async fn run_steps(
        &self,
        run_id: String,
        file_path: &str,
    ) -> Result<PipelineReport, PipelineError> {
        info!("Pipeline started");
        let mut steps = Vec::with_capacity(7);

        let relative = match RelativePath::from_instrument(file_path, &self.config.path.marker) {
            Ok(relative) => relative,
            Err(e) => {
                error!(error = %e, "Cannot normalize file path");
                return Err(e.into());
            }
        };
        info!(relative_path = %relative, "Normalized file path");
        steps.push(StepRecord::completed(PipelineStage::Normalized));

        self.hop(Hop::InstrumentToFacility, &relative, &relative)
            .await?;
        steps.push(StepRecord::completed(PipelineStage::TransferredToFacility));

        self.hop(Hop::FacilityToArchive, &relative, &relative)
            .await?;
        steps.push(StepRecord::completed(PipelineStage::TransferredToArchive));

        let ingest = self.notifier.ingest(&relative).await;
        match &ingest {
            Ok(receipt) => {
                info!(status = receipt.status, "Ingestion job accepted");
                steps.push(StepRecord::completed(PipelineStage::Ingested));
            }
            Err(e) => {
                warn!(error = %e, "Ingestion failed, continuing with deletion scheduling");
                steps.push(StepRecord::failed(PipelineStage::Ingested, e.to_string()));
            }
        }

        let mut deletions = Vec::with_capacity(2);
        for tier in [DeletionTier::Instrument, DeletionTier::Facility] {
            let stage = PipelineStage::scheduled_delete(tier);
            let result = self.deletions.schedule_delete(tier, &relative).await;
            match &result {
                Ok(_) => steps.push(StepRecord::completed(stage)),
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Deletion not scheduled");
                    steps.push(StepRecord::failed(stage, e.to_string()));
                }
            }
            deletions.push(DeletionResult { tier, result });
        }
        steps.push(StepRecord::completed(PipelineStage::Done));

        let report = PipelineReport {
            run_id,
            relative_path: relative,
            steps,
            ingest,
            deletions,
        };
        info!(status = report.status().as_str(), "Pipeline finished");
        Ok(report)
    }

    /// Transfers `source` on the hop's source tier to `destination` on its
    /// destination tier, mapping anything but success to a halting error.
    pub(super) async fn hop(
        &self,
        hop: Hop,
        source: &RelativePath,
        destination: &RelativePath,
    ) -> Result<(), PipelineError> {
        let endpoints = &self.config.endpoints;
        let request = TransferRequest::between(
            endpoints.get(hop.source()),
            source,
            endpoints.get(hop.destination()),
            destination,
            self.config.transfer.max_wait(),
        )
        .with_label(format!("{hop} {}", destination.file_name()));

        info!(hop = %hop, relative_path = %destination, "Starting hop");
        let outcome = self.monitor.transfer(&request).await;
        metrics::TRANSFERS_TOTAL
            .with_label_values(&[hop.as_str(), outcome.as_str()])
            .inc();

        match outcome {
            TransferOutcome::Succeeded { task, .. } => {
                info!(hop = %hop, task_id = %task, "Hop completed");
                Ok(())
            }
            TransferOutcome::TimedOut { task, waited } => {
                error!(hop = %hop, task_id = ?task, "Hop timed out, halting pipeline");
                Err(PipelineError::TransferTimeout {
                    hop,
                    task_id: task.map(|t| t.to_string()),
                    waited,
                })
            }
            TransferOutcome::Failed { task, reason } => {
                error!(hop = %hop, reason = %reason, "Hop failed, halting pipeline");
                Err(PipelineError::TransferFailed {
                    hop,
                    task_id: task.map(|t| t.to_string()),
                    reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        fixtures, ManualClock, MockFlowScheduler, MockIngestApi, MockSecretStore,
        MockTransferClient,
    };

    fn orchestrator(config: Config) -> Result<PipelineOrchestrator, ConfigError> {
        let collaborators = Collaborators::new(
            Arc::new(MockTransferClient::new()),
            Arc::new(MockIngestApi::new()),
            Arc::new(MockFlowScheduler::new()),
            Arc::new(MockSecretStore::new()),
        )
        .with_clock(Arc::new(ManualClock::new()));
        PipelineOrchestrator::new(config, collaborators)
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = fixtures::config();
        config.transfer.max_wait_secs = 0;
        assert!(matches!(
            orchestrator(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_path_halts_before_any_transfer() {
        let orchestrator = orchestrator(fixtures::config()).unwrap();
        let err = orchestrator
            .run("/home/user/raw/scan.h5")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPath(_)));
        assert_eq!(err.halted_at(), PipelineStage::Start);
    }
}
