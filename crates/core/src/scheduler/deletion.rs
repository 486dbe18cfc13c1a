//! Deferred deletion scheduler.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::clock::Clock;
use crate::config::{EndpointsConfig, RetentionConfig, SchedulerConfig};
use crate::metrics;
use crate::paths::RelativePath;

use super::types::{DeferredJob, DeletionTier, FlowScheduler, ScheduledFlowRun, SchedulingError};

/// Registers the per-tier deletion jobs after a successful archive transfer.
pub struct DeferredDeletionScheduler {
    scheduler: Arc<dyn FlowScheduler>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    retention: RetentionConfig,
    endpoints: EndpointsConfig,
}

impl DeferredDeletionScheduler {
    pub fn new(
        scheduler: Arc<dyn FlowScheduler>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
        retention: RetentionConfig,
        endpoints: EndpointsConfig,
    ) -> Self {
        Self {
            scheduler,
            clock,
            config,
            retention,
            endpoints,
        }
    }

    /// Retention window for `tier`.
    pub fn retention_for(&self, tier: DeletionTier) -> Duration {
        match tier {
            DeletionTier::Instrument => self.retention.instrument(),
            DeletionTier::Facility => self.retention.facility(),
        }
    }

    fn flow_for(&self, tier: DeletionTier) -> &str {
        match tier {
            DeletionTier::Instrument => &self.config.instrument_delete_flow,
            DeletionTier::Facility => &self.config.facility_delete_flow,
        }
    }

    /// Builds the deletion job for `tier` without registering it.
    pub fn deletion_job(
        &self,
        tier: DeletionTier,
        relative: &RelativePath,
    ) -> Result<DeferredJob, SchedulingError> {
        let endpoint = self.endpoints.get(tier.tier());
        let label = format!("delete {}: {}", endpoint.name, relative.file_name());
        self.build_job(
            self.flow_for(tier),
            &label,
            relative,
            self.retention_for(tier),
        )
    }

    /// Registers the deletion job for `tier`.
    pub async fn schedule_delete(
        &self,
        tier: DeletionTier,
        relative: &RelativePath,
    ) -> Result<ScheduledFlowRun, SchedulingError> {
        let result = match self.deletion_job(tier, relative) {
            Ok(job) => self.register(&job).await,
            Err(e) => Err(e),
        };
        let label = if result.is_ok() { "accepted" } else { "rejected" };
        metrics::DELETIONS_SCHEDULED
            .with_label_values(&[tier.as_str(), label])
            .inc();
        result
    }

    /// Registers a deferred run of `flow_name` for `relative`, firing `after`
    /// from now.
    pub async fn schedule(
        &self,
        flow_name: &str,
        label: &str,
        relative: &RelativePath,
        after: Duration,
    ) -> Result<ScheduledFlowRun, SchedulingError> {
        let job = self.build_job(flow_name, label, relative, after)?;
        self.register(&job).await
    }

    fn build_job(
        &self,
        flow_name: &str,
        label: &str,
        relative: &RelativePath,
        after: Duration,
    ) -> Result<DeferredJob, SchedulingError> {
        let delay = chrono::Duration::from_std(after)
            .map_err(|e| SchedulingError::InvalidDelay(format!("{after:?}: {e}")))?;
        let fire_at = self
            .clock
            .utc_now()
            .checked_add_signed(delay)
            .ok_or_else(|| SchedulingError::InvalidDelay(format!("{after:?} overflows")))?;

        let mut parameters = BTreeMap::new();
        parameters.insert("relative_path".to_string(), relative.to_string());

        Ok(DeferredJob {
            flow_name: flow_name.to_string(),
            label: label.to_string(),
            parameters,
            fire_after: after,
            fire_at,
        })
    }

    async fn register(&self, job: &DeferredJob) -> Result<ScheduledFlowRun, SchedulingError> {
        match self.scheduler.schedule_flow(job).await {
            Ok(run) => {
                info!(
                    flow = %job.flow_name,
                    label = %job.label,
                    flow_run_id = %run.flow_run_id,
                    fire_at = %job.fire_at,
                    "Scheduled deferred flow run"
                );
                Ok(run)
            }
            Err(e) => {
                error!(flow = %job.flow_name, label = %job.label, error = %e, "Failed to schedule deferred flow run");
                Err(e)
            }
        }
    }
}
