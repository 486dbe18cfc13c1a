//! End-to-end check of every tier without lasting side effects.

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::paths::RelativePath;
use crate::transfer::Hop;

use super::runner::PipelineOrchestrator;
use super::types::{PipelineError, SmokeTestReport};

/// Instrument-side file copied by default.
pub const DEFAULT_SMOKE_TEST_FILE: &str = "/raw/transfer_tests/test.txt";

impl PipelineOrchestrator {
    /// Probes the ingestion service, then copies `file_path` within the
    /// instrument tier under a unique name and moves the copy through every
    /// tier.
    ///
    /// `file_path` is relative to the instrument root; a leading separator is
    /// ignored. Nothing is ingested and no deletion is scheduled.
    pub async fn smoke_test(&self, file_path: &str) -> Result<SmokeTestReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("smoke_test", run_id = %run_id, file = %file_path);
        self.smoke_test_steps(run_id, file_path)
            .instrument(span)
            .await
    }

    async fn smoke_test_steps(
        &self,
        run_id: String,
        file_path: &str,
    ) -> Result<SmokeTestReport, PipelineError> {
        self.notifier.probe().await?;
        info!("Ingestion service reachable");

        let source = RelativePath::new(file_path)?;
        let copy = source.with_file_name(&format!("test_{}.txt", Uuid::new_v4()))?;
        info!(source = %source, copy = %copy, "Starting smoke test transfers");

        self.hop(Hop::InstrumentCopy, &source, &copy).await?;
        self.hop(Hop::InstrumentToFacility, &copy, &copy).await?;
        self.hop(Hop::FacilityToArchive, &copy, &copy).await?;

        info!(copy = %copy, "Smoke test passed");
        Ok(SmokeTestReport {
            run_id,
            source,
            copy,
            hops: vec![
                Hop::InstrumentCopy,
                Hop::InstrumentToFacility,
                Hop::FacilityToArchive,
            ],
        })
    }
}
