//! Smoke test integration tests.

use std::sync::Arc;

use datamover_core::{
    testing::{
        fixtures, ManualClock, MockFlowScheduler, MockIngestApi, MockSecretStore,
        MockTransferClient, TransferBehavior,
    },
    transfer::Hop,
    Collaborators, IngestError, PipelineError, PipelineOrchestrator, DEFAULT_SMOKE_TEST_FILE,
};

struct TestHarness {
    orchestrator: PipelineOrchestrator,
    transfer: Arc<MockTransferClient>,
    ingest: Arc<MockIngestApi>,
    scheduler: Arc<MockFlowScheduler>,
}

impl TestHarness {
    fn new(secrets: MockSecretStore) -> Self {
        let transfer = Arc::new(MockTransferClient::new());
        let ingest = Arc::new(MockIngestApi::new());
        let scheduler = Arc::new(MockFlowScheduler::new());
        let collaborators = Collaborators::new(
            transfer.clone(),
            ingest.clone(),
            scheduler.clone(),
            Arc::new(secrets),
        )
        .with_clock(Arc::new(ManualClock::new()));

        Self {
            orchestrator: PipelineOrchestrator::new(fixtures::config(), collaborators).unwrap(),
            transfer,
            ingest,
            scheduler,
        }
    }

    fn with_token() -> Self {
        Self::new(MockSecretStore::new().with_secret("scicat-token", "tok"))
    }
}

#[tokio::test]
async fn test_smoke_test_moves_unique_copy_through_every_tier() {
    let harness = TestHarness::with_token();

    let report = harness
        .orchestrator
        .smoke_test(DEFAULT_SMOKE_TEST_FILE)
        .await
        .unwrap();

    assert_eq!(report.source.as_str(), "raw/transfer_tests/test.txt");
    assert_eq!(report.copy.parent(), Some("raw/transfer_tests"));
    assert!(report.copy.file_name().starts_with("test_"));
    assert!(report.copy.file_name().ends_with(".txt"));
    assert_ne!(report.copy, report.source);
    assert_eq!(
        report.hops,
        vec![
            Hop::InstrumentCopy,
            Hop::InstrumentToFacility,
            Hop::FacilityToArchive
        ]
    );

    let requests = harness.transfer.submitted_requests().await;
    assert_eq!(requests.len(), 3);

    assert_eq!(requests[0].source.name, "spot832");
    assert_eq!(requests[0].destination.name, "spot832");
    assert_eq!(requests[0].source_path, "/raw/transfer_tests/test.txt");
    assert_eq!(requests[0].destination_path, format!("/{}", report.copy));

    assert_eq!(requests[1].source_path, format!("/{}", report.copy));
    assert_eq!(requests[1].destination_path, format!("/data/{}", report.copy));
    assert_eq!(requests[2].destination.name, "nersc832");

    assert_eq!(harness.ingest.probe_count().await, 1);
    assert_eq!(harness.ingest.submission_count().await, 0);
    assert_eq!(harness.scheduler.schedule_count().await, 0);
}

#[tokio::test]
async fn test_smoke_test_copies_are_unique_per_run() {
    let harness = TestHarness::with_token();

    let first = harness.orchestrator.smoke_test("raw/t/test.txt").await.unwrap();
    let second = harness.orchestrator.smoke_test("raw/t/test.txt").await.unwrap();

    assert_ne!(first.copy, second.copy);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_smoke_test_fails_when_ingest_unreachable() {
    let harness = TestHarness::with_token();
    harness.ingest.fail_probe_with(502, "bad gateway").await;

    let err = harness
        .orchestrator
        .smoke_test(DEFAULT_SMOKE_TEST_FILE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::IngestProbe(IngestError::Submit { status: 502, .. })
    ));
    assert_eq!(harness.transfer.submission_count().await, 0);
}

#[tokio::test]
async fn test_smoke_test_requires_ingest_token() {
    let harness = TestHarness::new(MockSecretStore::new());

    let err = harness
        .orchestrator
        .smoke_test(DEFAULT_SMOKE_TEST_FILE)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::IngestProbe(IngestError::Secret(_))));
    assert_eq!(harness.ingest.probe_count().await, 0);
}

#[tokio::test]
async fn test_smoke_test_transfer_failure_fails_the_test() {
    let harness = TestHarness::with_token();
    harness
        .transfer
        .set_behavior_for_destination(
            "data832",
            TransferBehavior::FailAfter {
                polls: 1,
                reason: "PERMISSION_DENIED".to_string(),
            },
        )
        .await;

    let err = harness
        .orchestrator
        .smoke_test(DEFAULT_SMOKE_TEST_FILE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::TransferFailed {
            hop: Hop::InstrumentToFacility,
            ..
        }
    ));
    assert_eq!(harness.transfer.submission_count().await, 2);
}
