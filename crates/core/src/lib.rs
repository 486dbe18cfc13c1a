pub mod clock;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod scheduler;
pub mod secrets;
pub mod testing;
pub mod transfer;

pub use clock::{Clock, TokioClock};
pub use config::{
    config_fingerprint, load_config, load_config_from_str, validate_config, Config, ConfigError,
};
pub use ingest::{HttpIngestApi, IngestApi, IngestError, IngestionNotifier};
pub use orchestrator::{
    Collaborators, PipelineError, PipelineOrchestrator, PipelineReport, PipelineStatus,
    SmokeTestReport, DEFAULT_SMOKE_TEST_FILE,
};
pub use paths::{join, Endpoint, PathError, RelativePath, Tier};
pub use scheduler::{DeferredDeletionScheduler, FlowScheduler, HttpFlowScheduler, SchedulingError};
pub use secrets::{EnvSecretStore, SecretError, SecretStore};
pub use transfer::{HttpTransferClient, TransferClient, TransferMonitor, TransferOutcome};
