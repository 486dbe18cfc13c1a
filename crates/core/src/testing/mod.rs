//! Testing utilities and mock implementations.
//!
//! Every collaborator the pipeline talks to has a mock here, plus a
//! [`ManualClock`] that turns deadlines and retention windows into virtual
//! time, so whole pipeline runs execute instantly and deterministically.
//!
//! # Example
//!
//! ```rust,ignore
//! use datamover_core::testing::{fixtures, ManualClock, MockTransferClient, TransferBehavior};
//!
//! let transfer = Arc::new(MockTransferClient::new());
//! transfer
//!     .set_behavior_for_destination("nersc832", TransferBehavior::NeverFinish)
//!     .await;
//!
//! let clock = Arc::new(ManualClock::new());
//! // Build collaborators with `Collaborators::with_clock(...)`
//! ```

mod manual_clock;
mod mock_flow_scheduler;
mod mock_ingest_api;
mod mock_secret_store;
mod mock_transfer_client;

pub use manual_clock::ManualClock;
pub use mock_flow_scheduler::MockFlowScheduler;
pub use mock_ingest_api::MockIngestApi;
pub use mock_secret_store::MockSecretStore;
pub use mock_transfer_client::{MockTransferClient, TransferBehavior};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{
        Config, EndpointsConfig, IngestConfig, PathConfig, RetentionConfig, SchedulerConfig,
        SecretsConfig, TransferConfig,
    };
    use crate::paths::Endpoint;

    /// Instrument endpoint rooted at `/`.
    pub fn instrument() -> Endpoint {
        Endpoint::new("spot832", "/", "spot832-endpoint-id")
    }

    /// Facility endpoint rooted at `/data/`.
    pub fn facility() -> Endpoint {
        Endpoint::new("data832", "/data/", "data832-endpoint-id")
    }

    /// Archive endpoint rooted at the archive's beamline directory.
    pub fn archive() -> Endpoint {
        Endpoint::new(
            "nersc832",
            "/global/cfs/cdirs/als/data_mover/8.3.2",
            "nersc832-endpoint-id",
        )
    }

    /// A valid configuration with 14/30 day retention and a 600s deadline.
    pub fn config() -> Config {
        Config {
            path: PathConfig::default(),
            endpoints: EndpointsConfig {
                instrument: instrument(),
                facility: facility(),
                archive: archive(),
            },
            transfer: TransferConfig::default(),
            ingest: IngestConfig {
                jobs_api_url: "https://ingest.example.org/api/v1/jobs".to_string(),
                token_secret: "scicat-token".to_string(),
                dataset_tag: "als832_dx_3".to_string(),
                mount_prefix: "/data_mover/8.3.2".to_string(),
                request_timeout_secs: 30,
            },
            scheduler: SchedulerConfig {
                api_url: "http://scheduler.example.org/api".to_string(),
                api_key_secret: None,
                instrument_delete_flow: "prune_spot832/prune_spot832".to_string(),
                facility_delete_flow: "prune_data832/prune_data832".to_string(),
                request_timeout_secs: 30,
            },
            retention: RetentionConfig {
                instrument_days: 14,
                facility_days: 30,
            },
            secrets: SecretsConfig::default(),
        }
    }
}
