use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::paths::{Endpoint, Tier};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub path: PathConfig,
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    pub ingest: IngestConfig,
    pub scheduler: SchedulerConfig,
    pub retention: RetentionConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Instrument path handling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathConfig {
    /// Segment marking the instrument mount point in reported paths.
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

fn default_marker() -> String {
    "global".to_string()
}

/// The three tier endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub instrument: Endpoint,
    pub facility: Endpoint,
    pub archive: Endpoint,
}

impl EndpointsConfig {
    pub fn get(&self, tier: Tier) -> &Endpoint {
        match tier {
            Tier::Instrument => &self.instrument,
            Tier::Facility => &self.facility,
            Tier::Archive => &self.archive,
        }
    }
}

/// Transfer service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Base URL of the transfer REST API.
    #[serde(default = "default_transfer_api_url")]
    pub api_url: String,
    /// Name of the secret holding the transfer bearer token.
    #[serde(default = "default_transfer_token_secret")]
    pub token_secret: String,
    /// Deadline for a single hop (default: 600).
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
    /// Delay between status polls (default: 10).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// HTTP request timeout (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// How the transfer service decides a file is already present.
    #[serde(default)]
    pub sync_level: SyncLevel,
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
}

impl TransferConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            api_url: default_transfer_api_url(),
            token_secret: default_transfer_token_secret(),
            max_wait_secs: default_max_wait(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            sync_level: SyncLevel::default(),
            verify_checksum: true,
        }
    }
}

fn default_transfer_api_url() -> String {
    "https://transfer.api.globus.org/v0.10".to_string()
}

fn default_transfer_token_secret() -> String {
    "globus-transfer-token".to_string()
}

fn default_max_wait() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Skip rule applied by the transfer service when the destination exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLevel {
    Exists,
    Size,
    Mtime,
    #[default]
    Checksum,
}

impl SyncLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLevel::Exists => "exists",
            SyncLevel::Size => "size",
            SyncLevel::Mtime => "mtime",
            SyncLevel::Checksum => "checksum",
        }
    }
}

/// Metadata ingestion service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Jobs endpoint of the ingestion service.
    pub jobs_api_url: String,
    #[serde(default = "default_ingest_token_secret")]
    pub token_secret: String,
    #[serde(default = "default_dataset_tag")]
    pub dataset_tag: String,
    /// Mount point under which the ingestion service sees archived files.
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl IngestConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_ingest_token_secret() -> String {
    "scicat-token".to_string()
}

fn default_dataset_tag() -> String {
    "als832_dx_3".to_string()
}

fn default_mount_prefix() -> String {
    "/data_mover/8.3.2".to_string()
}

/// Workflow scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Base URL of the scheduler REST API.
    pub api_url: String,
    /// Optional secret holding a scheduler API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_secret: Option<String>,
    /// Deployment (`flow/deployment`) that prunes the instrument tier.
    #[serde(default = "default_instrument_delete_flow")]
    pub instrument_delete_flow: String,
    /// Deployment (`flow/deployment`) that prunes the facility tier.
    #[serde(default = "default_facility_delete_flow")]
    pub facility_delete_flow: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl SchedulerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_instrument_delete_flow() -> String {
    "prune_spot832/prune_spot832".to_string()
}

fn default_facility_delete_flow() -> String {
    "prune_data832/prune_data832".to_string()
}

/// How long source copies are kept before deletion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    pub instrument_days: u32,
    pub facility_days: u32,
}

impl RetentionConfig {
    pub fn instrument(&self) -> Duration {
        Duration::from_secs(u64::from(self.instrument_days) * SECONDS_PER_DAY)
    }

    pub fn facility(&self) -> Duration {
        Duration::from_secs(u64::from(self.facility_days) * SECONDS_PER_DAY)
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecretsConfig {
    #[serde(default = "default_secret_prefix")]
    pub env_prefix: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_secret_prefix(),
        }
    }
}

fn default_secret_prefix() -> String {
    "DATAMOVER_SECRET_".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[endpoints.instrument]
name = "spot832"
root_path = "/"
endpoint_id = "spot-id"

[endpoints.facility]
name = "data832"
root_path = "/data/"
endpoint_id = "data-id"

[endpoints.archive]
name = "nersc832"
root_path = "/global/cfs/cdirs/als/data_mover/8.3.2"
endpoint_id = "nersc-id"

[ingest]
jobs_api_url = "https://ingest.example.org/api/v1/jobs"

[scheduler]
api_url = "http://scheduler.example.org/api"

[retention]
instrument_days = 14
facility_days = 30
"#;

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.path.marker, "global");
        assert_eq!(config.transfer.max_wait_secs, 600);
        assert_eq!(config.transfer.poll_interval_secs, 10);
        assert_eq!(config.transfer.sync_level, SyncLevel::Checksum);
        assert!(config.transfer.verify_checksum);
        assert_eq!(config.ingest.token_secret, "scicat-token");
        assert_eq!(config.ingest.dataset_tag, "als832_dx_3");
        assert_eq!(config.ingest.mount_prefix, "/data_mover/8.3.2");
        assert_eq!(
            config.scheduler.instrument_delete_flow,
            "prune_spot832/prune_spot832"
        );
        assert!(config.scheduler.api_key_secret.is_none());
        assert_eq!(config.secrets.env_prefix, "DATAMOVER_SECRET_");
    }

    #[test]
    fn test_endpoints_by_tier() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.endpoints.get(Tier::Instrument).name, "spot832");
        assert_eq!(config.endpoints.get(Tier::Facility).name, "data832");
        assert_eq!(config.endpoints.get(Tier::Archive).name, "nersc832");
    }

    #[test]
    fn test_retention_durations_are_independent() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(
            config.retention.instrument(),
            Duration::from_secs(14 * 86_400)
        );
        assert_eq!(config.retention.facility(), Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn test_deserialize_missing_retention_fails() {
        let toml = MINIMAL.replace("[retention]\ninstrument_days = 14\nfacility_days = 30\n", "");
        let result: Result<Config, _> = toml::from_str(&toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_transfer_overrides() {
        let toml = format!(
            "{MINIMAL}\n[transfer]\nmax_wait_secs = 120\npoll_interval_secs = 5\nsync_level = \"size\"\n"
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.transfer.max_wait(), Duration::from_secs(120));
        assert_eq!(config.transfer.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.transfer.sync_level, SyncLevel::Size);
        assert_eq!(config.transfer.sync_level.as_str(), "size");
    }
}
