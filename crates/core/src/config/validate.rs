use super::{types::Config, ConfigError};
use crate::paths::{Endpoint, Tier};

/// Validate configuration before any collaborator is built.
/// Currently validates:
/// - Endpoints have a name, an id and an absolute root without `//`
/// - The path marker is a single segment
/// - Service URLs are absolute http(s) URLs
/// - Transfer deadline and poll interval are positive, interval <= deadline
/// - Retention windows are positive
/// - Delete flows are `flow/deployment` names
/// - The ingest mount prefix is absolute
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let marker = &config.path.marker;
    if marker.is_empty() || marker.contains('/') {
        return Err(invalid(format!(
            "path.marker must be a single non-empty segment, got {marker:?}"
        )));
    }

    for tier in [Tier::Instrument, Tier::Facility, Tier::Archive] {
        validate_endpoint(tier, config.endpoints.get(tier))?;
    }

    validate_url("transfer.api_url", &config.transfer.api_url)?;
    validate_url("ingest.jobs_api_url", &config.ingest.jobs_api_url)?;
    validate_url("scheduler.api_url", &config.scheduler.api_url)?;

    let transfer = &config.transfer;
    if transfer.max_wait_secs == 0 {
        return Err(invalid("transfer.max_wait_secs cannot be 0"));
    }
    if transfer.poll_interval_secs == 0 {
        return Err(invalid("transfer.poll_interval_secs cannot be 0"));
    }
    if transfer.poll_interval_secs > transfer.max_wait_secs {
        return Err(invalid(format!(
            "transfer.poll_interval_secs ({}) exceeds transfer.max_wait_secs ({})",
            transfer.poll_interval_secs, transfer.max_wait_secs
        )));
    }
    if transfer.token_secret.is_empty() {
        return Err(invalid("transfer.token_secret cannot be empty"));
    }

    if config.retention.instrument_days == 0 || config.retention.facility_days == 0 {
        return Err(invalid("retention windows must be at least one day"));
    }

    for (key, flow) in [
        ("scheduler.instrument_delete_flow", &config.scheduler.instrument_delete_flow),
        ("scheduler.facility_delete_flow", &config.scheduler.facility_delete_flow),
    ] {
        match flow.split_once('/') {
            Some((f, d)) if !f.is_empty() && !d.is_empty() && !d.contains('/') => {}
            _ => {
                return Err(invalid(format!(
                    "{key} must look like \"flow/deployment\", got {flow:?}"
                )))
            }
        }
    }

    if !config.ingest.mount_prefix.starts_with('/') {
        return Err(invalid("ingest.mount_prefix must be an absolute path"));
    }
    if config.ingest.dataset_tag.is_empty() {
        return Err(invalid("ingest.dataset_tag cannot be empty"));
    }

    Ok(())
}

fn validate_endpoint(tier: Tier, endpoint: &Endpoint) -> Result<(), ConfigError> {
    if endpoint.name.is_empty() {
        return Err(invalid(format!("endpoints.{tier}.name cannot be empty")));
    }
    if endpoint.endpoint_id.is_empty() {
        return Err(invalid(format!("endpoints.{tier}.endpoint_id cannot be empty")));
    }
    if !endpoint.root_path.starts_with('/') {
        return Err(invalid(format!(
            "endpoints.{tier}.root_path must be absolute, got {:?}",
            endpoint.root_path
        )));
    }
    if endpoint.root_path.trim_end_matches('/').contains("//") {
        return Err(invalid(format!(
            "endpoints.{tier}.root_path contains an empty segment: {:?}",
            endpoint.root_path
        )));
    }
    Ok(())
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(invalid(format!(
            "{key} must use http or https, got {}",
            url.scheme()
        ))),
        Err(e) => Err(invalid(format!("{key} is not a valid URL ({value:?}): {e}"))),
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&fixtures::config()).is_ok());
    }

    #[test]
    fn test_validate_poll_interval_zero_fails() {
        let mut config = fixtures::config();
        config.transfer.poll_interval_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_poll_interval_longer_than_deadline_fails() {
        let mut config = fixtures::config();
        config.transfer.max_wait_secs = 5;
        config.transfer.poll_interval_secs = 10;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_relative_root_fails() {
        let mut config = fixtures::config();
        config.endpoints.facility.root_path = "data/".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("endpoints.facility.root_path"));
    }

    #[test]
    fn test_validate_doubled_separator_in_root_fails() {
        let mut config = fixtures::config();
        config.endpoints.archive.root_path = "/global//cfs/".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_url_fails() {
        let mut config = fixtures::config();
        config.ingest.jobs_api_url = "not a url".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ingest.jobs_api_url"));

        let mut config = fixtures::config();
        config.scheduler.api_url = "ftp://scheduler.example.org".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_marker_with_separator_fails() {
        let mut config = fixtures::config();
        config.path.marker = "global/raw".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_retention_fails() {
        let mut config = fixtures::config();
        config.retention.facility_days = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_malformed_flow_name_fails() {
        let mut config = fixtures::config();
        config.scheduler.facility_delete_flow = "prune_data832".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("scheduler.facility_delete_flow"));
    }
}
