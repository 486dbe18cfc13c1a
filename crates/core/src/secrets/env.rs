//! Environment-variable secret store.

use async_trait::async_trait;
use tracing::debug;

use super::{SecretError, SecretStore};

/// Resolves secrets from environment variables.
///
/// The secret `scicat-token` with prefix `DATAMOVER_SECRET_` is read from
/// `DATAMOVER_SECRET_SCICAT_TOKEN`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable holding the secret `name`.
    pub fn var_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| match c {
                '-' | '.' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    async fn load(&self, name: &str) -> Result<String, SecretError> {
        let var = self.var_name(name);
        debug!(secret = name, var = %var, "Resolving secret from environment");
        match std::env::var(&var) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            Ok(_) => Err(SecretError::NotFound(format!("{name} ({var} is empty)"))),
            Err(std::env::VarError::NotPresent) => {
                Err(SecretError::NotFound(format!("{name} ({var} is not set)")))
            }
            Err(e) => Err(SecretError::Backend(format!("{var}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_name() {
        let store = EnvSecretStore::new("DATAMOVER_SECRET_");
        assert_eq!(store.var_name("scicat-token"), "DATAMOVER_SECRET_SCICAT_TOKEN");
        assert_eq!(
            store.var_name("globus.transfer token"),
            "DATAMOVER_SECRET_GLOBUS_TRANSFER_TOKEN"
        );
    }

    #[tokio::test]
    async fn test_load_present_secret() {
        let store = EnvSecretStore::new("DATAMOVER_TEST_ENV_STORE_A_");
        std::env::set_var("DATAMOVER_TEST_ENV_STORE_A_TOKEN", "  abc123\n");
        let value = store.load("token").await.unwrap();
        assert_eq!(value, "abc123");
    }

    #[tokio::test]
    async fn test_load_missing_secret() {
        let store = EnvSecretStore::new("DATAMOVER_TEST_ENV_STORE_B_");
        let err = store.load("missing").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
        assert!(err.to_string().contains("DATAMOVER_TEST_ENV_STORE_B_MISSING"));
    }

    #[tokio::test]
    async fn test_load_empty_secret_is_not_found() {
        let store = EnvSecretStore::new("DATAMOVER_TEST_ENV_STORE_C_");
        std::env::set_var("DATAMOVER_TEST_ENV_STORE_C_BLANK", "   ");
        let err = store.load("blank").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
    }
}
