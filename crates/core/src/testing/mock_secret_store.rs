//! Mock secret store for testing.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::secrets::{SecretError, SecretStore};

/// In-memory secret store.
#[derive(Debug, Default, Clone)]
pub struct MockSecretStore {
    secrets: HashMap<String, String>,
}

impl MockSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper adding one secret.
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self, name: &str) -> Result<String, SecretError> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}
