//! Credential lookup.
//!
//! Tokens for the transfer service, the ingestion service and the scheduler
//! are resolved by name through a [`SecretStore`].

mod env;

pub use env::EnvSecretStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while resolving a secret.
#[derive(Debug, Clone, Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret backend error: {0}")]
    Backend(String),
}

/// A named-secret backend.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Resolves the secret called `name`.
    async fn load(&self, name: &str) -> Result<String, SecretError>;
}
