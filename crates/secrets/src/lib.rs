//! Secret store access for the administrative database credentials.
//!
//! Credentials are fetched on every use and never cached here; secrets may
//! rotate between bootstrap runs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pgboot_kernel::settings::{SecretBackend, SecretSettings};
use thiserror::Error;

pub mod aws;
pub mod env;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use aws::AwsSecretsManager;
pub use env::EnvSecretStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemorySecretStore;

#[derive(Debug, Error)]
pub enum SecretError {
    /// The backend rejected or failed the lookup. The message is passed
    /// through unchanged so it can be logged verbatim.
    #[error("{message}")]
    Backend { id: String, message: String },

    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{0}' has no string payload")]
    MissingPayload(String),
}

pub type SecretResult<T> = Result<T, SecretError>;

/// A store that resolves a secret identifier to its string payload.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn secret_string(&self, id: &str) -> SecretResult<String>;
}

/// Build the store selected by configuration.
pub fn from_settings(settings: &SecretSettings) -> Arc<dyn SecretStore> {
    match settings.backend {
        SecretBackend::Aws => Arc::new(AwsSecretsManager::new(settings.region.clone())),
        SecretBackend::Env => Arc::new(EnvSecretStore::from_process()),
    }
}

/// Identifiers of the two administrative secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSecretIds {
    pub user: String,
    pub password: String,
}

impl From<&SecretSettings> for AdminSecretIds {
    fn from(settings: &SecretSettings) -> Self {
        Self {
            user: settings.admin_user_id.clone(),
            password: settings.admin_password_id.clone(),
        }
    }
}

impl Default for AdminSecretIds {
    fn default() -> Self {
        Self::from(&SecretSettings::default())
    }
}

/// Administrative login. Lives only for the duration of one phase.
#[derive(Clone)]
pub struct AdminCredential {
    pub username: String,
    pub password: String,
}

impl AdminCredential {
    /// Two independent lookups: user first, then password.
    pub async fn fetch(store: &dyn SecretStore, ids: &AdminSecretIds) -> SecretResult<Self> {
        let username = store.secret_string(&ids.user).await?;
        let password = store.secret_string(&ids.password).await?;
        Ok(Self { username, password })
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
