use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{SecretError, SecretResult, SecretStore};

/// In-memory store for tests. Records every lookup.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
    failure: Option<String>,
    lookups: Mutex<Vec<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(id.into(), value.into());
        self
    }

    /// Every lookup fails with a backend error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn secret_string(&self, id: &str) -> SecretResult<String> {
        self.lookups.lock().unwrap().push(id.to_string());

        if let Some(message) = &self.failure {
            return Err(SecretError::Backend {
                id: id.to_string(),
                message: message.clone(),
            });
        }

        self.secrets
            .get(id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(id.to_string()))
    }
}
