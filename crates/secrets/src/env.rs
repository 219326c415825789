use std::sync::Arc;

use async_trait::async_trait;
use pgboot_kernel::env::{EnvSource, ProcessEnv};

use crate::{SecretError, SecretResult, SecretStore};

/// Resolves secret `oltp_admin_user` from variable `OLTP_ADMIN_USER`.
///
/// Intended for local runs against a development database.
pub struct EnvSecretStore {
    env: Arc<dyn EnvSource>,
}

impl EnvSecretStore {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self { env }
    }

    pub fn from_process() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }

    fn variable_for(id: &str) -> String {
        id.to_ascii_uppercase().replace(['-', '/', '.'], "_")
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn secret_string(&self, id: &str) -> SecretResult<String> {
        self.env
            .var(&Self::variable_for(id))
            .ok_or_else(|| SecretError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn maps_ids_to_upper_snake_variables() {
        assert_eq!(EnvSecretStore::variable_for("oltp_admin_user"), "OLTP_ADMIN_USER");
        assert_eq!(EnvSecretStore::variable_for("prod/oltp-admin.pass"), "PROD_OLTP_ADMIN_PASS");
    }

    #[tokio::test]
    async fn reads_from_the_given_environment() {
        let env: HashMap<String, String> =
            HashMap::from([("OLTP_ADMIN_USER".to_string(), "admin".to_string())]);
        let store = EnvSecretStore::new(Arc::new(env));

        assert_eq!(store.secret_string("oltp_admin_user").await.unwrap(), "admin");
        assert!(matches!(
            store.secret_string("oltp_admin_pass").await,
            Err(SecretError::NotFound(_))
        ));
    }
}
