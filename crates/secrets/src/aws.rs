use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tokio::sync::OnceCell;

use crate::{SecretError, SecretResult, SecretStore};

/// AWS Secrets Manager backend.
///
/// The SDK client is built on first lookup so that runs which fail before
/// needing credentials never touch the AWS provider chain.
pub struct AwsSecretsManager {
    region: Option<String>,
    client: OnceCell<Client>,
}

impl AwsSecretsManager {
    pub fn new(region: Option<String>) -> Self {
        Self {
            region,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = &self.region {
                    loader = loader.region(aws_config::Region::new(region.clone()));
                }
                Client::new(&loader.load().await)
            })
            .await
    }
}

impl std::fmt::Debug for AwsSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManager")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    async fn secret_string(&self, id: &str) -> SecretResult<String> {
        tracing::debug!(secret_id = id, "fetching secret from secrets manager");

        let output = self
            .client()
            .await
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|err| SecretError::Backend {
                id: id.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        output
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| SecretError::MissingPayload(id.to_string()))
    }
}
