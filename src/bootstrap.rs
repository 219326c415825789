//! Sequencing of the two bootstrap phases.

use std::sync::Arc;
use std::time::Duration;

use pgboot_db::{
    Connector, PgConnector, RoleDatabaseProvisioner, SchemaProvisioner, SchemaScript,
    ServerOptions,
};
use pgboot_kernel::{
    BootstrapRequest, BootstrapResult, EnvSource, OverallStatus, Phase, ProcessEnv, Settings,
};
use pgboot_secrets::AdminSecretIds;
use tracing::Instrument;
use uuid::Uuid;

/// Opaque details of whatever triggered the run. Only used to tag logs.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(Uuid::now_v7().to_string())
    }
}

/// Runs configuration check, role/database phase, then schema phase.
///
/// The overall status only reflects failures that reach this level: a
/// missing variable or an error escaping a phase. A phase that reports
/// `Error` on its own does not stop the next phase and leaves the run
/// `Success`.
pub struct Bootstrapper {
    env: Arc<dyn EnvSource>,
    role_db: Arc<dyn Phase>,
    schema: Arc<dyn Phase>,
}

impl Bootstrapper {
    pub fn new(env: Arc<dyn EnvSource>, role_db: Arc<dyn Phase>, schema: Arc<dyn Phase>) -> Self {
        Self {
            env,
            role_db,
            schema,
        }
    }

    /// Production wiring: process environment, configured secret store and
    /// Postgres connections.
    pub fn from_settings(settings: &Settings, script: SchemaScript) -> Self {
        let connector: Arc<dyn Connector> = Arc::new(PgConnector);
        let secrets = pgboot_secrets::from_settings(&settings.secrets);

        let timeout_ms = settings.database.connect_timeout_ms;
        let server = ServerOptions {
            ssl_mode: settings.database.ssl_mode,
            connect_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        };

        let role_db = RoleDatabaseProvisioner::new(secrets, connector.clone())
            .with_secret_ids(AdminSecretIds::from(&settings.secrets))
            .with_maintenance_database(&settings.database.maintenance_database)
            .with_server_options(server.clone());
        let schema = SchemaProvisioner::new(connector, script).with_server_options(server);

        Self::new(Arc::new(ProcessEnv), Arc::new(role_db), Arc::new(schema))
    }

    /// Entry point for the outer trigger. The event is accepted for
    /// signature compatibility and otherwise ignored.
    pub async fn init_db(
        &self,
        _event: serde_json::Value,
        context: InvocationContext,
    ) -> BootstrapResult {
        let span = tracing::info_span!("bootstrap", request_id = %context.request_id);

        async move {
            let mut result = BootstrapResult::default();

            match self.run(&mut result).await {
                Ok(()) => result.overall = OverallStatus::Success,
                Err(err) => {
                    result.overall = OverallStatus::Error;
                    tracing::error!("{err}");
                }
            }

            tracing::info!(
                result = ?result.overall,
                create_db = result.role_db.as_str(),
                create_schema = result.schema.as_str(),
                "bootstrap finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, result: &mut BootstrapResult) -> anyhow::Result<()> {
        let request = BootstrapRequest::resolve(self.env.as_ref())?;
        tracing::info!(
            role = %request.role_name,
            database = %request.database_name,
            host = %request.host,
            port = request.port,
            "configuration resolved"
        );

        result.role_db = self.role_db.run(&request).await?;
        tracing::info!(phase = self.role_db.name(), outcome = result.role_db.as_str(), "phase complete");

        result.schema = self.schema.run(&request).await?;
        tracing::info!(phase = self.schema.name(), outcome = result.schema.as_str(), "phase complete");

        Ok(())
    }
}
